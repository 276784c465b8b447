// 📐 Shape Layer - Schema Validation
// Validates raw database records before they become articles

use serde_yaml::{Mapping, Value};

/// Fields an article record may carry
pub const ARTICLE_FIELDS: [&str; 6] = ["name", "manufacturer", "mpart_no", "ignore", "matches", "vendor"];

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Position of the record in the database file (0-based)
    pub index: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[record {}] {}: {}", self.index, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

/// Checks one database record against the article schema:
///
/// ```yaml
/// - name: string            # required
///   manufacturer: string
///   mpart_no: string
///   ignore: bool
///   matches: [{field: pattern}]
///   vendor: {vendor: order_no}
/// ```
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        SchemaValidator
    }

    /// Validate a record, collecting every problem found
    pub fn validate_record(&self, index: usize, record: &Value) -> ValidationResult {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: String| {
            errors.push(ValidationError {
                index,
                field: field.to_string(),
                message,
            });
        };

        let map = match record {
            Value::Mapping(map) => map,
            other => {
                fail("<record>", format!("expected a mapping, got {}", type_name(other)));
                return Err(errors);
            }
        };

        for key in map.keys() {
            match key.as_str() {
                Some(k) if ARTICLE_FIELDS.contains(&k) => {}
                Some(k) => fail(k, "unknown field".to_string()),
                None => fail("<key>", format!("field names must be strings, got {}", type_name(key))),
            }
        }

        match map.get("name") {
            None => fail("name", "required field is missing".to_string()),
            Some(Value::String(_)) => {}
            Some(other) => fail("name", format!("expected a string, got {}", type_name(other))),
        }

        for field in ["manufacturer", "mpart_no"] {
            if let Some(value) = map.get(field) {
                if !value.is_string() {
                    fail(field, format!("expected a string, got {}", type_name(value)));
                }
            }
        }

        if let Some(value) = map.get("ignore") {
            if !value.is_bool() {
                fail("ignore", format!("expected a bool, got {}", type_name(value)));
            }
        }

        if let Some(value) = map.get("matches") {
            match value {
                Value::Sequence(rules) => {
                    for (n, rule) in rules.iter().enumerate() {
                        match rule {
                            Value::Mapping(rule) => {
                                if let Err(message) = check_string_map(rule) {
                                    fail(&format!("matches[{}]", n), message);
                                }
                            }
                            other => fail(
                                &format!("matches[{}]", n),
                                format!("expected a mapping, got {}", type_name(other)),
                            ),
                        }
                    }
                }
                other => fail("matches", format!("expected a list, got {}", type_name(other))),
            }
        }

        if let Some(value) = map.get("vendor") {
            match value {
                Value::Mapping(vendors) => {
                    if let Err(message) = check_string_map(vendors) {
                        fail("vendor", message);
                    }
                }
                other => fail("vendor", format!("expected a mapping, got {}", type_name(other))),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_string_map(map: &Mapping) -> Result<(), String> {
    for (key, value) in map {
        let key = key
            .as_str()
            .ok_or_else(|| format!("keys must be strings, got {}", type_name(key)))?;
        if !value.is_string() {
            return Err(format!("`{}` must be a string, got {}", key, type_name(value)));
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

// ============================================================================
// TESTS
// ============================================================================
