// 🏷️ Match Rules - Rules as Data
// Conjunctive regex constraints over item fields

use crate::item::Item;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid pattern for `{field}`: {source}")]
pub struct InvalidPattern {
    pub field: String,
    #[source]
    pub source: regex::Error,
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// One compiled field constraint.
///
/// Keeps the pattern as written so the rule dumps back unchanged.
#[derive(Debug, Clone)]
struct Constraint {
    source: String,
    regex: Regex,
}

/// Rule - every constraint must match (AND)
///
/// Patterns always match the whole value: `0805` matches `0805` but not
/// `R_0805` or `0805_Metric`. Use `.*` for partial matches.
#[derive(Debug, Clone)]
pub struct Rule {
    constraints: BTreeMap<String, Constraint>,
}

impl Rule {
    /// Compile a `{field: pattern}` mapping as found in the database file
    pub fn compile(patterns: &BTreeMap<String, String>) -> Result<Self, InvalidPattern> {
        let mut constraints = BTreeMap::new();

        for (field, pattern) in patterns {
            let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| InvalidPattern {
                field: field.clone(),
                source,
            })?;

            constraints.insert(
                field.clone(),
                Constraint {
                    source: pattern.clone(),
                    regex,
                },
            );
        }

        Ok(Rule { constraints })
    }

    /// Rule matching each given field value literally and completely
    pub fn exact<'a, I>(fields: I) -> Result<Self, InvalidPattern>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let patterns: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(field, value)| (field.to_string(), regex::escape(value)))
            .collect();

        Rule::compile(&patterns)
    }

    /// Check if every constraint holds for the item.
    ///
    /// A constraint on a field the item does not carry never holds.
    pub fn matches(&self, item: &Item) -> bool {
        self.constraints.iter().all(|(field, constraint)| match item.get(field) {
            Some(value) => constraint.regex.is_match(&value),
            None => false,
        })
    }

    /// Patterns as written, for serialization
    pub fn patterns(&self) -> BTreeMap<String, String> {
        self.constraints
            .iter()
            .map(|(field, c)| (field.clone(), c.source.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.patterns() == other.patterns()
    }
}

// ============================================================================
// TESTS
// ============================================================================
