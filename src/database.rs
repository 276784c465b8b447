// 🗄️ Parts Database - Articles and first-match lookup
// YAML file ⇄ ordered article list

use crate::error::{PartsyError, Result};
use crate::item::Item;
use crate::rules::Rule;
use crate::schema::SchemaValidator;
use crate::vendors::VendorItem;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// PERSISTED FORM
// ============================================================================

/// Article as stored in the database file.
///
/// Field order here is the field order on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArticleRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpart_no: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vendor: BTreeMap<String, String>,
}

fn is_false(val: &bool) -> bool {
    !*val
}

// ============================================================================
// ARTICLE
// ============================================================================

/// Article - one purchasable part
///
/// Matches an item if ANY of its rules does. Without rules it matches
/// nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub name: String,
    pub manufacturer: Option<String>,
    pub mpart_no: Option<String>,

    /// Known part that is never ordered (screws, test points, ...)
    pub ignore: bool,

    pub rules: Vec<Rule>,

    /// Vendor name → that vendor's order number
    pub vendors: BTreeMap<String, String>,
}

impl Article {
    /// Compile a validated record. `index` is only used for error reporting.
    pub fn from_record(index: usize, record: ArticleRecord) -> Result<Self> {
        let rules = record
            .matches
            .iter()
            .map(|patterns| {
                Rule::compile(patterns).map_err(|e| PartsyError::InvalidPattern {
                    index,
                    field: e.field,
                    source: e.source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Article {
            name: record.name,
            manufacturer: record.manufacturer,
            mpart_no: record.mpart_no,
            ignore: record.ignore,
            rules,
            vendors: record.vendor,
        })
    }

    /// Article discovered through a vendor lookup for an unmatched item.
    ///
    /// Gets a single rule matching the item's symbol and footprint exactly.
    pub fn from_vendor_item(vitem: &VendorItem, item: &Item) -> Result<Self> {
        let rule = Rule::exact([
            ("symbol", item.symbol().unwrap_or("")),
            ("footprint", item.footprint().unwrap_or("")),
        ])?;

        let mut vendors = BTreeMap::new();
        vendors.insert(vitem.vendor.clone(), vitem.order_no.clone());

        Ok(Article {
            name: vitem.name.clone(),
            manufacturer: None,
            mpart_no: None,
            ignore: false,
            rules: vec![rule],
            vendors,
        })
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.rules.iter().any(|rule| rule.matches(item))
    }

    pub fn order_no(&self, vendor: &str) -> Option<&str> {
        self.vendors.get(vendor).map(String::as_str)
    }

    pub fn to_record(&self) -> ArticleRecord {
        ArticleRecord {
            name: self.name.clone(),
            manufacturer: self.manufacturer.clone(),
            mpart_no: self.mpart_no.clone(),
            ignore: self.ignore,
            matches: self.rules.iter().map(Rule::patterns).collect(),
            vendor: self.vendors.clone(),
        }
    }

    /// The article as it would appear in the database file
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_record())?)
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        if let Some(manufacturer) = &self.manufacturer {
            write!(f, "{}, ", manufacturer)?;
        }
        if let Some(mpart_no) = &self.mpart_no {
            write!(f, "{}, ", mpart_no)?;
        }
        write!(f, "{}>", self.name)
    }
}

// ============================================================================
// DATABASE
// ============================================================================

/// Database - ordered article list, first match wins
///
/// Order is the order of the file and is preserved on dump. No index is
/// kept; lookups are a linear scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    articles: Vec<Article>,
}

impl Database {
    pub fn new(articles: Vec<Article>) -> Self {
        Database { articles }
    }

    /// Parse and validate a database document.
    ///
    /// An empty document is an empty database.
    pub fn from_yaml(src: &str) -> Result<Self> {
        let doc: Value = if src.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(src)?
        };

        let records = match doc {
            Value::Null => Vec::new(),
            Value::Sequence(records) => records,
            _ => {
                return Err(PartsyError::Schema {
                    index: 0,
                    field: "<document>".to_string(),
                    message: "expected a list of articles".to_string(),
                })
            }
        };

        let validator = SchemaValidator::new();
        let mut articles = Vec::with_capacity(records.len());

        for (index, raw) in records.into_iter().enumerate() {
            if let Err(errors) = validator.validate_record(index, &raw) {
                // Report the first problem; the rest usually follow from it
                let first = errors.into_iter().next().map(|e| (e.field, e.message));
                let (field, message) = first.unwrap_or_else(|| ("<record>".to_string(), "invalid".to_string()));
                return Err(PartsyError::Schema {
                    index,
                    field,
                    message,
                });
            }

            let record: ArticleRecord = serde_yaml::from_value(raw)?;
            articles.push(Article::from_record(index, record)?);
        }

        debug!(articles = articles.len(), "Parsed database");
        Ok(Database { articles })
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| PartsyError::io(path, e))?;
        let db = Database::from_yaml(&src)?;

        info!(db_path = %path.display(), articles = db.len(), "Loaded parts database");
        Ok(db)
    }

    /// First article, in stored order, matching the item
    pub fn find(&self, item: &Item) -> Option<&Article> {
        self.articles.iter().find(|article| article.matches(item))
    }

    /// Append an article. Does not persist.
    pub fn add(&mut self, article: Article) {
        self.articles.push(article);
    }

    /// Render the whole database in stored order.
    ///
    /// Output depends only on the article list, so rerunning the tool
    /// produces minimal diffs.
    pub fn dump(&self) -> Result<String> {
        let records: Vec<ArticleRecord> = self.articles.iter().map(Article::to_record).collect();
        let buf = serde_yaml::to_string(&records)?;

        // Blank line between top-level entries for readability
        Ok(buf.replace("\n- ", "\n\n- "))
    }

    /// Overwrite `path` with a full dump.
    ///
    /// Written to a sibling temp file first and renamed into place, so the
    /// file is either the old or the new database, never a partial one.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let buf = self.dump()?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PartsyError::io(dir, e))?;
        tmp.write_all(buf.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PartsyError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| PartsyError::io(path, e.error))?;

        info!(db_path = %path.display(), articles = self.len(), "Saved parts database");
        Ok(())
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;

    const DB: &str = r#"
- name: 10k resistor
  matches:
  - symbol: ^R$
    footprint: ^0805$
  vendor:
    farnell: 123-456

- name: Any 0805 part
  manufacturer: Generic
  matches:
  - footprint: ^0805$

- name: M3 screw
  ignore: true
  matches:
  - symbol: ^MountingHole.*
"#;

    fn item(symbol: &str, footprint: &str) -> Item {
        Item::new(1, 2)
            .with_field("symbol", symbol)
            .with_field("footprint", footprint)
    }

    #[test]
    fn test_load_articles_in_order() {
        let db = Database::from_yaml(DB).unwrap();

        assert_eq!(db.len(), 3);
        let names: Vec<&str> = db.articles().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["10k resistor", "Any 0805 part", "M3 screw"]);
        assert_eq!(db.articles()[0].order_no("farnell"), Some("123-456"));
        assert!(db.articles()[2].ignore);
        assert!(!db.articles()[1].ignore);
    }

    #[test]
    fn test_first_match_wins() {
        let db = Database::from_yaml(DB).unwrap();

        assert_eq!(db.find(&item("R", "0805")).unwrap().name, "10k resistor");
        assert_eq!(db.find(&item("C", "0805")).unwrap().name, "Any 0805 part");
        assert_eq!(db.find(&item("MountingHole_3.2mm", "none")).unwrap().name, "M3 screw");
        assert!(db.find(&item("C", "0603")).is_none());
    }

    #[test]
    fn test_match_is_deterministic() {
        let db = Database::from_yaml(DB).unwrap();
        let it = item("R", "0805");
        assert_eq!(db.find(&it), db.find(&it));
    }

    #[test]
    fn test_article_without_rules_matches_nothing() {
        let db = Database::from_yaml("- name: orphan\n  vendor:\n    farnell: '1'\n").unwrap();
        assert!(db.find(&item("R", "0805")).is_none());
    }

    #[test]
    fn test_empty_document_is_empty_database() {
        assert!(Database::from_yaml("").unwrap().is_empty());
        assert!(Database::from_yaml("# nothing yet\n").unwrap().is_empty());
        assert!(Database::from_yaml("[]").unwrap().is_empty());
    }

    #[test]
    fn test_schema_error_names_record() {
        let err = Database::from_yaml("- name: ok\n- name: bad\n  colour: red\n").unwrap_err();
        match err {
            PartsyError::Schema { index, field, .. } => {
                assert_eq!(index, 1);
                assert_eq!(field, "colour");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = Database::from_yaml("- name: x\n  matches:\n  - symbol: '[R'\n").unwrap_err();
        assert!(err.is_config_error());
        assert!(matches!(err, PartsyError::InvalidPattern { index: 0, .. }));
    }

    #[test]
    fn test_document_must_be_list() {
        let err = Database::from_yaml("name: lonely\n").unwrap_err();
        assert!(matches!(err, PartsyError::Schema { .. }));
    }

    #[test]
    fn test_dump_omits_absent_fields() {
        let db = Database::from_yaml(DB).unwrap();
        let out = db.dump().unwrap();

        assert!(!out.contains("null"));
        assert!(!out.contains("ignore: false"));
        assert!(out.contains("ignore: true"));
        assert!(out.contains("manufacturer: Generic"));
        // Entries separated by a blank line
        assert!(out.contains("\n\n- name: Any 0805 part"));
    }

    #[test]
    fn test_dump_load_roundtrip() {
        let db = Database::from_yaml(DB).unwrap();
        let reloaded = Database::from_yaml(&db.dump().unwrap()).unwrap();

        assert_eq!(db, reloaded);
        assert_eq!(db.dump().unwrap(), reloaded.dump().unwrap());
    }

    #[test]
    fn test_add_and_save_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.yaml");
        fs::write(&path, DB).unwrap();

        let mut db = Database::load_file(&path).unwrap();
        let vitem = VendorItem::new("farnell", "999", "Cap 100nF");
        db.add(Article::from_vendor_item(&vitem, &item("C", "0603")).unwrap());
        db.save(&path).unwrap();

        let reloaded = Database::load_file(&path).unwrap();
        assert_eq!(reloaded.len(), 4);
        let last = &reloaded.articles()[3];
        assert_eq!(last.name, "Cap 100nF");
        assert_eq!(last.order_no("farnell"), Some("999"));
        assert_eq!(reloaded.find(&item("C", "0603")).unwrap().name, "Cap 100nF");
    }

    #[test]
    fn test_article_from_vendor_item() {
        let vitem = VendorItem::new("farnell", "999", "Cap 100nF");
        let article = Article::from_vendor_item(&vitem, &item("C", "0805")).unwrap();

        assert_eq!(article.rules.len(), 1);
        assert!(article.matches(&item("C", "0805")));
        assert!(!article.matches(&item("C", "0603")));
        assert_eq!(article.vendors.len(), 1);
        assert_eq!(article.to_string(), "<Cap 100nF>");
    }

    #[test]
    fn test_article_display() {
        let db = Database::from_yaml(DB).unwrap();
        assert_eq!(db.articles()[1].to_string(), "<Generic, Any 0805 part>");
    }

    #[test]
    fn test_deployed_pattern_matches_whole_value() {
        let db = Database::from_yaml(
            "- name: 10k resistor\n  matches:\n  - symbol: 10k\n    footprint: R_0805\n",
        )
        .unwrap();

        assert_eq!(db.find(&item("10k", "R_0805")).map(|a| a.name.as_str()), Some("10k resistor"));
        assert!(db.find(&item("110k", "R_0805")).is_none());
    }

    fn record_strategy() -> impl Strategy<Value = ArticleRecord> {
        (
            "[A-Za-z][A-Za-z0-9 _]{0,11}",
            proptest::option::of("[A-Za-z]{1,8}"),
            proptest::option::of("[A-Z]{2}[0-9]{2,5}"),
            any::<bool>(),
            vec(
                btree_map("symbol|footprint|designator", "[A-Za-z0-9_]{1,6}(\\.\\*)?", 1..3),
                0..3,
            ),
            btree_map("farnell|reichelt", "[A-Z0-9]{1,3}-[0-9]{1,4}", 0..2),
        )
            .prop_map(|(name, manufacturer, mpart_no, ignore, matches, vendor)| ArticleRecord {
                name,
                manufacturer,
                mpart_no,
                ignore,
                matches,
                vendor,
            })
    }

    proptest! {
        #[test]
        fn prop_dump_load_roundtrip(records in vec(record_strategy(), 0..6)) {
            let articles = records
                .into_iter()
                .enumerate()
                .map(|(index, record)| Article::from_record(index, record).unwrap())
                .collect();
            let db = Database::new(articles);

            let dumped = db.dump().unwrap();
            let reloaded = Database::from_yaml(&dumped).unwrap();

            prop_assert_eq!(&db, &reloaded);
            prop_assert_eq!(dumped, reloaded.dump().unwrap());
        }

        #[test]
        fn prop_find_returns_first_matching_article(
            rules in vec(("[AB]{1,2}", any::<bool>()), 1..6),
            symbol in "[AB]{1,3}",
        ) {
            let yaml: String = rules
                .iter()
                .enumerate()
                .map(|(i, (literal, wildcard))| {
                    let pattern = if *wildcard { format!("{}.*", literal) } else { literal.clone() };
                    format!("- name: part {}\n  matches:\n  - symbol: '{}'\n", i, pattern)
                })
                .collect();
            let db = Database::from_yaml(&yaml).unwrap();
            let bom_item = item(&symbol, "0805");

            let expected = rules
                .iter()
                .position(|(literal, wildcard)| {
                    if *wildcard { symbol.starts_with(literal.as_str()) } else { symbol == *literal }
                })
                .map(|i| format!("part {}", i));

            let found = db.find(&bom_item).map(|a| a.name.clone());
            prop_assert_eq!(&found, &expected);
            prop_assert_eq!(db.find(&bom_item).map(|a| a.name.clone()), found);
        }
    }
}
