// 🚨 Error Taxonomy
// Every failure the matching engine can surface to the CLI

use crate::rules::InvalidPattern;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// LOOKUP ERROR (vendor catalog failures)
// ============================================================================

/// A vendor lookup failed.
///
/// Transport errors, non-success HTTP status and responses missing the
/// expected data are all flattened into `cause`; callers never need to
/// tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lookup of {vendor}:{order_no} failed: {cause}")]
pub struct LookupError {
    pub vendor: String,
    pub order_no: String,
    pub cause: String,
}

impl LookupError {
    pub fn new(vendor: &str, order_no: &str, cause: impl Into<String>) -> Self {
        LookupError {
            vendor: vendor.to_string(),
            order_no: order_no.to_string(),
            cause: cause.into(),
        }
    }
}

// ============================================================================
// PARTSY ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum PartsyError {
    /// A database record does not satisfy the article schema
    #[error("database record {index}: field `{field}`: {message}")]
    Schema {
        index: usize,
        field: String,
        message: String,
    },

    /// A match pattern is not a valid regular expression
    #[error("database record {index}: invalid pattern for `{field}`: {source}")]
    InvalidPattern {
        index: usize,
        field: String,
        #[source]
        source: regex::Error,
    },

    /// The rule built for a vendor-discovered article did not compile
    #[error("new article rule: {0}")]
    NewArticleRule(#[from] InvalidPattern),

    #[error("interactive mode needs a prompter")]
    NoPrompter,

    #[error("cannot determine input format")]
    FormatDetection,

    #[error("input is not in {format} format")]
    FormatRejected { format: String },

    #[error("line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    /// Raised once, after every item was scanned
    #[error("{count} item(s) could not be matched")]
    Unmatched { count: usize },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("article `{article}` has no {vendor} order number (needed for {item})")]
    MissingVendorMapping {
        article: String,
        vendor: String,
        item: String,
    },

    /// Some rows could not be written for lack of an order number
    #[error("{count} item(s) have no order number for the selected vendor")]
    IncompleteOrder { count: usize },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl PartsyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PartsyError::Io {
            path: path.into(),
            source,
        }
    }

    /// Malformed database content, detected before any item is processed
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PartsyError::Schema { .. } | PartsyError::InvalidPattern { .. } | PartsyError::Yaml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PartsyError>;
