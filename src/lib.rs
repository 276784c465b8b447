// PartSy - BOM to vendor order list
// Exposes all modules for use in the CLI and tests

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod readers;
pub mod resolver;
pub mod rules;
pub mod schema;
pub mod vendors;
pub mod writers;

// Re-export commonly used types
pub use config::{LookupConfig, VendorSettings};
pub use database::{Article, ArticleRecord, Database};
pub use error::{LookupError, PartsyError};
pub use item::Item;
pub use pipeline::{resolve_items, run_lookup, write_orders, LookupReport, StagedOrder};
pub use readers::{BomReader, InputFormat, KiCadReader, ReaderRegistry};
pub use resolver::{parse_answer, Answer, Prompter, Resolution, Resolver, TerminalPrompter};
pub use rules::Rule;
pub use schema::{SchemaValidator, ValidationError, ValidationResult};
pub use vendors::{FarnellVendor, ReicheltVendor, Vendor, VendorItem, VendorRegistry};
pub use writers::{create_writer, FarnellWriter, OrderWriter, OutputFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
