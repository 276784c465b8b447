// ⚙️ Run Configuration
// Validated options for a lookup run and vendor credentials from the environment

use crate::readers::InputFormat;
use crate::vendors::VendorRegistry;
use crate::writers::OutputFormat;
use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_DB_PATH: &str = "partsy.yaml";
pub const DEFAULT_FARNELL_STORE: &str = "uk.farnell.com";

// ============================================================================
// VENDOR SETTINGS
// ============================================================================

/// Credentials and endpoints for the vendor catalogs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSettings {
    /// element14 API key (`FARNELL_API_KEY`)
    pub farnell_api_key: Option<String>,

    /// element14 store id (`FARNELL_STORE`)
    pub farnell_store: String,
}

impl VendorSettings {
    /// Read settings from the environment, honouring a `.env` file
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let farnell_api_key = env::var("FARNELL_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let farnell_store = env::var("FARNELL_STORE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FARNELL_STORE.to_string());

        info!(
            farnell_api_key_set = farnell_api_key.is_some(),
            farnell_store = %farnell_store,
            "Loaded vendor settings"
        );

        VendorSettings {
            farnell_api_key,
            farnell_store,
        }
    }
}

impl Default for VendorSettings {
    fn default() -> Self {
        VendorSettings {
            farnell_api_key: None,
            farnell_store: DEFAULT_FARNELL_STORE.to_string(),
        }
    }
}

// ============================================================================
// LOOKUP CONFIG
// ============================================================================

/// Everything a `lookup` run needs to know, independent of how it was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// BOM file; `None` reads standard input
    pub input: Option<PathBuf>,

    /// Order list file; `None` writes standard output
    pub output: Option<PathBuf>,

    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    pub db_path: PathBuf,

    /// Prompt for unmatched items instead of failing
    pub interactive: bool,

    /// Vendor assumed when an answer has no `vendor:` prefix
    pub default_vendor: Option<String>,

    /// Applied once to every ordered quantity
    pub multiplier: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            input: None,
            output: None,
            input_format: InputFormat::Auto,
            output_format: OutputFormat::Farnell,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            interactive: false,
            default_vendor: None,
            multiplier: 1,
        }
    }
}

impl LookupConfig {
    /// Reject option combinations that cannot work before touching any file
    pub fn validate(&self, vendors: &VendorRegistry) -> Result<()> {
        if let Some(vendor) = &self.default_vendor {
            if !vendors.contains(vendor) {
                bail!(
                    "unknown default vendor `{}` (known: {})",
                    vendor,
                    vendors.names().join(", ")
                );
            }
        }

        if self.multiplier == 0 {
            bail!("quantity multiplier must be at least 1");
        }

        if self.interactive && self.input.is_none() {
            bail!("interactive mode reads answers from stdin; pass the BOM with --input");
        }

        debug!(config = ?self, "Lookup configuration validated");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
