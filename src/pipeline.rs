// 🔁 Lookup Pipeline - BOM in, order sheet out
// Reader → Resolver → quantity staging → Writer

use crate::config::LookupConfig;
use crate::database::{Article, Database};
use crate::error::{PartsyError, Result};
use crate::item::Item;
use crate::readers::ReaderRegistry;
use crate::resolver::{Prompter, Resolution, Resolver};
use crate::vendors::VendorRegistry;
use crate::writers::{create_writer, OrderWriter};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use tracing::{error, info};

// ============================================================================
// REPORT
// ============================================================================

/// Outcome of a lookup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupReport {
    pub items: usize,
    /// Resolved items, ignored ones included
    pub matched: usize,
    pub ignored: usize,
    pub skipped: usize,
    /// Items nothing matched (batch mode)
    pub unmatched: Vec<String>,
    /// Rows written to the order sheet
    pub written: usize,
    /// Items whose article lacks the output vendor's order number
    pub missing: Vec<String>,
}

impl LookupReport {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty() && self.missing.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} items: {} matched ({} ignored), {} skipped, {} unmatched; {} rows written, {} missing order numbers",
            self.items,
            self.matched,
            self.ignored,
            self.skipped,
            self.unmatched.len(),
            self.written,
            self.missing.len()
        )
    }

    /// Turn leftover problems into the run's error.
    ///
    /// Unmatched items take precedence: with any of them nothing was written.
    pub fn into_result(self) -> Result<Self> {
        if !self.unmatched.is_empty() {
            return Err(PartsyError::Unmatched {
                count: self.unmatched.len(),
            });
        }
        if !self.missing.is_empty() {
            return Err(PartsyError::IncompleteOrder {
                count: self.missing.len(),
            });
        }
        Ok(self)
    }
}

// ============================================================================
// STAGING
// ============================================================================

/// A resolved item ready for output, quantity already multiplied
#[derive(Debug, Clone, PartialEq)]
pub struct StagedOrder {
    pub item: Item,
    pub article: Article,
}

/// Resolve every item, then stage the orderable ones.
///
/// All items are resolved before anything fails so that every unmatched
/// item shows up in one run.
pub fn resolve_items(
    items: &[Item],
    resolver: &mut Resolver<'_>,
    multiplier: u32,
    report: &mut LookupReport,
) -> Result<Vec<StagedOrder>> {
    let mut staged = Vec::new();
    report.items += items.len();

    for item in items {
        match resolver.resolve(item)? {
            Resolution::Resolved(article) => {
                report.matched += 1;
                if article.ignore {
                    report.ignored += 1;
                    continue;
                }
                staged.push(StagedOrder {
                    item: item.scaled(multiplier)?,
                    article,
                });
            }
            Resolution::Skipped => report.skipped += 1,
            Resolution::Unmatched => {
                error!(item = %item, line = item.line_number, "Not matched");
                report.unmatched.push(item.to_string());
            }
        }
    }

    Ok(staged)
}

/// Hand staged orders to a writer.
///
/// A missing order number is recorded and the next row is written; any
/// other error stops the run.
pub fn write_orders(
    orders: &[StagedOrder],
    writer: &mut dyn OrderWriter,
    report: &mut LookupReport,
) -> Result<()> {
    for order in orders {
        match writer.output(&order.item, &order.article) {
            Ok(()) => report.written += 1,
            Err(e @ PartsyError::MissingVendorMapping { .. }) => {
                error!(error = %e, "Missing vendor order number");
                report.missing.push(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }
    writer.finish()
}

// ============================================================================
// RUN
// ============================================================================

/// Run a whole lookup as configured.
///
/// `prompter` is only used in interactive mode. Returns the report even
/// when items are left unmatched or unorderable; see
/// [`LookupReport::into_result`]. Fatal conditions (bad database,
/// undetectable input, vendor failures, I/O) are errors.
pub fn run_lookup(
    config: &LookupConfig,
    readers: &ReaderRegistry,
    vendors: &VendorRegistry,
    prompter: Option<&mut dyn Prompter>,
) -> Result<LookupReport> {
    let mut db = Database::load_file(&config.db_path)?;

    let bom = read_input(config)?;
    let items = readers.read_items(config.input_format, &bom)?;
    info!(items = items.len(), "Read BOM");

    let mut report = LookupReport::default();

    let staged = {
        let mut resolver = match (config.interactive, prompter) {
            (true, Some(prompter)) => Resolver::interactive(
                &mut db,
                vendors,
                prompter,
                config.default_vendor.clone(),
                Some(config.db_path.as_path()),
            ),
            (true, None) => return Err(PartsyError::NoPrompter),
            (false, _) => Resolver::batch(&mut db, vendors),
        };
        resolve_items(&items, &mut resolver, config.multiplier, &mut report)?
    };

    if !report.unmatched.is_empty() {
        // Nothing is written, not even the header
        return Ok(report);
    }

    let out: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| PartsyError::io(path, e))?,
        )),
        None => Box::new(io::stdout()),
    };
    let mut writer = create_writer(config.output_format, out)?;
    write_orders(&staged, writer.as_mut(), &mut report)?;

    info!(summary = %report.summary(), "Lookup finished");
    Ok(report)
}

fn read_input(config: &LookupConfig) -> Result<Vec<u8>> {
    match &config.input {
        Some(path) => fs::read(path).map_err(|e| PartsyError::io(path, e)),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| PartsyError::io("<stdin>", e))?;
            Ok(buf)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
