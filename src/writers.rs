// 🧾 Order Writers - (Item, Article) → vendor order sheet rows

use crate::database::Article;
use crate::error::{PartsyError, Result};
use crate::item::Item;
use std::io::Write;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Farnell "quick paste" order sheet
    Farnell,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Farnell => "farnell",
        }
    }

    /// Vendor whose order numbers the sheet lists
    pub fn vendor(&self) -> &'static str {
        match self {
            OutputFormat::Farnell => "farnell",
        }
    }
}

/// OrderWriter - emits one row per resolved, non-ignored item
pub trait OrderWriter {
    fn output(&mut self, item: &Item, article: &Article) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Build the writer for a format. Writes the header immediately.
pub fn create_writer<W: Write + 'static>(format: OutputFormat, out: W) -> Result<Box<dyn OrderWriter>> {
    match format {
        OutputFormat::Farnell => Ok(Box::new(FarnellWriter::new(out)?)),
    }
}

// ============================================================================
// FARNELL WRITER
// ============================================================================

/// Format: "Part Number","Quantity"
pub struct FarnellWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> FarnellWriter<W> {
    pub fn new(out: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(["Part Number", "Quantity"])?;
        Ok(FarnellWriter { writer })
    }

    /// Flush and hand back the underlying stream
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| PartsyError::io("<order sheet>", e.into_error()))
    }
}

impl<W: Write> OrderWriter for FarnellWriter<W> {
    fn output(&mut self, item: &Item, article: &Article) -> Result<()> {
        let vendor = OutputFormat::Farnell.vendor();
        let order_no = article
            .order_no(vendor)
            .ok_or_else(|| PartsyError::MissingVendorMapping {
                article: article.name.clone(),
                vendor: vendor.to_string(),
                item: item.to_string(),
            })?;

        let qty = item.qty().to_string();
        self.writer.write_record([order_no, qty.as_str()])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| PartsyError::io("<order sheet>", e))
    }
}
