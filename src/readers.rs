// 🏗️ BOM Readers - CAD export → Items
// Polymorphic reader system with header-based format detection

use crate::error::{PartsyError, Result};
use crate::item::Item;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Input format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Pick the first reader whose header signature matches
    Auto,
    /// KiCad pcbnew BOM export
    Kicad,
}

impl InputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::Auto => "auto",
            InputFormat::Kicad => "kicad",
        }
    }
}

/// BomReader - turns rows of one CAD tool's export into Items
pub trait BomReader {
    /// Format this reader handles
    fn format(&self) -> InputFormat;

    /// Does the header carry this reader's signature?
    fn detect(&self, header: &StringRecord) -> bool;

    /// Can this reader work with the header at all? Used when the format
    /// was chosen explicitly and detection is skipped.
    fn accepts(&self, header: &StringRecord) -> bool;

    /// Convert one data row. `line_number` is 1-indexed, header on line 1.
    fn read_row(&self, record: &StringRecord, line_number: usize) -> Result<Item>;
}

// ============================================================================
// KICAD READER
// ============================================================================

/// KiCad pcbnew BOM export
///
/// Format: Id,Designator,Package,Quantity,Designation,Supplier and ref
/// Example: 1,"R1 R2","R_0805",2,"10k",
pub struct KiCadReader;

impl KiCadReader {
    pub const HEADER: [&'static str; 6] = [
        "Id",
        "Designator",
        "Package",
        "Quantity",
        "Designation",
        "Supplier and ref",
    ];

    pub fn new() -> Self {
        KiCadReader
    }
}

impl Default for KiCadReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BomReader for KiCadReader {
    fn format(&self) -> InputFormat {
        InputFormat::Kicad
    }

    fn detect(&self, header: &StringRecord) -> bool {
        header.len() >= Self::HEADER.len()
            && header.iter().zip(Self::HEADER.iter()).all(|(got, want)| got == *want)
    }

    fn accepts(&self, header: &StringRecord) -> bool {
        header.len() >= 5
    }

    fn read_row(&self, record: &StringRecord, line_number: usize) -> Result<Item> {
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| PartsyError::InvalidRow {
                line: line_number,
                message: format!("missing column {} ({})", idx + 1, name),
            })
        };

        let designator = field(1, "Designator")?;
        let footprint = field(2, "Package")?;
        let quantity = field(3, "Quantity")?;
        let symbol = field(4, "Designation")?;

        let qty: u32 = quantity.parse().map_err(|_| PartsyError::InvalidRow {
            line: line_number,
            message: format!("quantity `{}` is not a whole number", quantity),
        })?;

        let mut item = Item::new(qty, line_number)
            .with_field("designator", designator)
            .with_field("footprint", footprint)
            .with_field("symbol", symbol);

        if let Some(supplier_ref) = record.get(5).filter(|s| !s.is_empty()) {
            item = item.with_field("supplier_ref", supplier_ref);
        }

        Ok(item)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Ordered reader list; the first reader whose header matches wins
pub struct ReaderRegistry {
    readers: Vec<Box<dyn BomReader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        ReaderRegistry { readers: Vec::new() }
    }

    /// Registry with every supported CAD format
    pub fn with_defaults() -> Self {
        let mut registry = ReaderRegistry::new();
        registry.register(KiCadReader::new());
        registry
    }

    pub fn register<R: BomReader + 'static>(&mut self, reader: R) {
        self.readers.push(Box::new(reader));
    }

    pub fn get(&self, format: InputFormat) -> Option<&dyn BomReader> {
        self.readers
            .iter()
            .find(|r| r.format() == format)
            .map(|r| r.as_ref())
    }

    /// Detect the format of a raw export from its header row
    pub fn detect(&self, buffer: &[u8]) -> Option<&dyn BomReader> {
        let header = read_header(buffer).ok()?;
        let reader = self.readers.iter().find(|r| r.detect(&header))?;

        info!(format = reader.format().name(), "Detected input format");
        Some(reader.as_ref())
    }

    /// Parse a raw export into items, detecting the format if asked to
    pub fn read_items(&self, format: InputFormat, buffer: &[u8]) -> Result<Vec<Item>> {
        let reader = match format {
            InputFormat::Auto => self.detect(buffer).ok_or(PartsyError::FormatDetection)?,
            explicit => {
                let reader = self.get(explicit).ok_or_else(|| PartsyError::FormatRejected {
                    format: explicit.name().to_string(),
                })?;
                let header = read_header(buffer)?;
                if !reader.accepts(&header) {
                    return Err(PartsyError::FormatRejected {
                        format: explicit.name().to_string(),
                    });
                }
                if !reader.detect(&header) {
                    warn!(format = explicit.name(), "Header does not match, reading anyway");
                }
                reader
            }
        };

        let mut rows = csv_reader(buffer);
        let mut items = Vec::new();

        for (line_num, result) in rows.records().enumerate() {
            let record = result?;
            // +2 because: 1-indexed + header row
            items.push(reader.read_row(&record, line_num + 2)?);
        }

        debug!(items = items.len(), format = reader.format().name(), "Read BOM items");
        Ok(items)
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// KiCad writes `;`-separated files, other tools `,`. Decide from the header
/// line.
fn sniff_delimiter(buffer: &[u8]) -> u8 {
    let first_line = buffer.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();

    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn csv_reader(buffer: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(sniff_delimiter(buffer))
        .from_reader(buffer)
}

fn read_header(buffer: &[u8]) -> Result<StringRecord> {
    Ok(csv_reader(buffer).headers()?.clone())
}

// ============================================================================
// TESTS
// ============================================================================
