// 🧩 Item - One normalized BOM row
// Readers produce these, rules match against them, writers consume them

use crate::error::{PartsyError, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Field name under which the quantity is exposed to rules
pub const QTY: &str = "qty";

/// Item - Output of a reader, one per input row
///
/// Text fields (`designator`, `footprint`, `symbol`, ...) live in `props`;
/// the quantity is kept as an integer but is visible to rules as the `qty`
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    props: BTreeMap<String, String>,
    qty: u32,

    /// Line in the original input (1-indexed, header is line 1)
    pub line_number: usize,
}

impl Item {
    pub fn new(qty: u32, line_number: usize) -> Self {
        Item {
            props: BTreeMap::new(),
            qty,
            line_number,
        }
    }

    /// Builder pattern: add a text field
    pub fn with_field(mut self, field: &str, value: impl Into<String>) -> Self {
        self.props.insert(field.to_string(), value.into());
        self
    }

    /// Look up a field by name. `None` if the row did not carry it.
    pub fn get(&self, field: &str) -> Option<Cow<'_, str>> {
        if field == QTY {
            return Some(Cow::Owned(self.qty.to_string()));
        }
        self.props.get(field).map(|v| Cow::Borrowed(v.as_str()))
    }

    pub fn qty(&self) -> u32 {
        self.qty
    }

    pub fn symbol(&self) -> Option<&str> {
        self.props.get("symbol").map(String::as_str)
    }

    pub fn footprint(&self) -> Option<&str> {
        self.props.get("footprint").map(String::as_str)
    }

    pub fn designator(&self) -> Option<&str> {
        self.props.get("designator").map(String::as_str)
    }

    /// Copy of this item with its quantity multiplied.
    ///
    /// Always scales the quantity read from the input; `self` is left alone
    /// so staging can never compound a multiplier.
    ///
    /// Fails if the scaled quantity does not fit a `u32`.
    pub fn scaled(&self, multiplier: u32) -> Result<Item> {
        let qty = self.qty.checked_mul(multiplier).ok_or_else(|| PartsyError::InvalidRow {
            line: self.line_number,
            message: format!("quantity {} times {} overflows", self.qty, multiplier),
        })?;

        Ok(Item {
            props: self.props.clone(),
            qty,
            line_number: self.line_number,
        })
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item(")?;
        for (field, value) in &self.props {
            write!(f, "{}={:?}, ", field, value)?;
        }
        write!(f, "qty={})", self.qty)
    }
}
