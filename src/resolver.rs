// 🔎 Resolver - Item → Article, asking the user when the database has no answer
//
// Per item:
//   Matching ──hit──────────────────────────────────▶ Resolved
//      │ miss, batch ───────────────────────────────▶ Unmatched
//      │ miss, interactive
//      ▼
//   Prompting ──blank──────────────────────────────▶ Skipped
//      │ bad answer ──▶ Prompting
//      ▼
//   LookingUp ──vendor error───────────────────────▶ (fatal)
//      ▼
//   Confirming ──yes: add + save──┐
//      │ no ──────────────────────┴────────────────▶ Resolved

use crate::database::{Article, Database};
use crate::error::{PartsyError, Result};
use crate::item::Item;
use crate::vendors::VendorRegistry;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// RESOLUTION
// ============================================================================

/// Terminal state for one item
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Article),
    /// User left the item out of this run
    Skipped,
    /// No match in batch mode
    Unmatched,
}

/// Parsed answer to the order number prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Skip,
    Lookup { vendor: String, order_no: String },
}

/// Interpret a `vendor:order_no` answer.
///
/// Without a `:` the default vendor is used; when there is none the answer
/// is rejected rather than guessed at.
pub fn parse_answer(
    answer: &str,
    default_vendor: Option<&str>,
    vendors: &VendorRegistry,
) -> std::result::Result<Answer, String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(Answer::Skip);
    }

    let (vendor, order_no) = match answer.split_once(':') {
        Some((vendor, order_no)) => (vendor.trim().to_lowercase(), order_no.trim()),
        None => match default_vendor {
            Some(vendor) => (vendor.to_string(), answer),
            None => return Err("no vendor given and no default vendor set".to_string()),
        },
    };

    if !vendors.contains(&vendor) {
        return Err(format!(
            "unknown vendor `{}` (known: {})",
            vendor,
            vendors.names().join(", ")
        ));
    }

    if order_no.is_empty() {
        return Err("order number is empty".to_string());
    }

    Ok(Answer::Lookup {
        vendor,
        order_no: order_no.to_string(),
    })
}

// ============================================================================
// PROMPTER
// ============================================================================

/// The human on the other side of an interactive run
pub trait Prompter {
    /// Ask for `vendor:order_no` for an unmatched item; blank skips it
    fn ask_order_no(&mut self, item: &Item) -> Result<String>;

    /// Show a new article and ask whether to store it. Defaults to yes.
    fn confirm_add(&mut self, article: &Article) -> Result<bool>;

    /// Tell the user an answer was not usable
    fn reject(&mut self, message: &str) -> Result<()>;
}

/// Prompter over any line-based input and text output
pub struct TerminalPrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompter { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|e| PartsyError::io("<prompt>", e))
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .map_err(|e| PartsyError::io("<prompt>", e))?;

        if n == 0 {
            return Err(PartsyError::io(
                "<prompt>",
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input closed while prompting"),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask_order_no(&mut self, item: &Item) -> Result<String> {
        self.say(&format!(
            "Not matched: {}\nOrder number (vendor:order_no, blank to skip): ",
            item
        ))?;
        self.read_line()
    }

    fn confirm_add(&mut self, article: &Article) -> Result<bool> {
        self.say(&format!("New article:\n{}", article.to_yaml()?))?;

        loop {
            self.say("Add to database? [Y/n] ")?;
            match self.read_line()?.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer y or n.\n")?,
            }
        }
    }

    fn reject(&mut self, message: &str) -> Result<()> {
        self.say(&format!("Error: {}\n", message))
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolution steps for one item
enum State {
    Matching,
    Prompting,
    LookingUp { vendor: String, order_no: String },
    Confirming(Article),
    Done(Resolution),
}

enum Mode<'a> {
    Batch,
    Interactive {
        prompter: &'a mut dyn Prompter,
        default_vendor: Option<String>,
        /// Accepted articles are written here right away
        db_path: Option<PathBuf>,
    },
}

pub struct Resolver<'a> {
    db: &'a mut Database,
    vendors: &'a VendorRegistry,
    mode: Mode<'a>,
}

impl<'a> Resolver<'a> {
    /// Never prompts; misses end as `Unmatched`
    pub fn batch(db: &'a mut Database, vendors: &'a VendorRegistry) -> Self {
        Resolver {
            db,
            vendors,
            mode: Mode::Batch,
        }
    }

    /// Prompts for misses. Articles the user accepts are appended to `db`
    /// and, if `db_path` is given, the file is rewritten immediately.
    pub fn interactive(
        db: &'a mut Database,
        vendors: &'a VendorRegistry,
        prompter: &'a mut dyn Prompter,
        default_vendor: Option<String>,
        db_path: Option<&Path>,
    ) -> Self {
        Resolver {
            db,
            vendors,
            mode: Mode::Interactive {
                prompter,
                default_vendor,
                db_path: db_path.map(Path::to_path_buf),
            },
        }
    }

    pub fn database(&self) -> &Database {
        self.db
    }

    /// Drive one item to a terminal state.
    ///
    /// Vendor failures abort with `PartsyError::Lookup`; articles saved for
    /// earlier items stay saved.
    pub fn resolve(&mut self, item: &Item) -> Result<Resolution> {
        let mut state = State::Matching;

        loop {
            state = match state {
                State::Matching => match self.db.find(item) {
                    Some(article) => {
                        debug!(item = %item, article = %article, "Matched");
                        State::Done(Resolution::Resolved(article.clone()))
                    }
                    None if matches!(self.mode, Mode::Batch) => {
                        warn!(item = %item, line = item.line_number, "No article matches item");
                        State::Done(Resolution::Unmatched)
                    }
                    None => State::Prompting,
                },

                State::Prompting => self.prompt(item)?,

                State::LookingUp { vendor, order_no } => {
                    let vitem = self.vendors.lookup(&vendor, &order_no)?;
                    State::Confirming(Article::from_vendor_item(&vitem, item)?)
                }

                State::Confirming(article) => {
                    if self.confirm(&article)? {
                        self.store(article.clone())?;
                    } else {
                        info!(article = %article, "New article used for this run only");
                    }
                    State::Done(Resolution::Resolved(article))
                }

                State::Done(resolution) => return Ok(resolution),
            };
        }
    }

    fn prompt(&mut self, item: &Item) -> Result<State> {
        let vendors = self.vendors;
        let Mode::Interactive {
            prompter,
            default_vendor,
            ..
        } = &mut self.mode
        else {
            return Ok(State::Done(Resolution::Unmatched));
        };

        let answer = prompter.ask_order_no(item)?;
        match parse_answer(&answer, default_vendor.as_deref(), vendors) {
            Ok(Answer::Skip) => {
                info!(item = %item, "Item skipped by user");
                Ok(State::Done(Resolution::Skipped))
            }
            Ok(Answer::Lookup { vendor, order_no }) => Ok(State::LookingUp { vendor, order_no }),
            Err(message) => {
                prompter.reject(&message)?;
                Ok(State::Prompting)
            }
        }
    }

    fn confirm(&mut self, article: &Article) -> Result<bool> {
        match &mut self.mode {
            Mode::Interactive { prompter, .. } => prompter.confirm_add(article),
            Mode::Batch => Ok(false),
        }
    }

    fn store(&mut self, article: Article) -> Result<()> {
        info!(article = %article, "Adding article to database");
        self.db.add(article);

        if let Mode::Interactive {
            db_path: Some(path), ..
        } = &self.mode
        {
            self.db.save(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::vendors::{MockVendor, VendorItem};
    use std::fs;
    use std::io::Cursor;

    const DB: &str = "\
- name: 10k resistor
  matches:
  - symbol: ^R$
    footprint: ^0805$
  vendor:
    farnell: 123-456
";

    fn item(symbol: &str, footprint: &str) -> Item {
        Item::new(1, 2)
            .with_field("symbol", symbol)
            .with_field("footprint", footprint)
    }

    fn vendors_returning(name: &'static str, calls: usize) -> VendorRegistry {
        let mut mock = MockVendor::new();
        mock.expect_lookup()
            .times(calls)
            .returning(move |order_no| Ok(VendorItem::new("farnell", order_no, name)));

        let mut registry = VendorRegistry::new();
        registry.register("farnell", mock);
        registry
    }

    fn prompter(script: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_parse_answer() {
        let vendors = vendors_returning("x", 0);

        assert_eq!(parse_answer("  ", None, &vendors), Ok(Answer::Skip));
        assert_eq!(
            parse_answer("Farnell: 999 ", None, &vendors),
            Ok(Answer::Lookup {
                vendor: "farnell".to_string(),
                order_no: "999".to_string()
            })
        );
        assert_eq!(
            parse_answer("999", Some("farnell"), &vendors),
            Ok(Answer::Lookup {
                vendor: "farnell".to_string(),
                order_no: "999".to_string()
            })
        );
        assert!(parse_answer("999", None, &vendors).is_err());
        assert!(parse_answer("digikey:999", None, &vendors).unwrap_err().contains("digikey"));
        assert_eq!(
            parse_answer("farnell:", None, &vendors),
            Err("order number is empty".to_string())
        );
    }

    #[test]
    fn test_batch_hit_and_miss() {
        let mut db = Database::from_yaml(DB).unwrap();
        let vendors = vendors_returning("x", 0);
        let mut resolver = Resolver::batch(&mut db, &vendors);

        match resolver.resolve(&item("R", "0805")).unwrap() {
            Resolution::Resolved(article) => assert_eq!(article.name, "10k resistor"),
            other => panic!("unexpected resolution: {other:?}"),
        }
        assert_eq!(resolver.resolve(&item("C", "0805")).unwrap(), Resolution::Unmatched);
    }

    #[test]
    fn test_interactive_skip() {
        let mut db = Database::from_yaml(DB).unwrap();
        let vendors = vendors_returning("x", 0);
        let mut prompts = prompter("\n");

        let mut resolver = Resolver::interactive(&mut db, &vendors, &mut prompts, None, None);
        assert_eq!(resolver.resolve(&item("C", "0805")).unwrap(), Resolution::Skipped);
    }

    #[test]
    fn test_interactive_lookup_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.yaml");
        fs::write(&path, DB).unwrap();

        let mut db = Database::load_file(&path).unwrap();
        let vendors = vendors_returning("Cap 100nF", 1);
        // Accept the default answer to the confirmation
        let mut prompts = prompter("farnell:999\n\n");

        let resolution = {
            let mut resolver = Resolver::interactive(&mut db, &vendors, &mut prompts, None, Some(path.as_path()));
            resolver.resolve(&item("C", "0805")).unwrap()
        };

        let article = match resolution {
            Resolution::Resolved(article) => article,
            other => panic!("unexpected resolution: {other:?}"),
        };
        assert_eq!(article.name, "Cap 100nF");
        assert_eq!(article.rules.len(), 1);
        assert_eq!(article.order_no("farnell"), Some("999"));

        // Appended after the existing article, on disk
        let on_disk = Database::load_file(&path).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk.articles()[0].name, "10k resistor");
        assert_eq!(on_disk.articles()[1].name, "Cap 100nF");
        assert_eq!(db.len(), 2);

        let transcript = String::from_utf8(prompts.into_output()).unwrap();
        assert!(transcript.contains("Not matched: Item("));
        assert!(transcript.contains("name: Cap 100nF"));
    }

    #[test]
    fn test_interactive_declined_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.yaml");
        fs::write(&path, DB).unwrap();

        let mut db = Database::load_file(&path).unwrap();
        let vendors = vendors_returning("Cap 100nF", 1);
        let mut prompts = prompter("farnell:999\nn\n");

        let resolution = Resolver::interactive(&mut db, &vendors, &mut prompts, None, Some(path.as_path()))
            .resolve(&item("C", "0805"))
            .unwrap();

        assert!(matches!(resolution, Resolution::Resolved(ref a) if a.name == "Cap 100nF"));
        assert_eq!(db.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), DB);
    }

    #[test]
    fn test_interactive_reprompts_until_usable() {
        let mut db = Database::from_yaml(DB).unwrap();
        let vendors = vendors_returning("Cap 100nF", 1);
        // no vendor, unknown vendor, empty order number, then a good answer
        let mut prompts = prompter("999\ndigikey:1\nfarnell:\nfarnell:999\ny\n");

        let resolution = Resolver::interactive(&mut db, &vendors, &mut prompts, None, None)
            .resolve(&item("C", "0805"))
            .unwrap();
        assert!(matches!(resolution, Resolution::Resolved(_)));

        let transcript = String::from_utf8(prompts.into_output()).unwrap();
        assert_eq!(transcript.matches("Error: ").count(), 3);
        assert!(transcript.contains("no default vendor"));
    }

    #[test]
    fn test_interactive_default_vendor() {
        let mut db = Database::from_yaml(DB).unwrap();
        let vendors = vendors_returning("Cap 100nF", 1);
        let mut prompts = prompter("999\ny\n");

        let resolution = Resolver::interactive(&mut db, &vendors, &mut prompts, Some("farnell".to_string()), None)
            .resolve(&item("C", "0805"))
            .unwrap();

        match resolution {
            Resolution::Resolved(article) => assert_eq!(article.order_no("farnell"), Some("999")),
            other => panic!("unexpected resolution: {other:?}"),
        }
        // Accepted without a backing file: only the in-memory database grows
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn test_lookup_failure_is_fatal() {
        let mut mock = MockVendor::new();
        mock.expect_lookup()
            .times(1)
            .returning(|order_no| Err(LookupError::new("farnell", order_no, "HTTP 503")));
        let mut vendors = VendorRegistry::new();
        vendors.register("farnell", mock);

        let mut db = Database::from_yaml(DB).unwrap();
        let mut prompts = prompter("farnell:999\n");

        let err = Resolver::interactive(&mut db, &vendors, &mut prompts, None, None)
            .resolve(&item("C", "0805"))
            .unwrap_err();

        match err {
            PartsyError::Lookup(e) => {
                assert_eq!(e.order_no, "999");
                assert_eq!(e.cause, "HTTP 503");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_closed_input_aborts() {
        let mut db = Database::from_yaml(DB).unwrap();
        let vendors = vendors_returning("x", 0);
        let mut prompts = prompter("");

        let result = Resolver::interactive(&mut db, &vendors, &mut prompts, None, None).resolve(&item("C", "0805"));
        assert!(matches!(result, Err(PartsyError::Io { .. })));
    }
}
