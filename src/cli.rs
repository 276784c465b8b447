use crate::config::{LookupConfig, VendorSettings, DEFAULT_DB_PATH};
use crate::pipeline::run_lookup;
use crate::readers::{InputFormat, ReaderRegistry};
use crate::resolver::{Prompter, TerminalPrompter};
use crate::vendors::VendorRegistry;
use crate::writers::OutputFormat;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;

/// CLI for partsy: look up order numbers for the parts of a BOM.
#[derive(Parser)]
#[clap(
    name = "partsy",
    version,
    about = "Look up order numbers for the parts of a bill of materials"
)]
pub struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up parts in the database, writing an order sheet
    Lookup(LookupArgs),

    /// Look up a single order number in a vendor catalog
    Vendor {
        /// Vendor name (reichelt, farnell)
        vendor: String,

        /// The vendor's order number
        order_no: String,
    },
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// BOM file (default: stdin)
    #[clap(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Order sheet file (default: stdout)
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    #[clap(short = 'I', long, value_enum, default_value = "auto")]
    pub input_format: InputFormat,

    #[clap(short = 'O', long, value_enum, default_value = "farnell")]
    pub output_format: OutputFormat,

    /// Parts database file
    #[clap(short = 'D', long = "db", env = "PARTSY_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Ask for order numbers of unmatched parts instead of failing
    #[clap(long)]
    pub interactive: bool,

    /// Vendor to use for answers without a `vendor:` prefix
    #[clap(short = 'd', long)]
    pub default_vendor: Option<String>,

    /// Multiply every quantity (e.g. number of boards)
    #[clap(short = 'm', long = "multiply", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub multiplier: u32,
}

impl From<LookupArgs> for LookupConfig {
    fn from(args: LookupArgs) -> Self {
        LookupConfig {
            input: args.input,
            output: args.output,
            input_format: args.input_format,
            output_format: args.output_format,
            db_path: args.db,
            interactive: args.interactive,
            default_vendor: args.default_vendor.map(|v| v.to_lowercase()),
            multiplier: args.multiplier,
        }
    }
}

/// CLI logic entrypoint, shared by main() and tests
pub fn run(cli: Cli) -> Result<()> {
    let settings = VendorSettings::from_env();
    let vendors = VendorRegistry::with_defaults(&settings).context("Failed to set up vendor clients")?;

    match cli.command {
        Commands::Lookup(args) => {
            let config = LookupConfig::from(args);
            config.validate(&vendors)?;

            let readers = ReaderRegistry::with_defaults();

            // Only lock stdin for prompts when it is not the BOM
            let mut prompter = if config.interactive {
                Some(TerminalPrompter::new(io::stdin().lock(), io::stderr()))
            } else {
                None
            };

            let report = run_lookup(
                &config,
                &readers,
                &vendors,
                prompter.as_mut().map(|p| p as &mut dyn Prompter),
            )
            .with_context(|| format!("Lookup against {} failed", config.db_path.display()))?;

            for item in &report.unmatched {
                eprintln!("Not matched: {}", item);
            }
            for missing in &report.missing {
                eprintln!("Not ordered: {}", missing);
            }
            eprintln!("{}", report.summary());

            report.into_result()?;
            Ok(())
        }

        Commands::Vendor { vendor, order_no } => {
            let vendor = vendor.to_lowercase();
            if !vendors.contains(&vendor) {
                anyhow::bail!(
                    "unknown vendor `{}` (known: {})",
                    vendor,
                    vendors.names().join(", ")
                );
            }

            let vitem = vendors.lookup(&vendor, &order_no)?;
            println!("{}", vitem);
            Ok(())
        }
    }
}
