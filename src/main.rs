use anyhow::Result;
use clap::Parser;
use partsy::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout may be the order sheet
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("PARTSY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("Tracing initialised, arguments parsed");

    let result = run(cli);
    if let Err(e) = &result {
        tracing::error!(error = %e, "partsy exited with error");
    }
    result
}
