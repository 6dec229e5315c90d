//! portsweep binary entry point.

use clap::Parser;
use portsweep::cli::Args;
use portsweep::output::{print_error, print_warning};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` overrides the `warn` default.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        print_warning(&format!("logging disabled: {}", e));
    }

    match args.execute().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
