//! portprobe - a concurrent TCP port scanner.

use anyhow::{anyhow, Context};
use clap::Parser;
use portprobe::cli::{Cli, Commands};
use portprobe::config::AppSettings;
use portprobe::error::CliResult;
use portprobe::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.quiet) {
        output::print_warning(&format!("{e:#}"));
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Scan(cmd) => {
            let settings = AppSettings::load(cli.config.as_deref())?;
            cmd.execute(&settings, cli.verbose, cli.quiet).await
        }
        Commands::Profiles(cmd) => cmd.execute(cli.quiet),
    }
}

/// Log to stderr so stdout stays clean for results. `RUST_LOG` overrides the
/// level picked from the flags.
fn init_tracing(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    let default = match (verbose, quiet) {
        (true, _) => "portprobe=debug",
        (_, true) => "error",
        _ => "warn",
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default).context("invalid log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("failed to initialize logging")
}
