//! sidecar - Keep sidecar files next to renamed or moved audio files
//!
//! Usage:
//!   sidecar relocate <FROM> <TO>   Relocate sidecars for one audio move
//!   sidecar preview <FROM> <TO>    Dry run of the same
//!   sidecar rules                  Show the active rule set
//!   sidecar attach <ROOT>          Attach lyrics and covers under ROOT
//!   sidecar cleanup <ROOT>         Remove dangling sidecar links
//!   sidecar --help                 Show help
//!
//! Exit status is 1 when rules are rejected or any entry fails, and 2 when
//! the root given to attach/cleanup does not exist.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let status = cli::run(args)?;
    Ok(ExitCode::from(status.code()))
}

/// Log to stderr so JSON output on stdout stays clean. `RUST_LOG` wins over
/// the verbosity flags.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
