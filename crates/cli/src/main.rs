//! tracker-migrate entry point.
//!
//! This binary is the composition root for the entire workspace:
//!
//! 1. **Parse configuration**: command-line flags with environment-variable
//!    fallbacks ([`args`]), validated into [`config::AppConfig`].
//! 2. **Wire observability**: a `tracing-subscriber` text or JSON layer and an
//!    optional OpenTelemetry OTLP exporter ([`telemetry`]).
//! 3. **Construct infrastructure**: the Jira client, CSV store and attachment
//!    catalog are created here and injected into `engine::Migrator` ([`app`]).
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Every record and file succeeded |
//! | 1 | The run aborted (configuration, authentication, unreadable files) |
//! | 2 | The run finished but some records or files failed |

mod app;
mod args;
mod config;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};

use crate::app::Completion;
use crate::args::Cli;

const EXIT_FATAL: u8 = 1;
const EXIT_ITEM_FAILURES: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start the async runtime: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let telemetry = {
        let _context = runtime.enter();
        match telemetry::init(&cli.telemetry) {
            Ok(telemetry) => telemetry,
            Err(e) => {
                eprintln!("{e:#}");
                return ExitCode::from(EXIT_FATAL);
            }
        }
    };

    let code = match runtime.block_on(app::execute(cli)) {
        Ok(Completion::Clean) => ExitCode::SUCCESS,
        Ok(Completion::ItemFailures(failures)) => {
            warn!(failures, "finished with failed items; see the ledger and log for details");
            ExitCode::from(EXIT_ITEM_FAILURES)
        }
        Err(e) => {
            error!("migration aborted: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    };

    telemetry.shutdown();
    code
}
