//! `ringcask-recover`: CLI driver for cross-replica recovery.
//!
//! Grounded on `kimberlite-cli::main`'s shape — init tracing, parse argv,
//! dispatch to a command body, map `Result` to a process exit code.

mod cli;
mod commands;
mod transport;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, RecoveryCommand};

fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();

    let (pause_at_exit, result) = match cli.command {
        RecoveryCommand::Merge(args) => {
            init_tracing(args.debug);
            let pause_at_exit = args.pause_at_exit;
            (pause_at_exit, commands::run_merge(args))
        }
        RecoveryCommand::Dc(args) => {
            init_tracing(args.debug);
            let pause_at_exit = args.pause_at_exit;
            (pause_at_exit, commands::run_dc(args))
        }
    };

    let exit_code = match &result {
        Ok(transfer_count) => {
            tracing::info!(transfer_count, "recovery run finished");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "recovery run failed");
            1
        }
    };

    if pause_at_exit {
        commands::pause_for_exit();
    }

    std::process::exit(exit_code);
}
