// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell: native shell hosting web content with a capability bridge.
//
// Entry point. Initialises logging and the fault handler, builds the shell
// services, and drives the headless shell from stdin. A restart requested by
// hosted content rebuilds the services from the saved settings.

mod crash;
mod driver;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::human_errors::{Severity, humanize_error};

use driver::Exit;
use services::shell_services::{ShellOptions, ShellServices};

/// Headless webshell: mounts the capability bridge and reads calls from stdin.
#[derive(Debug, Parser)]
#[command(name = "webshell", version, about)]
struct Cli {
    /// Directory holding config.json and crash reports.
    #[arg(long, env = "WEBSHELL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Quick configuration JSON file to import before startup.
    #[arg(long)]
    quick_config: Option<PathBuf>,

    /// Browser engine version to report (e.g. "103.0.5060.73").
    #[arg(long)]
    engine_version: Option<String>,

    /// Resolve flows still pending after this many seconds as canceled.
    #[arg(long)]
    pending_timeout_secs: Option<u64>,

    /// Shell version reported to hosted content.
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    shell_version: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dir = cli.data_dir.clone().unwrap_or_else(services::data_dir::data_dir);
    crash::install(dir.clone());

    if let Some(report) = crash::take_previous_report(&dir) {
        warn!(report = %report, "previous run ended in a fatal fault");
    }

    info!("Webshell starting");

    match run(&cli, dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let human = humanize_error(&e);
            error!(error = %e, "shell stopped");
            eprintln!("{}\n{}", human.message, human.suggestion);
            if human.severity == Severity::Fatal {
                eprintln!("[ Close ]");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, dir: PathBuf) -> Result<()> {
    let quick_config = match &cli.quick_config {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            ShellError::Config(format!("cannot read {}: {e}", path.display()))
        })?),
        None => None,
    };

    let mut options = ShellOptions {
        quick_config,
        engine_version: cli.engine_version.clone(),
        shell_version: cli.shell_version.clone(),
        pending_timeout: cli.pending_timeout_secs.map(Duration::from_secs),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let mut shell = ShellServices::init(&dir, &options)?;
        // Imported once; later starts read it back from the store.
        options.quick_config = None;

        match driver::run(&mut shell, &mut lines).await? {
            Exit::Restart => info!("restarting shell"),
            Exit::Close | Exit::Quit => return Ok(()),
        }
    }
}
