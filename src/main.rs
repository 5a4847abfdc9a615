use crate::app::App;
use crate::cli::Args;
use crate::config::Config;
use crate::logging::setup_logging;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

mod app;
mod cache;
mod cli;
mod config;
mod github;
mod logging;
mod refresh;
mod state;
mod web;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before logging setup so startup logs are never silently
    // dropped.
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        orgs = config.orgs.len(),
        "starting gofetch"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(()) => {
            info!("exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "exited with failure");
            ExitCode::FAILURE
        }
    }
}
