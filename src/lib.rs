//! # WHMCS Sync Dashboard
//!
//! Terminal dashboard for the WHMCS to FreeAgent invoice sync service:
//! sync status with a manual trigger, credential management with the
//! FreeAgent OAuth connect flow, and the sync log history. All data comes
//! from the sync backend's REST API.

pub mod api;
pub mod config;
pub mod host;
pub mod oauth_return;
pub mod render;
pub mod shell;
pub mod terminal;
pub mod views;

#[cfg(test)]
mod testing;

use clap::Parser;

pub fn run() {
    // Load .env before clap reads BACKEND_URL and friends
    dotenvy::dotenv().ok();

    // Frames go to stdout; keep stderr quiet unless asked
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = config::Cli::parse();
    let config = match config::DashboardConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            eprintln!("FATAL: Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(terminal::run(config)) {
        log::error!("Dashboard error: {}", e);
        eprintln!("FATAL: Dashboard error: {}", e);
        std::process::exit(1);
    }
}
