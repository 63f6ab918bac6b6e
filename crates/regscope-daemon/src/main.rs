//! Regscope Daemon - Main entry point
//!
//! Owns the register workspace and serves the REST API, or runs a single
//! comparison of every stored dump and exits.

mod api;
mod config;
mod server;
mod state;
mod table;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "regscope")]
#[command(about = "Register dump comparison daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "regscope.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Compare all stored dumps, print the table and exit
    #[arg(long)]
    compare_once: bool,

    /// With --compare-once, only print mismatching rows
    #[arg(long)]
    diff_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Regscope v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        data_dir = %config.store.data_dir,
        store = %config.store.name,
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone()).await?;

    if args.compare_once {
        let ids: Vec<_> = state.dumps().await.into_iter().map(|d| d.id).collect();
        if ids.is_empty() {
            println!("No dumps stored.");
            return Ok(());
        }

        let report = state.compare(&ids, args.diff_only).await;
        print!("{}", table::render(&report));
        println!(
            "{} rows, {} mismatches",
            report.summary.rows, report.summary.mismatches
        );
    } else {
        server::run(state, &config.daemon.bind).await?;
    }

    Ok(())
}
