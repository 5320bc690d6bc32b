//! Fixture gateway binary.
//!
//! Loads a fixture book, binds the gateway and serves clients until Ctrl+C.
//!
//! Usage example (CLI):
//! ```bash
//! crms_server --bind 0.0.0.0:7878 --fixtures crms_server/fixtures/sample.json
//! ```
#![warn(missing_docs)]
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crms_common::Result;
use crms_common::net::{GATEWAY_PORT, addr};
use crms_server::{FixtureBook, GatewayServer};
use log::{error, info};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Fixture gateway for CRMS observation clients", long_about = None)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value_t = addr("0.0.0.0", GATEWAY_PORT))]
    bind: String,

    /// Path to the JSON fixture book.
    #[arg(long)]
    fixtures: PathBuf,

    /// Seconds a connection may stay silent before it is closed.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    idle_timeout_secs: u64,
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let book = FixtureBook::load(&args.fixtures)?;
    info!(
        "Loaded fixture book {}: {} subjects, {} retrievals",
        args.fixtures.display(),
        book.subject_count(),
        book.retrieval_count()
    );

    let server = GatewayServer::bind(&args.bind, book)?
        .with_idle_timeout(Duration::from_secs(args.idle_timeout_secs));
    let handle = server.spawn()?;
    info!("Gateway running on {}. Press Ctrl+C to exit.", handle.local_addr());

    let stop = handle.stop_signal();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down gateway...");
        let _ = stop.try_send(());
    }) {
        error!("Failed to install Ctrl+C handler: {}", e);
    }

    let ledger = handle.ledger();
    handle.wait();

    let ledger = ledger.lock()?;
    info!(
        "Gateway stopped: {} store batches, {} cells accepted",
        ledger.len(),
        ledger.cells_written()
    );
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
