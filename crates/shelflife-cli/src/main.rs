//! Shelflife - store JSON values that expire, from the command line.
//!
//! Entries live in a directory of JSON files (see `Config` for its
//! location) and are purged the first time they are read after expiring.

mod command;

use std::io;

use anyhow::Result;
use shelflife_core::Config;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use command::{Command, USAGE};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let store = config.open_store()?;
    let cache = config.expiring_store();
    debug!(
        dir = %store.dir().display(),
        default_ttl_minutes = cache.default_ttl_minutes(),
        "Opened store"
    );

    info!(?command, "Running command");
    let mut stdout = io::stdout().lock();
    command::run(command, &store, &cache, &mut stdout).await
}
