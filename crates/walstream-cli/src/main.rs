//! walrecv - streaming WAL archiver
//!
//! Connects to a database server's replication stream and maintains a
//! local directory shaped like a standard log archive: one 16 MiB file
//! per completed segment, published atomically on rollover, with a
//! crash-recovery protocol for the segment that was still growing.
//!
//! ## Usage
//!
//! ```bash
//! # Stream into ./archive (must exist), quietly
//! walrecv -c "host=db1 user=rep password=secret" -d ./archive
//!
//! # Lifecycle events (segment opened/published, save file retired)
//! walrecv -c "host=db1 user=rep" -d ./archive -v
//!
//! # Per-frame detail
//! walrecv -c "host=db1 user=rep" -d ./archive -vv
//! ```
//!
//! The connection string must not name a database: the receiver picks
//! the right one for each connection itself.
//!
//! ## Logging
//!
//! `-v` sets the default log filter (warn/info/debug); `RUST_LOG`
//! overrides it when set.
//!
//! ## Exit Status
//!
//! 0 when the server ends the stream cleanly (e.g. at shutdown);
//! 1 on any fatal error, with a single diagnostic line on stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use walstream_receiver::{Receiver, ReceiverConfig};

#[derive(Parser)]
#[command(name = "walrecv")]
#[command(about = "Stream a server's write-ahead log into a local archive directory")]
struct Cli {
    /// Connection string (key=value pairs): server and credentials,
    /// without a database
    #[arg(short, long)]
    conninfo: String,

    /// Archive directory to stream segments into; must already exist
    #[arg(short = 'd', long)]
    archive_dir: PathBuf,

    /// Increase verbosity (-v lifecycle events, -vv per-frame detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ReceiverConfig {
        conninfo: cli.conninfo,
        archive_dir: cli.archive_dir,
    };

    Receiver::new(config)
        .run()
        .await
        .context("replication stream failed")?;

    Ok(())
}
