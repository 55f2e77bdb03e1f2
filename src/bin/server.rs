//! Roster Server Binary
//!
//! Starts the TCP and UDP listeners for Roster.

use std::io::BufRead;
use std::thread;

use clap::{Parser, ValueEnum};
use roster::config::WalSyncStrategy;
use roster::network::{Daemon, ShutdownSignal, Transport};
use roster::{store, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// Roster Server
#[derive(Parser, Debug)]
#[command(name = "roster-server")]
#[command(about = "Institution and member registry over TCP and UDP")]
#[command(version)]
struct Args {
    /// TCP listen address (host:port)
    #[arg(long, default_value = "0.0.0.0:5000")]
    tcp_listen: String,

    /// UDP listen address (host:port)
    #[arg(long, default_value = "0.0.0.0:5001")]
    udp_listen: String,

    /// Which listeners to start
    #[arg(short, long, value_enum, default_value_t = TransportArg::Both)]
    transport: TransportArg,

    /// Persist data in this directory (in-memory if omitted)
    #[arg(short, long)]
    data_dir: Option<String>,

    /// fsync the WAL after every write instead of every 100
    #[arg(long)]
    sync_every_write: bool,

    /// Maximum concurrent TCP sessions (unbounded if omitted)
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Read `shutdown` from stdin to stop gracefully
    #[arg(long)]
    console: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Tcp,
    Udp,
    Both,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => Transport::Tcp,
            TransportArg::Udp => Transport::Udp,
            TransportArg::Both => Transport::Both,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,roster=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Roster Server v{}", roster::VERSION);

    // Build config from args
    let mut builder = Config::builder()
        .tcp_listen_addr(&args.tcp_listen)
        .udp_listen_addr(&args.udp_listen);
    if let Some(dir) = &args.data_dir {
        tracing::info!("Data directory: {}", dir);
        builder = builder.data_dir(dir);
    } else {
        tracing::info!("No data directory given, records are kept in memory only");
    }
    if args.sync_every_write {
        builder = builder.wal_sync_strategy(WalSyncStrategy::EveryWrite);
    }
    if let Some(max) = args.max_connections {
        builder = builder.max_connections(max);
    }
    let config = builder.build();

    // Open store
    let store = match store::open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let daemon = match Daemon::bind(config, store, args.transport.into()) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("Failed to bind listeners: {}", e);
            std::process::exit(1);
        }
    };

    if args.console {
        watch_console(daemon.shutdown_signal());
    }

    if let Err(e) = daemon.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Trigger shutdown when stdin says `shutdown` or closes
fn watch_console(signal: ShutdownSignal) {
    tracing::info!("Type `shutdown` to stop the server");
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("shutdown") => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        tracing::info!("Shutdown requested from console, draining...");
        signal.trigger();
    });
}
