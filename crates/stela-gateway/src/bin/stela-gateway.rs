//! Stela Gateway Binary
//!
//! Standalone ledger service: proof-of-work gated commit submission plus the
//! query surface, backed by a local SQLite database.
//!
//! # Usage
//! ```bash
//! stela-gateway [--port 4000] [--host 127.0.0.1] [--database ./data/commits.db]
//! ```
//!
//! Flags override `STELA_*` environment variables, which override defaults.

use clap::Parser;
use stela_gateway::{Gateway, GatewayConfig};

/// Stela Gateway - proof-of-work gated public commit ledger
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Path to the SQLite commit database
    #[arg(short, long)]
    database: Option<String>,

    /// Proof-of-work difficulty (leading zero hex characters)
    #[arg(long)]
    difficulty: Option<u32>,

    /// Retention window in days
    #[arg(long)]
    retention_days: Option<i64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    let mut config = GatewayConfig::from_env();
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(database) = args.database {
        config = config.with_database_path(database);
    }
    if let Some(difficulty) = args.difficulty {
        config.ledger.difficulty = difficulty;
    }
    if let Some(days) = args.retention_days {
        config.ledger.retention.window_days = days;
    }

    print_banner(&config);

    let gateway = Gateway::new(config)?;
    gateway.start().await?;

    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    println!();
    println!("  🪨  STELA — public commit ledger");
    println!();
    println!("  Listening on http://{}:{}", config.host, config.port);
    println!("  Database     {}", config.database_path);
    println!("  Difficulty   {}", config.ledger.difficulty);
    println!(
        "  Retention    {} days on {:?}, swept every {}h",
        config.ledger.retention.window_days,
        config.ledger.retention.field,
        config.ledger.retention.sweep_interval_secs / 3600
    );
    println!();
    println!("  Endpoints");
    println!("   ├─ POST /commits                         — submit a commit");
    println!("   ├─ GET  /commits?page&perPage            — recent commits");
    println!("   ├─ GET  /commits/random                  — random commit");
    println!("   ├─ GET  /commits/:signature              — single commit");
    println!("   ├─ GET  /commits/:signature/replies      — replies to a post");
    println!("   ├─ GET  /identities                      — known identities");
    println!("   ├─ GET  /identities/:identity/commits    — commits by identity");
    println!("   ├─ GET  /info                            — ledger statistics");
    println!("   └─ GET  /health                          — liveness");
    println!();
    println!("  Press Ctrl+C to stop");
    println!();
}
