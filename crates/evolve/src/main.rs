//! evolve - AI-assisted website editor.
//!
//! Serves the editor UI and API by default. The remaining subcommands work
//! directly on the configured site directory without starting a server.

use clap::{Parser, Subcommand};
use evolve_server::{AppState, ServerConfig};
use evolve_site::{ManagedFiles, Site};
use evolve_util::log::{LogConfig, LogLevel};
use std::net::{Ipv4Addr, SocketAddr};
use tracing::info;

#[derive(Parser)]
#[command(name = "evolve")]
#[command(author, version, about = "AI-assisted website editor", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (defaults to 0.0.0.0:$PORT)
        #[arg(long)]
        address: Option<SocketAddr>,
    },

    /// List snapshot versions, newest first
    History,

    /// Publish pending previews, snapshotting the live files first
    Publish,

    /// Restore the live files from a snapshot
    Rollback {
        /// Snapshot version to restore
        version: String,
    },

    /// Delete all pending previews
    Discard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    evolve_util::log::init(LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        ..Default::default()
    });

    let config = ServerConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Serve { address: None }) {
        Commands::Serve { address } => {
            let address =
                address.unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port)));
            run_server(address, &config).await
        }
        Commands::History => {
            let site = open_site(&config).await?;
            let versions = site.history().await?;
            if versions.is_empty() {
                println!("No snapshots yet.");
            }
            for version in versions {
                let snapshot = site.snapshot(&version.to_string()).await?;
                println!(
                    "{}  {}  {}",
                    snapshot.id,
                    snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    snapshot.files.join(", ")
                );
            }
            Ok(())
        }
        Commands::Publish => {
            let site = open_site(&config).await?;
            let outcome = site.publish().await?;
            if outcome.promoted.is_empty() {
                println!("Published {} (no pending previews)", outcome.version);
            } else {
                println!(
                    "Published {}: {}",
                    outcome.version,
                    outcome.promoted.join(", ")
                );
            }
            Ok(())
        }
        Commands::Rollback { version } => {
            let site = open_site(&config).await?;
            let snapshot = site.rollback(version.trim()).await?;
            println!(
                "Restored {}: {}",
                snapshot.id,
                snapshot.files.join(", ")
            );
            Ok(())
        }
        Commands::Discard => {
            let site = open_site(&config).await?;
            let discarded = site.discard().await?;
            if discarded.is_empty() {
                println!("Nothing to discard.");
            } else {
                println!("Discarded: {}", discarded.join(", "));
            }
            Ok(())
        }
    }
}

/// Open the configured site for offline commands.
async fn open_site(config: &ServerConfig) -> anyhow::Result<Site> {
    Ok(Site::open(
        config.site_dir.clone(),
        config.history_dir.clone(),
        ManagedFiles::default(),
    )
    .await?)
}

/// Run the HTTP server.
async fn run_server(address: SocketAddr, config: &ServerConfig) -> anyhow::Result<()> {
    info!("Starting evolve server on {}", address);
    info!(site_dir = %config.site_dir.display(), "Serving site");

    let state = AppState::from_config(config).await?;
    let app = evolve_server::create_router(state);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
