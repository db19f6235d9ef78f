//! cca-ct (Contact) - Main entry point

use anyhow::{Context, Result};
use cca_common::api::{load_shared_secret, ApiAuthState};
use cca_common::config::{load_toml_config_or_default, RootFolderInitializer, RootFolderResolver};
use cca_common::db::init_database;
use cca_common::logging::init_tracing;
use cca_common::shutdown::shutdown_signal;
use cca_ct::{build_router, AppState, DEFAULT_PORT};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for cca-ct
#[derive(Parser, Debug)]
#[command(name = "cca-ct")]
#[command(about = "Contact microservice for Career Compass Assessment")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "CCA_CT_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "CCA_BIND")]
    bind: String,

    /// Root folder holding the database (overrides CCA_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_toml_config_or_default();
    init_tracing(&config.logging);

    info!(
        "Starting CCA Contact (cca-ct) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("contact")
        .with_cli_arg(args.root_folder)
        .with_toml(config.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let shared_secret = load_shared_secret(&pool)
        .await
        .context("Failed to load shared secret")?;
    if shared_secret == 0 {
        info!("API authentication disabled (shared_secret = 0)");
    }

    let app = build_router(AppState::new(pool, ApiAuthState::new(shared_secret)));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("cca-ct listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
