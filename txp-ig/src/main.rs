//! txp-ig - Transmission Portal Ingest Gateway
//!
//! Accepts contact submissions, persists media privately, resolves the
//! sender's location from network and device signals, computes the trust
//! consistency score, and writes the durable record.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use txp_ig::config::GatewayConfig;
use txp_ig::AppState;

#[derive(Parser, Debug)]
#[command(name = "txp-ig", version, about = "Transmission Portal ingest gateway")]
struct Args {
    /// Root folder for the database and stored media
    #[arg(long, env = "TXP_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting txp-ig (Ingest Gateway)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve and create the root folder
    let root_folder = txp_common::config::resolve_root_folder(args.root_folder.as_deref());
    txp_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", root_folder.display());

    // Shared TOML config (missing file is fine)
    let toml_config = txp_common::config::load_toml_config().unwrap_or_default();
    let config = GatewayConfig::resolve(&toml_config);

    // Open or create the database
    let db_path = root_folder.join("txp.db");
    info!("Database: {}", db_path.display());
    let db_pool = txp_ig::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Application state and router
    let state = AppState::from_config(db_pool, &root_folder, &config)?;
    let app = txp_ig::build_router(state);

    // Serve with connect-info so the direct peer address is available as
    // the last network-origin fallback
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Listening on http://{}", config.bind_address());
    info!("Health check: http://{}/health", config.bind_address());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
