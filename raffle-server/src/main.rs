//! Raffle Server
//!
//! Draws winners region by region, district by district, and streams each
//! draw's progress over WebSocket.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

#[cfg(test)]
mod tests;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use raffle_core::config::DrawConfig;
use raffle_core::store::PgDrawStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DB_MAX_CONNECTIONS: u32 = 10;

/// Raffle - hierarchical winner draw server
#[derive(Parser, Debug)]
#[command(name = "raffle-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./raffle-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "raffle-server starting");

    let loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = loader.load().inspect_err(|e| {
        tracing::error!(path = %args.config.display(), error = %e, "cannot load configuration");
    })?;
    let listen_addr = loaded.server.listen;
    log_draw_settings(&loaded.draw);

    let pool = connect_database(args.migrate).await?;
    let store = Arc::new(PgDrawStore::new(pool.clone()));
    let state = AppState::new(store, loaded.into_shared()).await;

    let reload_stop = spawn_config_reload_handler(state.clone(), loader);
    let result = run_server(build_router(state), listen_addr).await;
    reload_stop.notify_one();

    pool.close().await;
    tracing::info!("raffle-server stopped");
    result.map_err(Into::into)
}

/// Open the pool and, with `--migrate`, bring the schema up to date.
async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let url = get_database_url().inspect_err(|_| {
        tracing::error!("DATABASE_URL is not set");
    })?;
    let pool = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect(&url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "cannot connect to database"))?;
    tracing::info!(max_connections = DB_MAX_CONNECTIONS, "database pool ready");

    if migrate {
        raffle_core::MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "migrations failed"))?;
        tracing::info!("migrations applied");
    }
    Ok(pool)
}

fn log_draw_settings(draw: &DrawConfig) {
    tracing::info!(
        store = "postgres",
        default_exclude_previous_winners = draw.default_exclude_previous_winners,
        progress_buffer = draw.progress_buffer,
        announcement_buffer = draw.announcement_buffer,
        "draw settings"
    );
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
