use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use braver::api::{AppState, create_router};
use braver::config::CONFIG;

#[derive(Parser)]
#[command(name = "braver")]
#[command(about = "Braver Explorer demo search backend", long_about = None)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Directory with the front end's static files (overrides STATIC_DIR)
    #[arg(long)]
    static_dir: Option<String>,

    /// Start without the Aries AI engine
    #[arg(long)]
    no_ai: bool,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(true)
        .init();

    let mut config = CONFIG.clone();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.static_dir {
        config.static_dir = dir;
    }
    if cli.no_ai {
        config.aries_ai_enabled = false;
    }

    let state = Arc::new(AppState::from_config(&config).await?);
    let database_status = state.database_status();
    let ai_active = state.engine.is_some();
    let app = create_router(state, &config.static_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    log::info!("Braver Explorer listening on http://localhost:{}", config.port);
    log::info!("database: {database_status}");
    log::info!("Aries AI: {}", if ai_active { "active" } else { "disabled" });

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}
