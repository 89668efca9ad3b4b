mod app;
mod handlers;
mod question_payload;
mod render;
mod session_cookie;
mod state;

use anyhow::{Context, Result};
use pdf_chat::Config;
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("Fatal: {:#}", e);
        eprintln!("Failed to start PDF chat server: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(&config)?);
    let app = app::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
