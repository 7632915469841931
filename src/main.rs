use anyhow::Result;
use axum::Router;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    mail_client::MailClient,
    mailbox_store::{JsonFileBackend, MailboxStore},
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        host = %cfg.host,
        port = cfg.port,
        data_file = %cfg.data_file,
        mail_api_base = %cfg.mail_api_base,
        "Starting mailbox-pool"
    );

    // --- Ensure snapshot directory exists ---
    let data_path = PathBuf::from(&cfg.data_file);
    let data_dir = data_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory at {}", data_dir.display());
    }

    // --- Initialize core services ---
    let backend = JsonFileBackend::new(&data_path, cfg.strict_snapshot);
    let store = MailboxStore::new(Arc::new(backend));
    let mail = MailClient::new(
        cfg.mail_api_base.clone(),
        cfg.mail_api_token.clone(),
        cfg.mail_api_cookie.clone(),
        cfg.sender_keyword.clone(),
    )?;

    let state = AppState {
        store,
        mail,
        data_dir,
    };

    // --- Build router ---
    // The consuming single-page UI is served from a different origin.
    let app: Router = routes::routes::routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
