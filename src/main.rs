mod config;
mod db;
mod http;
mod prompt;
mod provider;

use std::sync::Arc;

use config::Config;
use db::Database;
use provider::{ChatModel, GroqProvider};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    tracing::info!("Medical Advisor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Model: {}", config.groq_model);

    let db = Database::open(&config.database_path).expect("Failed to open database");

    let model: Arc<dyn ChatModel> =
        Arc::new(GroqProvider::new(config.groq_api_key.clone(), config.groq_model.clone()));

    let state = Arc::new(http::AppState { db, model });
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router).await.expect("Server error");
}
