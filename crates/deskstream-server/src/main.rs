mod api;
mod config;

use std::sync::Arc;

use api::chat::{ask_question, delete_chat_log, get_history};
use api::state::AppState;
use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use config::ServerConfig;
use deskstream_ai::{BailianClient, StreamEngine};
use deskstream_storage::Storage;
use tower_http::cors::CorsLayer;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health {
        status: "deskstream is working!".to_string(),
    })
}

#[tokio::main]
async fn main() {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deskstream_server=debug".into()),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting deskstream server");

    let config = ServerConfig::load().expect("Failed to load server configuration");
    if config.app.api_key.is_empty() || config.app.app_id.is_empty() {
        tracing::warn!("Vendor credentials are not configured; /api/ask will fail");
    }

    let storage =
        Arc::new(Storage::new(&config.database_path).expect("Failed to open database"));

    let mut client = BailianClient::new(&config.app.api_key, &config.app.app_id);
    if let Some(base_url) = &config.app.base_url {
        client = client.with_base_url(base_url);
    }
    let engine = StreamEngine::new(Arc::new(client));

    let state = AppState { engine, storage };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(ask_question))
        .route("/api/history", get(get_history))
        .route("/api/history/{id}", delete(delete_chat_log))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    tracing::info!("deskstream running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
