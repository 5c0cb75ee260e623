//! HTTP surface: a health probe and the turn endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::chat::{handle_turn, ChatReply, ChatRequest};
use crate::config::BotConfig;
use crate::database::MemoryStore;
use crate::llm_client::Generate;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<MemoryStore>,
    pub llm: Arc<dyn Generate>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn serve(config: BotConfig, store: Arc<MemoryStore>, llm: Arc<dyn Generate>) -> Result<()> {
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = Arc::new(ServerState { store, llm });

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind chat server to {}", bind_addr))?;
    tracing::info!("Stan Pal backend listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .await
        .context("Chat server failed")?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, String)> {
    handle_turn(
        state.store.as_ref(),
        state.llm.as_ref(),
        &body.user_id,
        &body.message,
    )
    .await
    .map(Json)
    .map_err(internal_error)
}

fn internal_error(error: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}
