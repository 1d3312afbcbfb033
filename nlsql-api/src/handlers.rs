use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", service: "nlsql-agent" })
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<nlsql_session::Thread> for ThreadResponse {
    fn from(t: nlsql_session::Thread) -> Self {
        Self { id: t.id, name: t.name, created_at: t.created_at }
    }
}

pub async fn list_threads(State(state): State<Arc<ApiState>>) -> Json<Vec<ThreadResponse>> {
    let threads = state.session_store.list_threads().await;
    Json(threads.into_iter().map(ThreadResponse::from).collect())
}

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn create_thread(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateThreadRequest>,
) -> Json<ThreadResponse> {
    let name = req.name.unwrap_or_else(|| "untitled".to_string());
    let thread = state.session_store.create_thread(name).await;
    Json(ThreadResponse::from(thread))
}

pub async fn get_thread(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ThreadResponse>, StatusCode> {
    let thread = state.session_store.get_thread(id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(ThreadResponse::from(thread)))
}

pub async fn get_messages(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<nlsql_session::Message>>, StatusCode> {
    let messages = state.session_store.get_messages(id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub user_message: nlsql_session::Message,
    pub server_message: nlsql_session::Message,
}

#[axum::debug_handler]
pub async fn post_message(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, StatusCode> {
    if state.session_store.get_thread(id).await.is_err() {
        return Err(StatusCode::NOT_FOUND);
    }

    let outcome = state.orchestrator.handle_turn(id, &req.content).await.map_err(|e| {
        tracing::error!(error = %e, "orchestrator turn failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    tracing::debug!(?outcome, thread_id = %id, "turn completed");

    let messages = state.session_store.get_messages(id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut iter = messages.into_iter().rev();
    let server_message = iter.next().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let user_message = iter.next().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(PostMessageResponse { user_message, server_message }))
}

#[derive(Debug, Serialize)]
pub struct TokenUsageResponse {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub calls: u64,
}

pub async fn get_tokens(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TokenUsageResponse>, StatusCode> {
    let usage = state.session_store.get_token_usage(id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(TokenUsageResponse {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage.total_tokens,
        calls: usage.call_count,
    }))
}

#[derive(Debug, Serialize)]
pub struct UsedDatabasesResponse {
    pub databases: Vec<String>,
}

pub async fn get_databases(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsedDatabasesResponse>, StatusCode> {
    let databases = state.session_store.get_used_databases(id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(UsedDatabasesResponse { databases }))
}

pub async fn list_data_sources(
    State(state): State<Arc<ApiState>>,
) -> Json<Vec<nlsql_core::types::DataSourceSummary>> {
    Json(state.datasources.list_sources().to_vec())
}
