use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ragchat_rag::{ChatRequest, ChatResponse, ConversationalRag, RagError, Stage};
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Message returned by `GET /`.
pub const WELCOME_MESSAGE: &str = "欢迎使用 RAG 问答机器人 API，请向 POST /chat 发送问题。";

#[derive(Clone)]
pub struct AppState {
    pub rag: Arc<ConversationalRag>,
}

impl AppState {
    pub fn new(rag: Arc<ConversationalRag>) -> Self {
        Self { rag }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("ragchat listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({"message": WELCOME_MESSAGE}))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"ragchat"}))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "rejected chat request body");
        ApiError::bad_request(rejection.body_text())
    })?;

    let response = state.rag.chat(&request).await?;
    Ok(Json(response))
}

// ── Error responses ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// A failed request rendered as `{"error": ..., "stage": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody { error: message.into(), stage: None },
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RagError::RetrievalError(_) | RagError::GenerationError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(%status, stage = ?err.stage(), error = %err, "chat request failed");
        }
        Self { status, body: ErrorBody { error: err.to_string(), stage: err.stage() } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_and_stage() {
        let err = ApiError::from(RagError::GenerationError {
            stage: Stage::Rewrite,
            message: "timeout".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.body.stage, Some(Stage::Rewrite));

        let err = ApiError::from(RagError::InvalidRequest("empty".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.stage, None);

        let err = ApiError::from(RagError::ConfigError("bad".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_omits_missing_stage() {
        let body = serde_json::to_value(ErrorBody { error: "x".into(), stage: None }).unwrap();
        assert_eq!(body, json!({"error": "x"}));

        let body =
            serde_json::to_value(ErrorBody { error: "x".into(), stage: Some(Stage::Retrieve) }).unwrap();
        assert_eq!(body, json!({"error": "x", "stage": "retrieve"}));
    }
}
