use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    MetaApi(String),
    QueueError(String),
    RedisError(String),
    SocketError(String),
    LockTimeout(String),
    ConfigError(String),
    JsonError(serde_json::Error),
    HttpError(reqwest::Error),
    ValidationError(String),
    // Empresa/conexão inexistente ou removida; respondido como 400 ao provider
    NotFound(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MetaApi(msg) => write!(f, "Meta Graph API error: {}", msg),
            AppError::QueueError(msg) => write!(f, "Queue error: {}", msg),
            AppError::RedisError(msg) => write!(f, "Redis error: {}", msg),
            AppError::SocketError(msg) => write!(f, "Socket error: {}", msg),
            AppError::LockTimeout(msg) => write!(f, "Lock timeout: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::JsonError(err) => write!(f, "JSON error: {}", err),
            AppError::HttpError(err) => write!(f, "HTTP error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err)
    }
}

impl From<meta_graph::MetaError> for AppError {
    fn from(err: meta_graph::MetaError) -> Self {
        AppError::MetaApi(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MetaApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::QueueError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::RedisError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::SocketError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LockTimeout(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::JsonError(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::HttpError(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = json!({
            "error": error_message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Falha "best effort" de uma etapa do pipeline de ingestão.
///
/// Etapas pós-resolução (publicação na fila, buffer, download de mídia, push
/// em tempo real, fan-out) devolvem este erro em vez de propagar: o
/// orquestrador loga e segue adiante, o provider recebe sucesso mesmo assim.
#[derive(Debug, Clone)]
pub struct DegradedError {
    pub stage: &'static str,
    pub detail: String,
}

impl DegradedError {
    pub fn new(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DegradedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "degraded stage '{}': {}", self.stage, self.detail)
    }
}

impl std::error::Error for DegradedError {}

pub type DegradedResult<T> = Result<T, DegradedError>;
