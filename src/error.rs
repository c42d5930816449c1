use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed LLM output: {0}")]
    MalformedOutput(String),

    #[error("Error generating questions and feedback: {0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Rate limits, server-side failures and dropped connections are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            Error::Reqwest(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            err @ Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
            Error::Llm(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::MalformedOutput(msg) => (StatusCode::BAD_GATEWAY, msg),
            err @ Error::Generation(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
