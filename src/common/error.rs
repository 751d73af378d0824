use core::fmt;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ServerError {
    NotFound(String),
    Validation(String),
    Capacity(String),
    InvalidMessage(String),
    Database(sqlx::Error),
    Serialization(serde_json::Error),
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::NotFound(msg) => write!(f, "{}", msg),
            ServerError::Validation(msg) => write!(f, "{}", msg),
            ServerError::Capacity(msg) => write!(f, "{}", msg),
            ServerError::InvalidMessage(msg) => write!(f, "{}", msg),
            ServerError::Database(e) => write!(f, "database error: {}", e),
            ServerError::Serialization(e) => write!(f, "serialization error: {}", e),
            ServerError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(e: sqlx::Error) -> Self {
        ServerError::Database(e)
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Serialization(e)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Validation(msg) | ServerError::Capacity(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ServerError::InvalidMessage(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Database(e) => {
                error!("database failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ServerError::Serialization(e) => {
                error!("serialization failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ServerError::Internal(msg) => {
                error!("internal failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
