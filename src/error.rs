use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;
use serde_json::Value;

use thiserror::Error;

use crate::crypto::TokenError;

pub type Result<T> = std::result::Result<T, Error>;

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum Error {
    // Request errors
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("File exceeds the {0} byte upload limit")]
    PayloadTooLarge(usize),
    // Token errors
    #[error("Failed to sign token")]
    TokenSigning(TokenError),
    // Email client errors
    #[error("Failed to send email")]
    SendEmail(#[source] reqwest::Error),
    // Database errors
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// A validation failure without per-field details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }
    /// A validation failure carrying every reason it was rejected
    pub fn validation_with(message: impl Into<String>, reasons: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(Value::from(reasons)),
        }
    }

    fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(e)) => e.code().as_deref() == Some(UNIQUE_VIOLATION),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Other(e.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.is_unique_violation() => StatusCode::CONFLICT,
            Self::TokenSigning(_) | Self::SendEmail(_) | Self::Database(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            Self::Validation { message, details } => ErrorBody {
                error: "Validation Error",
                message: Some(message.clone()),
                details: details.as_ref(),
            },
            _ if self.is_unique_violation() => ErrorBody {
                error: "Resource already exists",
                message: None,
                details: None,
            },
            _ if status.is_server_error() => {
                tracing::error!(error.cause_chain = ?self, "Request failed: {}", self);
                ErrorBody {
                    error: "Internal Server Error",
                    message: None,
                    details: None,
                }
            }
            other => {
                let message = other.to_string();
                return HttpResponse::build(status).json(serde_json::json!({ "error": message }));
            }
        };

        HttpResponse::build(status).json(body)
    }
}
