// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// One typed taxonomy for the whole service. Callers branch on variants,
/// never on message strings.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Auth,
    #[error("signature verification failed: {0}")]
    Verification(String),
    #[error("not found")]
    NotFound,
    #[error("insufficient credits")]
    InsufficientFunds,
    #[error("completion provider quota exhausted")]
    UpstreamExhausted,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Verification(_) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::UpstreamExhausted | AppError::Http(_) | AppError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::InsufficientFunds => json!({
                "error": self.to_string(),
                "needs_recharge": true,
            }),
            AppError::UpstreamExhausted => json!({
                "error": self.to_string(),
                "provider_exhausted": true,
            }),
            // Internal detail stays in the logs.
            AppError::Db(_) | AppError::Internal(_) => {
                log::error!("internal error: {self}");
                json!({ "error": "internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub type AppResult<T> = Result<T, AppError>;
