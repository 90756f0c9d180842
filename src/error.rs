use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use crate::crypto::{CryptoError, DecryptionFailed};

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("not found")]
    NotFound,
    #[error("decryption failed: wrong password or corrupted data, please try again")]
    DecryptionFailed,
    #[error("database error")]
    Persistence { source: sqlx::Error },
    #[error("migration error")]
    Migration {
        #[from]
        source: sqlx::migrate::MigrateError,
    },
    #[error("crypto error")]
    Crypto {
        #[from]
        source: CryptoError,
    },
    #[error("background task failed")]
    Task {
        #[from]
        source: JoinError,
    },
}

/// A rejected form submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("missing title")]
    MissingTitle,
    #[error("title is longer than {max} characters")]
    TitleTooLong { max: usize },
    #[error("missing content")]
    MissingContent,
    #[error("a password is required to encrypt a paste")]
    MissingPassword,
    #[error("expiration must be a positive number of hours")]
    InvalidExpiration,
    #[error("expiration may not exceed {max} hours")]
    ExpirationTooLong { max: u32 },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DecryptionFailed => StatusCode::FORBIDDEN,
            AppError::Persistence { .. }
            | AppError::Migration { .. }
            | AppError::Crypto { .. }
            | AppError::Task { .. } => {
                error!(error = ?self, "request failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
            }
        };

        (status_code, format!("{self}")).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => AppError::NotFound,
            _ => AppError::Persistence { source },
        }
    }
}

impl From<DecryptionFailed> for AppError {
    fn from(_: DecryptionFailed) -> Self {
        AppError::DecryptionFailed
    }
}
