use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use cashcard_core::{PageError, StorageError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("caller lacks the required role")]
    NotAuthorized,

    /// Missing card or a card owned by someone else; callers cannot tell
    /// the two apart.
    #[error("cash card not found")]
    NotFound,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::EmptyOwner => ApiError::Validation(e.to_string()),
            other => ApiError::Storage(other),
        }
    }
}

impl From<PageError> for ApiError {
    fn from(e: PageError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotAuthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the request counter's `outcome` dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::NotAuthorized => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::Validation(_) => "invalid",
            ApiError::Storage(_) => "error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            success: false,
            error: message,
        });

        if let ApiError::Unauthenticated(_) = self {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"cashcards\"")],
                body,
            )
                .into_response();
        }
        (status, body).into_response()
    }
}
