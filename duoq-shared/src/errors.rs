use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile errors
/// - E3xxx: Matching errors
/// - E4xxx: Messaging errors
/// - E5xxx: Payment errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,

    // Profiles (E2xxx)
    ProfileNotFound,
    UsernameTaken,
    InvalidUsername,

    // Matching (E3xxx)
    DuplicateSwipe,
    MatchNotFound,
    CannotSwipeSelf,

    // Messaging (E4xxx)
    EmptyMessage,

    // Payments (E5xxx)
    PaymentProviderError,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::RefreshTokenRevoked => "E1005",
            Self::PasswordTooWeak => "E1006",

            // Profiles
            Self::ProfileNotFound => "E2001",
            Self::UsernameTaken => "E2002",
            Self::InvalidUsername => "E2003",

            // Matching
            Self::DuplicateSwipe => "E3001",
            Self::MatchNotFound => "E3002",
            Self::CannotSwipeSelf => "E3003",

            // Messaging
            Self::EmptyMessage => "E4001",

            // Payments
            Self::PaymentProviderError => "E5001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::InvalidUsername | Self::EmptyMessage => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::MatchNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::CannotSwipeSelf => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::UsernameTaken | Self::DuplicateSwipe => {
                StatusCode::CONFLICT
            }
            Self::PaymentProviderError => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ErrorCode::DuplicateSwipe.code(), "E3001");
        assert_eq!(ErrorCode::MatchNotFound.code(), "E3002");
        assert_eq!(ErrorCode::EmptyMessage.code(), "E4001");
        assert_eq!(ErrorCode::PaymentProviderError.code(), "E5001");
    }

    #[test]
    fn duplicate_swipe_is_a_conflict() {
        assert_eq!(ErrorCode::DuplicateSwipe.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_and_foreign_matches_share_a_status() {
        // non-participants must not be able to distinguish "absent" from "not yours"
        assert_eq!(ErrorCode::MatchNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn provider_failures_map_to_server_errors() {
        assert!(ErrorCode::PaymentProviderError.status_code().is_server_error());
        assert!(ErrorCode::InternalError.status_code().is_server_error());
    }
}
