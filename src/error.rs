use accounts::AccountError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{debug, error};

use crate::schemas::ErrorResponse;

/// Failures that escape a handler and become a JSON error body.
///
/// Recoverable account errors (bad form input, wrong credentials) are
/// rendered back into the page by the handlers and never reach this type
/// unless a handler has no form to re-render.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Account(e) => match e {
                AccountError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
                AccountError::InvalidImage(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_IMAGE"),
                AccountError::PasswordTooLong(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
                AccountError::AuthenticationFailure => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED"),
                AccountError::UserNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
                AccountError::StorageWrite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_WRITE_ERROR"),
                AccountError::Hashing(_) | AccountError::Task(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
                AccountError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR"),
            AppError::Multipart(e) => (e.status(), "BAD_UPLOAD"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal details stay in the log.
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            debug!("Request rejected: {}", self);
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_hide_details() {
        let response = AppError::Database(DbErr::Custom("secret table name".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn account_errors_map_to_statuses() {
        let cases = [
            (AccountError::AuthenticationFailure, StatusCode::UNAUTHORIZED),
            (AccountError::UserNotFound(7), StatusCode::NOT_FOUND),
            (
                AccountError::InvalidImage("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
