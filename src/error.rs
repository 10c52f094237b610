/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - RepoError / validation error を統一的に変換
 * - 認可エラー (AuthError) も同じ body 形式を使う
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;

/// Wire format of every error response:
/// `{"success": false, "error": <status>, "message": <text>}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.error).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.status(), self.to_string()).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::unprocessable("a drink with this title already exists"),
            RepoError::Db(err) => {
                tracing::error!(error = %err, "drink store failure");
                AppError::Internal
            }
            RepoError::Corrupt(detail) => {
                tracing::error!(detail = %detail, "stored drink could not be decoded");
                AppError::Internal
            }
        }
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
