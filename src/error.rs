use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::converter::ConversionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Only PDF files are allowed")]
    InvalidInput,

    #[error("Missing multipart field: {0}")]
    MissingField(String),

    #[error("Invalid multipart request: {0}")]
    BadRequest(String),

    #[error("File too large: maximum {0} MB")]
    FileTooLarge(u64),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        AppError::ConversionFailed(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ConversionFailed(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput => StatusCode::BAD_REQUEST,
            AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ConversionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "detail": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
