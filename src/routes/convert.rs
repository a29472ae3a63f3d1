//! Conversion endpoint

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use crate::config::{body_limit_bytes, formats};
use crate::error::{AppError, Result};
use crate::services::ConversionService;
use crate::utils::content_disposition;

/// Nome del campo multipart che contiene il PDF
pub const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct ConvertState {
    pub service: ConversionService,
    pub max_file_size_mb: u64,
}

/// Corpo multipart accettato da `/convert`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ConvertUpload {
    /// Documento PDF (il nome deve terminare con `.pdf`)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

pub fn router(state: ConvertState) -> Router {
    let body_limit = body_limit_bytes(state.max_file_size_mb);
    Router::new()
        .route("/convert", post(convert_pdf_to_word))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Converti un PDF in documento Word
#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = ConvertUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Documento convertito",
            content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 400, description = "Il file non e' un PDF", body = crate::models::ErrorResponse),
        (status = 413, description = "File troppo grande", body = crate::models::ErrorResponse),
        (status = 500, description = "Conversione fallita", body = crate::models::ErrorResponse),
    ),
    tag = "Conversione"
)]
pub async fn convert_pdf_to_word(
    State(state): State<ConvertState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let max_mb = state.max_file_size_mb;
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    // Cerca il campo "file", ignorando gli altri
    let field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| field_error(e, max_mb))?
        {
            Some(field) if field.name() == Some(UPLOAD_FIELD) => break field,
            Some(_) => continue,
            None => return Err(AppError::MissingField(UPLOAD_FIELD.to_string())),
        }
    };

    let filename = field.file_name().unwrap_or_default().to_string();
    let upload = field.map(move |chunk| chunk.map_err(|e| chunk_error(e, max_mb)));

    let result = state.service.convert(&filename, upload).await;
    // Rilascia il body della richiesta prima di rispondere
    drop(multipart);
    let doc = result?;

    let file = state.service.open_output(&doc).await?;
    let content_length = file.metadata().await?.len();

    tracing::info!(
        "Invio documento {} ({} byte, upload {} byte) come {}",
        doc.token,
        content_length,
        doc.upload_size,
        doc.download_name
    );

    Ok((
        [
            (header::CONTENT_TYPE, formats::DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&doc.download_name),
            ),
            (header::CONTENT_LENGTH, content_length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    ))
}

/// Errore durante la lettura delle intestazioni multipart
fn field_error(err: MultipartError, max_file_size_mb: u64) -> AppError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::FileTooLarge(max_file_size_mb),
        _ => AppError::BadRequest(err.body_text()),
    }
}

/// Errore durante il salvataggio del contenuto: fa fallire il job
fn chunk_error(err: MultipartError, max_file_size_mb: u64) -> AppError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::FileTooLarge(max_file_size_mb),
        _ => AppError::ConversionFailed(err.body_text()),
    }
}
