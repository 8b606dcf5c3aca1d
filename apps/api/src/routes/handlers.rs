//! Axum route handlers — the thin presentation wrapper over the pipeline
//! core and the audit listing surface.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::document::{text_to_docx, DocumentFormat, DOCX_MIME};
use crate::errors::AppError;
use crate::models::transaction::{TransactionRow, TransactionSummary};
use crate::pipeline::{self, PipelineResult, Submission};
use crate::rewrite::CoverLetterLength;
use crate::state::AppState;
use crate::store::{decode_original, TransactionLog, MAX_LIST_LIMIT};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// POST /api/v1/optimize
///
/// Multipart upload: `file` (PDF or DOCX), `jd_text`, optional
/// `cover_letter_length` (short|standard|long). Runs the full pipeline and
/// returns the result bundle, including whether the transaction was logged.
pub async fn handle_optimize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut jd_text = String::new();
    let mut cover_letter_length = CoverLetterLength::Standard;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("resume").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
                file = Some((filename, bytes));
            }
            Some("jd_text") => {
                jd_text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read jd_text: {e}")))?;
            }
            Some("cover_letter_length") => {
                let raw = field.text().await.unwrap_or_default();
                cover_letter_length = CoverLetterLength::parse(&raw);
            }
            _ => {}
        }
    }

    let (filename, file_bytes) =
        file.ok_or_else(|| AppError::Validation("a resume file is required".to_string()))?;
    if jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    let format = DocumentFormat::from_filename(&filename).ok_or_else(|| {
        AppError::Validation(format!(
            "unsupported file type for '{filename}' — upload a .pdf or .docx"
        ))
    })?;

    let submission = Submission {
        file_bytes,
        format,
        filename,
        jd_text,
        cover_letter_length,
    };

    let result = pipeline::run(
        state.decoder.as_ref(),
        state.scorer.as_ref(),
        state.rewriter.as_ref(),
        &*state.store,
        submission,
    )
    .await?;

    Ok(Json(result))
}

/// GET /api/v1/transactions?limit=N
///
/// Audit listing, newest first. An unavailable store yields an empty list.
pub async fn handle_list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<TransactionSummary>> {
    let limit = params.limit.unwrap_or(MAX_LIST_LIMIT);
    Json(state.store.list_recent(limit).await)
}

/// GET /api/v1/transactions/:id
///
/// Full transaction record (minus the raw file blob).
pub async fn handle_get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionRow>, AppError> {
    let row = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {id} not found")))?;

    Ok(Json(row))
}

/// GET /api/v1/transactions/:id/download/:artifact
///
/// `artifact` is one of `resume`, `cover-letter`, `original`. Generated
/// artifacts are re-encoded as DOCX; the original upload is returned
/// byte-identical to what was submitted.
pub async fn handle_download(
    State(state): State<AppState>,
    Path((id, artifact)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let row = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {id} not found")))?;

    match artifact.as_str() {
        "resume" => {
            let bytes = text_to_docx(&row.optimized_resume_text)
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            Ok(attachment(bytes, DOCX_MIME, "Optimized_Resume.docx"))
        }
        "cover-letter" => {
            let bytes = text_to_docx(&row.cover_letter_text)
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            Ok(attachment(bytes, DOCX_MIME, "Cover_Letter.docx"))
        }
        "original" => {
            let bytes = decode_original(&row.original_file_b64).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("stored file blob is corrupt: {e}"))
            })?;
            let mime = DocumentFormat::from_filename(&row.original_filename)
                .map(DocumentFormat::mime)
                .unwrap_or("application/octet-stream");
            Ok(attachment(bytes, mime, &row.original_filename))
        }
        other => Err(AppError::NotFound(format!(
            "unknown artifact '{other}' — expected resume, cover-letter, or original"
        ))),
    }
}

fn attachment(bytes: Vec<u8>, content_type: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", sanitize_filename(filename)),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Reduces an uploaded filename to characters safe inside a quoted
/// Content-Disposition value. Quotes, control characters, and non-ASCII
/// would make the header an invalid `HeaderValue`.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_passes_ordinary_names() {
        assert_eq!(sanitize_filename("My Resume (v2).pdf"), "My Resume (v2).pdf");
        assert_eq!(sanitize_filename("resume_2024-08.docx"), "resume_2024-08.docx");
    }

    #[test]
    fn test_sanitize_filename_strips_header_breaking_chars() {
        assert_eq!(
            sanitize_filename("re\"sume\r\n.pdf"),
            "re_sume__.pdf"
        );
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn test_sanitize_filename_never_empty() {
        assert_eq!(sanitize_filename(""), "download");
        assert_eq!(sanitize_filename("   "), "download");
        assert_eq!(sanitize_filename("\"\""), "__");
    }
}
