//! Axum route handler for document generation.

use std::path::{Path, PathBuf};

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};

use crate::document::{ApplicationPayload, ApplicationRecord, PhotoAttachment, XLSX_CONTENT_TYPE};
use crate::errors::AppError;
use crate::state::AppState;

/// Extensions tried, in order, when a photo is looked up by application code.
const PHOTO_EXTENSIONS: [&str; 2] = ["jpg", "png"];

// ────────────────────────────────────────────────────────────────────────────
// Photo resolution
// ────────────────────────────────────────────────────────────────────────────

/// What the request asked for, validated before any blocking work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PhotoRequest {
    None,
    File { name: String, hint: Option<String> },
    ByCode { code: String, hint: Option<String> },
}

impl PhotoRequest {
    fn from_payload(payload: &ApplicationPayload, code: Option<&str>) -> Result<Self, AppError> {
        let hint = payload
            .image_extension
            .as_deref()
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(str::to_string);

        if let Some(name) = payload
            .photo_file
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            if !is_bare_file_name(name) {
                return Err(AppError::Validation(
                    "photoFile must be a plain file name".to_string(),
                ));
            }
            return Ok(PhotoRequest::File {
                name: name.to_string(),
                hint,
            });
        }

        Ok(match code {
            Some(code) => PhotoRequest::ByCode {
                code: code.to_string(),
                hint,
            },
            None => PhotoRequest::None,
        })
    }

    /// Finds the photo inside `photo_dir`. Without a configured directory
    /// there is never a photo.
    fn locate(self, photo_dir: Option<&Path>) -> Option<PhotoAttachment> {
        let dir = photo_dir?;
        match self {
            PhotoRequest::None => None,
            PhotoRequest::File { name, hint } => Some(PhotoAttachment {
                path: dir.join(name),
                format_hint: hint,
            }),
            PhotoRequest::ByCode { code, hint } => PHOTO_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{code}.{ext}")))
                .find(|path| path.is_file())
                .map(|path| PhotoAttachment {
                    path,
                    format_hint: hint,
                }),
        }
    }
}

fn is_bare_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && !name.contains("..") && name != "."
}

/// Upper-cased application code reduced to characters safe in a file name
/// and a header value. `None` when nothing usable is left.
fn download_code(code: Option<&str>) -> Option<String> {
    let code: String = code?
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect::<String>()
        .to_ascii_uppercase();
    (!code.is_empty()).then_some(code)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate-excel
///
/// Builds the application workbook for the posted record and returns it as a
/// download named `MARRIAGE_APPLICATION_{CODE}.xlsx` (`DRAFT` without a code).
pub async fn handle_generate_excel(
    State(state): State<AppState>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<Response, AppError> {
    let code = download_code(payload.application_code.as_deref());
    let photo = PhotoRequest::from_payload(&payload, code.as_deref())?;
    let mut record = ApplicationRecord::from(payload);

    let compositor = state.compositor.clone();
    let photo_dir: Option<PathBuf> = state.config.photo_dir.clone();

    // Template parsing and zip compression are CPU-bound.
    let buffer = tokio::task::spawn_blocking(move || {
        record.photo = photo.locate(photo_dir.as_deref());
        debug!(photo = ?record.photo, "resolved photo");
        compositor.generate(&record)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in generation: {e}")))??;

    let filename = format!(
        "MARRIAGE_APPLICATION_{}.xlsx",
        code.as_deref().unwrap_or("DRAFT")
    );
    info!(filename = %filename, bytes = buffer.len(), "serving application document");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        buffer.into_bytes(),
    )
        .into_response())
}
