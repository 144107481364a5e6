use axum::extract::multipart::{Field, Multipart, MultipartError};
use bytes::BytesMut;
use scs_core::{CandidateFile, MissionError};
use serde_json::json;

use crate::ApiError;

/// How an incident upload form is read off the wire.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Bytes buffered per file; anything past this is counted, not kept.
    pub max_file_size: usize,
    /// Body limit for the whole request.
    pub max_total_size: usize,
    pub file_field: String,
    pub incident_field: String,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_total_size: 64 * 1024 * 1024,
            file_field: "files".to_string(),
            incident_field: "incident_id".to_string(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }
}

/// Parsed `PUT /missions/update` form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub incident_id: Option<String>,
    pub files: Vec<CandidateFile>,
}

impl UploadForm {
    pub fn require_incident(&self) -> Result<&str, ApiError> {
        self.incident_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                MissionError::validation("incident_id is required")
                    .with_details(json!({"incident_id": ["required"]}))
                    .into()
            })
    }
}

fn map_multipart_error(err: MultipartError) -> ApiError {
    MissionError::validation("Failed to parse the multipart form")
        .with_details(json!({"_form": [err.body_text()]}))
        .into()
}

/// Collect the incident id and every file part. Unknown fields are skipped.
///
/// A file larger than `max_file_size` keeps only its first
/// `max_file_size + 1` bytes but reports its full length as the declared
/// size, so the media validator can reject it without the whole body
/// sitting in memory.
pub async fn read_upload_form(
    mut multipart: Multipart,
    config: &MultipartConfig,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == config.incident_field {
            form.incident_id = Some(field.text().await.map_err(map_multipart_error)?);
        } else if name == config.file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let file = read_file(field, file_name, config.max_file_size).await?;
            tracing::debug!(file = %file.name, size = file.declared_size, "received upload part");
            form.files.push(file);
        } else {
            tracing::debug!(field = %name, "ignoring unknown form field");
        }
    }

    Ok(form)
}

async fn read_file(
    mut field: Field<'_>,
    file_name: String,
    max_file_size: usize,
) -> Result<CandidateFile, ApiError> {
    let keep = max_file_size.saturating_add(1);
    let mut buffered = BytesMut::new();
    let mut total: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(map_multipart_error)? {
        total += chunk.len() as u64;
        if buffered.len() < keep {
            let room = keep - buffered.len();
            buffered.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }
    }

    Ok(CandidateFile::new(file_name, buffered.freeze()).with_declared_size(total))
}
