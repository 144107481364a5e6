use scs_blob::file_base_name;
use scs_core::{CandidateFile, MissionError, MissionResult, ValidatedFile};
use serde_json::json;

use super::sniff::detect_content_type;

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_SNIFF_LEN: usize = 512;

const ALLOWED_PREFIXES: [&str; 2] = ["image/", "video/"];

/// Gate between the transport and the upload path: a file passes only if
/// it is within the size ceiling and its leading bytes sniff as an image or
/// a video.
#[derive(Debug, Clone, Copy)]
pub struct MediaValidator {
    max_bytes: u64,
    sniff_len: usize,
}

impl Default for MediaValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES, DEFAULT_SNIFF_LEN)
    }
}

impl MediaValidator {
    pub fn new(max_bytes: u64, sniff_len: usize) -> Self {
        Self {
            max_bytes,
            sniff_len,
        }
    }

    pub fn validate(&self, file: CandidateFile) -> MissionResult<ValidatedFile> {
        // Objects are keyed by the final path segment, so that is what must exist.
        if file_base_name(&file.name).is_empty() {
            return Err(MissionError::validation("file name is required")
                .with_operation("validate media")
                .with_details(json!({"file": file.name}))
                .into_anyhow());
        }

        let size = file.declared_size.max(file.content.len() as u64);
        if size > self.max_bytes {
            return Err(
                MissionError::validation(format!("file size exceeds {}", human_limit(self.max_bytes)))
                    .with_operation("validate media")
                    .with_details(json!({"file": file.name, "size": size, "max_bytes": self.max_bytes}))
                    .into_anyhow(),
            );
        }

        // The content is fully buffered, so sniffing leaves it readable from
        // the start for the upload.
        let mime_type = detect_content_type(&file.content, self.sniff_len);
        if !ALLOWED_PREFIXES.iter().any(|p| mime_type.starts_with(p)) {
            return Err(
                MissionError::validation("invalid file type: only image and video allowed")
                    .with_operation("validate media")
                    .with_details(json!({"file": file.name, "detected": mime_type}))
                    .into_anyhow(),
            );
        }

        tracing::debug!(file = %file.name, size, mime_type, "media accepted");
        Ok(ValidatedFile {
            name: file.name,
            size,
            mime_type: mime_type.to_string(),
            content: file.content,
        })
    }

    /// Validate every file; the first rejection fails the whole batch.
    pub fn validate_all(&self, files: Vec<CandidateFile>) -> MissionResult<Vec<ValidatedFile>> {
        files.into_iter().map(|f| self.validate(f)).collect()
    }
}

fn human_limit(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}
