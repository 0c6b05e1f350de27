use serde::Serialize;

use crate::error::{ErrorMetadata, UploadError};
use crate::models::ImportResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Terminal record for one submitted file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub file: String,
    pub status: UploadStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ImportResult>,
}

/// Append-only log of upload outcomes for the current submission.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResultLog {
    entries: Vec<UploadResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, file: &str, result: &ImportResult) {
        let disk = result
            .disk_name
            .as_deref()
            .or(result.disk_id.as_deref())
            .unwrap_or(file);
        self.entries.push(UploadResult {
            file: file.to_string(),
            status: UploadStatus::Success,
            message: format!("Imported successfully: {}", disk),
            details: Some(result.summary()),
            data: Some(result.clone()),
        });
    }

    pub fn record_error(&mut self, file: &str, error: &UploadError) {
        let details = error.to_string();
        let message = error.client_message();
        self.entries.push(UploadResult {
            file: file.to_string(),
            status: UploadStatus::Error,
            details: (details != message).then_some(details),
            message,
            data: None,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[UploadResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: UploadStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}
