use serde::{Deserialize, Serialize};

/// The disk that already carries the name of a manifest being uploaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExistingDisk {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `POST /upload/check-duplicate`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DuplicateCheckResult {
    pub duplicate_found: bool,
    #[serde(default)]
    pub existing_disk: Option<ExistingDisk>,
}

/// `POST /upload/json-index-async`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AsyncUploadResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AsyncUploadResponse {
    /// The task handle, if the server returned a usable one.
    pub fn task_handle(&self) -> Option<&str> {
        self.task_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Outcome payload of a completed import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportResult {
    #[serde(default)]
    pub disk_id: Option<String>,
    #[serde(default)]
    pub disk_name: Option<String>,
    #[serde(default)]
    pub files_imported: u64,
    #[serde(default)]
    pub directories_created: u64,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub total_size_mb: Option<f64>,
}

impl ImportResult {
    /// One-line summary: files, directories and size.
    pub fn summary(&self) -> String {
        let size_mb = self
            .total_size_mb
            .or_else(|| self.total_size.map(|b| b as f64 / (1024.0 * 1024.0)));
        match size_mb {
            Some(mb) => format!(
                "{} files, {} directories, {:.1} MB",
                self.files_imported, self.directories_created, mb
            ),
            None => format!(
                "{} files, {} directories",
                self.files_imported, self.directories_created
            ),
        }
    }
}

/// One in-flight asynchronous import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub task_id: String,
    pub replace_existing: bool,
}

/// `GET /upload/status/{task_id}`: a point-in-time view of a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadStatusSnapshot {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub result: Option<ImportResult>,
    #[serde(default)]
    pub error: Option<String>,
}
