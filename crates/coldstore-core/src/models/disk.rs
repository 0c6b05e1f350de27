use serde::{Deserialize, Serialize};

use super::FileRecord;

/// One imported disk as listed by `GET /disks` and `GET /disks/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskSummary {
    pub disk_id: String,
    #[serde(default)]
    pub disk_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub file_count: Option<u64>,
    #[serde(default)]
    pub actual_file_count: Option<u64>,
    #[serde(default)]
    pub actual_total_size: Option<u64>,
    #[serde(default)]
    pub scan_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub size_formatted: Option<String>,
    #[serde(default)]
    pub image_count: Option<u64>,
    #[serde(default)]
    pub video_count: Option<u64>,
    #[serde(default)]
    pub audio_count: Option<u64>,
    #[serde(default)]
    pub document_count: Option<u64>,
}

impl DiskSummary {
    /// Name to show for the disk: its name if set, otherwise its id.
    pub fn display_name(&self) -> &str {
        self.disk_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.disk_id)
    }

    /// File count measured from the index, falling back to the scan statistics.
    pub fn effective_file_count(&self) -> u64 {
        self.actual_file_count.or(self.file_count).unwrap_or(0)
    }

    /// Total size measured from the index, falling back to the scan statistics.
    pub fn effective_total_size(&self) -> u64 {
        self.actual_total_size.or(self.total_size).unwrap_or(0)
    }
}

/// Page of `GET /disks/{id}/files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskFilesPage {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}
