use serde::{Deserialize, Deserializer, Serialize};

/// Aggregates come from SQL `SUM`/`COUNT`; `SUM` over no rows is `null`.
fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// `GET /stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_disks: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_files: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_size: u64,
    #[serde(default)]
    pub size_formatted: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_images: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_videos: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_audio: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_documents: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_archives: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_clients: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_projects: u64,
}

/// `GET /health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
}
