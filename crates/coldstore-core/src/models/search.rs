use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: u32 = 50;

/// An indexed file as returned by search and the disk file listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub filename: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub disk_id: Option<String>,
    #[serde(default)]
    pub disk_name: Option<String>,
}

/// Parameters of `GET /search`. Empty filters are not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub page: u32,
    pub per_page: u32,
    pub client: Option<String>,
    pub project: Option<String>,
    pub file_type: Option<String>,
    pub disk_id: Option<String>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            client: None,
            project: None,
            file_type: None,
            disk_id: None,
        }
    }

    /// Query string pairs in the order the backend documents them.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        let filters = [
            ("client", &self.client),
            ("project", &self.project),
            ("file_type", &self.file_type),
            ("disk_id", &self.disk_id),
        ];
        for (key, value) in filters {
            if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                pairs.push((key, v.clone()));
            }
        }
        pairs
    }
}

/// `GET /search` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}
