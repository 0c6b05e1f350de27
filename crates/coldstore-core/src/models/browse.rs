use serde::{Deserialize, Serialize};

/// One entry of a directory listing, tagged by the backend's `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BrowseItem {
    Folder {
        filename: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        file_count: Option<u64>,
        #[serde(default)]
        subdirectory_count: Option<u64>,
    },
    File {
        filename: String,
        #[serde(default)]
        file_size: Option<u64>,
        #[serde(default)]
        file_type: Option<String>,
        #[serde(default)]
        modified_date: Option<String>,
        #[serde(default)]
        client: Option<String>,
        #[serde(default)]
        project: Option<String>,
    },
}

impl BrowseItem {
    pub fn filename(&self) -> &str {
        match self {
            BrowseItem::Folder { filename, .. } | BrowseItem::File { filename, .. } => filename,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, BrowseItem::Folder { .. })
    }
}

/// `GET /disks/{id}/browse?path=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowseResponse {
    #[serde(default)]
    pub items: Vec<BrowseItem>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub directory_count: u64,
    #[serde(default)]
    pub file_count: u64,
}
