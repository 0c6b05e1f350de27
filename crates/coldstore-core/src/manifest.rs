//! Upload intake: manifest files and the accepted-type filter.

use std::path::{Component, Path};

use serde::Deserialize;
use tracing::debug;

use crate::error::UploadError;

pub const MANIFEST_EXTENSION: &str = ".json";
pub const MANIFEST_MEDIA_TYPE: &str = "application/json";

/// A user-selected manifest, held in memory for one upload attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ManifestFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Header fields of a manifest, enough to tell the user what is about to be imported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub root_path: Option<String>,
    pub scan_date: Option<String>,
    pub total_files: Option<u64>,
}

#[derive(Deserialize)]
struct ManifestHeader {
    scan_info: Option<ScanInfo>,
    tree: Option<serde_json::Value>,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Deserialize)]
struct ScanInfo {
    #[serde(default)]
    root_path: Option<String>,
    #[serde(default)]
    scan_date: Option<String>,
}

#[derive(Deserialize)]
struct Statistics {
    #[serde(default)]
    total_files: Option<u64>,
}

impl ManifestFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Read a manifest from a local path. Paths containing `..` are refused.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(UploadError::ManifestRead(format!(
                "Invalid input: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| UploadError::ManifestRead(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("manifest.json")
            .to_string();
        Ok(Self::new(name, None, bytes))
    }

    /// Accepted when the name ends in `.json` or the declared media type is JSON.
    pub fn is_manifest(&self) -> bool {
        has_manifest_extension(&self.name)
            || self
                .media_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(MANIFEST_MEDIA_TYPE))
    }

    /// The name the backend derives the disk name from: the file name without `.json`.
    pub fn logical_name(&self) -> &str {
        if has_manifest_extension(&self.name) {
            &self.name[..self.name.len() - MANIFEST_EXTENSION.len()]
        } else {
            &self.name
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Parse the manifest header. Requires `scan_info` and `tree`.
    pub fn summary(&self) -> Result<ManifestSummary, UploadError> {
        let header: ManifestHeader = serde_json::from_slice(&self.bytes)
            .map_err(|e| UploadError::ManifestRead(format!("{}: {}", self.name, e)))?;
        let scan_info = header.scan_info.ok_or_else(|| {
            UploadError::ManifestRead(format!("{}: missing scan_info", self.name))
        })?;
        if header.tree.is_none() {
            return Err(UploadError::ManifestRead(format!(
                "{}: missing tree",
                self.name
            )));
        }
        Ok(ManifestSummary {
            root_path: scan_info.root_path,
            scan_date: scan_info.scan_date,
            total_files: header.statistics.and_then(|s| s.total_files),
        })
    }
}

fn has_manifest_extension(name: &str) -> bool {
    let split = name.len().saturating_sub(MANIFEST_EXTENSION.len());
    name.len() >= MANIFEST_EXTENSION.len()
        && name.is_char_boundary(split)
        && name[split..].eq_ignore_ascii_case(MANIFEST_EXTENSION)
}

/// Keep the manifest files of a selection.
///
/// A selection with no manifest in it is rejected as a whole.
pub fn accept_batch(files: Vec<ManifestFile>) -> Result<Vec<ManifestFile>, UploadError> {
    if files.is_empty() {
        return Err(UploadError::EmptySelection);
    }
    let offered = files.len();
    let (accepted, rejected): (Vec<_>, Vec<_>) = files.into_iter().partition(|f| f.is_manifest());
    for file in &rejected {
        debug!(file = %file.name, "Skipping non-manifest file");
    }
    if accepted.is_empty() {
        let names: Vec<&str> = rejected.iter().map(|f| f.name.as_str()).collect();
        return Err(UploadError::NotManifest(names.join(", ")));
    }
    debug!(offered, accepted = accepted.len(), "Selection filtered");
    Ok(accepted)
}
