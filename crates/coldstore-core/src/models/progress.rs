use serde::{Deserialize, Serialize};

use super::ImportResult;
use crate::error::UploadError;

/// A progress message exactly as it arrives on the stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProgressMessage {
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

/// A parsed progress channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Connected,
    /// `heartbeat` / `waiting`: liveness only.
    KeepAlive,
    Step {
        step: String,
        progress: f64,
        message: Option<String>,
        details: Option<String>,
    },
    Complete {
        result: ImportResult,
        message: Option<String>,
    },
    Error {
        message: String,
    },
    Finished,
    Timeout,
}

impl ProgressEvent {
    /// Parse one `data` payload. The tag is `step`, falling back to `status`.
    pub fn parse(payload: &str) -> Result<Self, UploadError> {
        let raw: RawProgressMessage = serde_json::from_str(payload)?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawProgressMessage) -> Result<Self, UploadError> {
        let tag = raw
            .step
            .clone()
            .or_else(|| raw.status.clone())
            .map(|t| t.trim().to_lowercase());

        match tag.as_deref() {
            Some("connected") => Ok(ProgressEvent::Connected),
            Some("heartbeat") | Some("waiting") => Ok(ProgressEvent::KeepAlive),
            Some("complete") | Some("completed") => match raw.result {
                Some(result) => Ok(ProgressEvent::Complete {
                    result,
                    message: raw.message,
                }),
                None => Err(UploadError::InvalidEvent(
                    "completion event without result".to_string(),
                )),
            },
            Some("error") | Some("failed") => Ok(ProgressEvent::Error {
                message: raw
                    .message
                    .or(raw.error)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Import failed".to_string()),
            }),
            Some("finished") => Ok(ProgressEvent::Finished),
            Some("timeout") => Ok(ProgressEvent::Timeout),
            other => match raw.progress {
                Some(progress) if progress.is_finite() => Ok(ProgressEvent::Step {
                    step: other.unwrap_or("progress").to_string(),
                    progress,
                    message: raw.message,
                    details: raw.details,
                }),
                _ => Err(UploadError::InvalidEvent(format!(
                    "unrecognized event {:?} without numeric progress",
                    other.unwrap_or("<untagged>")
                ))),
            },
        }
    }

    /// Whether this event ends the channel.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. }
                | ProgressEvent::Error { .. }
                | ProgressEvent::Finished
                | ProgressEvent::Timeout
        )
    }
}
