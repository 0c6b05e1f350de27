//! Error types module
//!
//! Every failure the upload workflow can hit is a variant of [`UploadError`].
//! Failures are caught at the stage where they occur and turned into a
//! user-visible message; nothing here is fatal to the caller.

use std::io;
use std::time::Duration;

/// Message shown for every connectivity failure, whatever the underlying cause.
pub const CONNECTIVITY_MESSAGE: &str = "Cannot reach the file index service";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and voided attempts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "CONNECTIVITY_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-triggering the same action may succeed
    fn is_recoverable(&self) -> bool;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Not a manifest file: {0}")]
    NotManifest(String),

    #[error("No files selected")]
    EmptySelection,

    #[error("Could not read manifest: {0}")]
    ManifestRead(String),

    #[error("Duplicate check failed: {0}")]
    DuplicateCheck(String),

    #[error("Upload submission failed: {0}")]
    Submission(String),

    #[error("The server returned no task id")]
    MissingTaskHandle,

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Progress stream failed: {0}")]
    Stream(String),

    #[error("Invalid progress event: {0}")]
    InvalidEvent(String),

    #[error("Import failed: {0}")]
    Job(String),

    #[error("No result received within {0:?}")]
    ChannelTimeout(Duration),

    #[error("Import ended without a result: {0}")]
    Indeterminate(String),
}

impl UploadError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, UploadError::Connectivity(_))
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::ManifestRead(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::InvalidEvent(err.to_string())
    }
}

/// Error code, recoverability and log level for each variant.
fn error_metadata(err: &UploadError) -> (&'static str, bool, LogLevel) {
    match err {
        UploadError::Connectivity(_) => ("CONNECTIVITY_ERROR", true, LogLevel::Error),
        UploadError::NotManifest(_) => ("NOT_MANIFEST", false, LogLevel::Debug),
        UploadError::EmptySelection => ("EMPTY_SELECTION", false, LogLevel::Debug),
        UploadError::ManifestRead(_) => ("MANIFEST_READ_ERROR", false, LogLevel::Warn),
        UploadError::DuplicateCheck(_) => ("DUPLICATE_CHECK_FAILED", true, LogLevel::Warn),
        UploadError::Submission(_) => ("SUBMISSION_FAILED", true, LogLevel::Error),
        UploadError::MissingTaskHandle => ("MISSING_TASK_HANDLE", true, LogLevel::Error),
        UploadError::Api { status, .. } if *status >= 500 => {
            ("API_ERROR", true, LogLevel::Error)
        }
        UploadError::Api { .. } => ("API_ERROR", false, LogLevel::Warn),
        UploadError::Stream(_) => ("STREAM_ERROR", true, LogLevel::Error),
        UploadError::InvalidEvent(_) => ("INVALID_EVENT", true, LogLevel::Warn),
        UploadError::Job(_) => ("IMPORT_FAILED", true, LogLevel::Error),
        UploadError::ChannelTimeout(_) => ("CHANNEL_TIMEOUT", true, LogLevel::Warn),
        UploadError::Indeterminate(_) => ("INDETERMINATE", true, LogLevel::Warn),
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        error_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        error_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Connectivity(_) => CONNECTIVITY_MESSAGE.to_string(),
            UploadError::NotManifest(_) => {
                "Only JSON manifest files are accepted. Please select another file.".to_string()
            }
            UploadError::Job(message) => message.clone(),
            UploadError::Stream(_) => {
                format!("{} (progress stream interrupted)", CONNECTIVITY_MESSAGE)
            }
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        error_metadata(self).2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_share_one_message() {
        let a = UploadError::Connectivity("connection refused".into());
        let b = UploadError::Connectivity("dns failure".into());
        assert_eq!(a.client_message(), b.client_message());
        assert_eq!(a.client_message(), CONNECTIVITY_MESSAGE);
        assert!(a.is_connectivity());
    }

    #[test]
    fn job_error_shows_server_message_verbatim() {
        let err = UploadError::Job("Invalid JSON structure".into());
        assert_eq!(err.client_message(), "Invalid JSON structure");
        assert_eq!(err.error_code(), "IMPORT_FAILED");
    }

    #[test]
    fn validation_errors_log_at_debug() {
        assert_eq!(UploadError::EmptySelection.log_level(), LogLevel::Debug);
        assert_eq!(
            UploadError::NotManifest("a.txt".into()).log_level(),
            LogLevel::Debug
        );
    }

    #[test]
    fn api_errors_split_on_server_side_status() {
        let server = UploadError::Api {
            status: 503,
            message: "down".into(),
        };
        let client = UploadError::Api {
            status: 404,
            message: "missing".into(),
        };
        assert!(server.is_recoverable());
        assert!(!client.is_recoverable());
        assert_eq!(server.log_level(), LogLevel::Error);
    }
}
