//! Cold Storage core library
//!
//! Domain models for the file index API, error types, client configuration,
//! and the manifest upload workflow shared by the API client and the CLI.

pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod workflow;

// Re-export commonly used types
pub use config::{ApiLocation, ClientConfig, Environment, WorkflowConfig};
pub use error::{ErrorMetadata, LogLevel, UploadError, CONNECTIVITY_MESSAGE};
pub use manifest::{accept_batch, ManifestFile, ManifestSummary};
pub use workflow::{
    AttemptOutcome, CheckFailureDecision, DuplicateDecision, DuplicateResolver, FixedResolver,
    PayloadStream, ProgressView, ResultLog, UploadBackend, UploadResult, UploadStatus,
    UploadWorkflow,
};
