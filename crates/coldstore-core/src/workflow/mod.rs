//! Manifest upload workflow.
//!
//! Intake → duplicate resolution → submission → progress channel → result log,
//! strictly sequential for each file. The backend is reached only through
//! [`UploadBackend`]; the user is reached only through [`DuplicateResolver`].

mod channel;
mod duplicate;
mod orchestrator;
mod results;

pub use channel::{ChannelState, Dispatch, ProgressChannel, ProgressView, Terminal, TimeoutSource};
pub use duplicate::{resolve_duplicates, Resolution};
pub use orchestrator::{AttemptOutcome, UploadWorkflow};
pub use results::{ResultLog, UploadResult, UploadStatus};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::UploadError;
use crate::manifest::ManifestFile;
use crate::models::{AsyncUploadResponse, DuplicateCheckResult, ExistingDisk};

/// Raw `data` payloads of the progress stream, or the transport error that ended it.
pub type PayloadStream = BoxStream<'static, Result<String, UploadError>>;

/// The three backend calls the workflow suspends on.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Ask whether a disk with the manifest's name already exists.
    async fn check_duplicate(&self, file: &ManifestFile)
        -> Result<DuplicateCheckResult, UploadError>;

    /// Submit the manifest for asynchronous import.
    async fn start_import(
        &self,
        file: &ManifestFile,
        replace_existing: bool,
    ) -> Result<AsyncUploadResponse, UploadError>;

    /// Subscribe to the progress stream of a job.
    async fn progress_stream(&self, task_id: &str) -> Result<PayloadStream, UploadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    Replace,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailureDecision {
    /// Treat as "no duplicate known" and upload.
    Proceed,
    Abandon,
}

/// The user's side of the duplicate decision point.
pub trait DuplicateResolver: Send {
    fn resolve_duplicate(
        &mut self,
        file: &ManifestFile,
        existing: Option<&ExistingDisk>,
    ) -> DuplicateDecision;

    fn resolve_check_failure(
        &mut self,
        file: &ManifestFile,
        error: &UploadError,
    ) -> CheckFailureDecision;
}

/// Answers every decision the same way, without prompting.
#[derive(Debug, Clone, Copy)]
pub struct FixedResolver {
    pub on_duplicate: DuplicateDecision,
    pub on_check_failure: CheckFailureDecision,
}

impl FixedResolver {
    pub fn new(on_duplicate: DuplicateDecision, on_check_failure: CheckFailureDecision) -> Self {
        Self {
            on_duplicate,
            on_check_failure,
        }
    }
}

impl DuplicateResolver for FixedResolver {
    fn resolve_duplicate(&mut self, _: &ManifestFile, _: Option<&ExistingDisk>) -> DuplicateDecision {
        self.on_duplicate
    }

    fn resolve_check_failure(&mut self, _: &ManifestFile, _: &UploadError) -> CheckFailureDecision {
        self.on_check_failure
    }
}

#[cfg(test)]
pub(crate) mod testing;
