use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::channel::{ProgressChannel, ProgressView, Terminal, TimeoutSource};
use super::duplicate::{resolve_duplicates, Resolution};
use super::results::ResultLog;
use super::{DuplicateResolver, UploadBackend};
use crate::config::WorkflowConfig;
use crate::error::UploadError;
use crate::manifest::{accept_batch, ManifestFile};
use crate::models::{ImportResult, UploadJob};

/// How one file's attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Imported(ImportResult),
    Failed(UploadError),
    /// A duplicate exists and the user chose not to replace it.
    DuplicateCancelled,
    /// The duplicate check failed and the user chose not to upload.
    Abandoned,
    /// User cancellation; voided, not recorded.
    Cancelled,
}

/// Owns the selection, the job in flight and the result log.
///
/// `upload` takes `&mut self`, so a workflow can never run two jobs at once.
pub struct UploadWorkflow<B> {
    backend: B,
    config: WorkflowConfig,
    pending: Vec<ManifestFile>,
    results: ResultLog,
    current_job: Option<UploadJob>,
    view: watch::Sender<ProgressView>,
}

impl<B: UploadBackend> UploadWorkflow<B> {
    pub fn new(backend: B, config: WorkflowConfig) -> Self {
        let (view, _) = watch::channel(ProgressView::default());
        Self {
            backend,
            config,
            pending: Vec::new(),
            results: ResultLog::new(),
            current_job: None,
            view,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Receive every progress view change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.view.subscribe()
    }

    pub fn progress(&self) -> ProgressView {
        self.view.borrow().clone()
    }

    pub fn pending(&self) -> &[ManifestFile] {
        &self.pending
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn current_job(&self) -> Option<&UploadJob> {
        self.current_job.as_ref()
    }

    /// Replace the selection with the manifests among `files`.
    ///
    /// On rejection the previous selection is kept.
    pub fn select(&mut self, files: Vec<ManifestFile>) -> Result<usize, UploadError> {
        let accepted = accept_batch(files)?;
        info!(count = accepted.len(), "Manifests selected");
        self.pending = accepted;
        Ok(self.pending.len())
    }

    /// Upload every selected file, one full pipeline at a time.
    ///
    /// Imported and declined files leave the selection; failed and cancelled
    /// ones stay so the user can retry. Once `cancel` fires, remaining files
    /// are not started.
    pub async fn upload<R>(
        &mut self,
        resolver: &mut R,
        cancel: &CancellationToken,
    ) -> Vec<(String, AttemptOutcome)>
    where
        R: DuplicateResolver + ?Sized,
    {
        let files = std::mem::take(&mut self.pending);
        if files.is_empty() {
            return Vec::new();
        }
        self.results.clear();

        let mut outcomes = Vec::with_capacity(files.len());
        let mut remaining = Vec::new();
        for file in files {
            if cancel.is_cancelled() {
                remaining.push(file);
                continue;
            }
            let outcome = self.attempt(&file, resolver, cancel).await;
            match &outcome {
                AttemptOutcome::Failed(_) | AttemptOutcome::Cancelled => remaining.push(file.clone()),
                AttemptOutcome::Imported(_)
                | AttemptOutcome::DuplicateCancelled
                | AttemptOutcome::Abandoned => {}
            }
            outcomes.push((file.name, outcome));
        }
        self.pending = remaining;
        outcomes
    }

    async fn attempt<R>(
        &mut self,
        file: &ManifestFile,
        resolver: &mut R,
        cancel: &CancellationToken,
    ) -> AttemptOutcome
    where
        R: DuplicateResolver + ?Sized,
    {
        let resolution = tokio::select! {
            biased;
            _ = cancel.cancelled() => return AttemptOutcome::Cancelled,
            resolution = resolve_duplicates(&self.backend, resolver, file) => resolution,
        };
        match resolution {
            Resolution::Proceed { replace_existing } => {
                self.start_upload(file, replace_existing, cancel).await
            }
            Resolution::Cancelled => AttemptOutcome::DuplicateCancelled,
            Resolution::Abandoned => AttemptOutcome::Abandoned,
        }
    }

    async fn start_upload(
        &mut self,
        file: &ManifestFile,
        replace_existing: bool,
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        info!(file = %file.name, replace_existing, "Starting upload");
        self.view
            .send_replace(ProgressView::new(0.0, "Starting upload...", ""));

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            response = self.backend.start_import(file, replace_existing) => Some(response),
        };
        let response = match submitted {
            None => {
                warn!(file = %file.name, "Upload cancelled before the job started");
                self.view
                    .send_replace(ProgressView::new(0.0, "Upload cancelled", ""));
                return AttemptOutcome::Cancelled;
            }
            Some(Ok(response)) => response,
            Some(Err(err)) => return self.fail(file, err),
        };
        let Some(task_id) = response.task_handle().map(str::to_string) else {
            return self.fail(file, UploadError::MissingTaskHandle);
        };

        info!(file = %file.name, %task_id, "Upload accepted");
        self.current_job = Some(UploadJob {
            task_id: task_id.clone(),
            replace_existing,
        });

        let channel = ProgressChannel::new(task_id.as_str()).with_updates(self.view.clone());
        let terminal = channel
            .run(
                self.backend.progress_stream(&task_id),
                self.config.progress_timeout,
                cancel,
            )
            .await;
        self.current_job = None;

        match terminal {
            Terminal::Complete(result) => {
                self.results.record_success(&file.name, &result);
                self.schedule_reset(cancel);
                AttemptOutcome::Imported(result)
            }
            Terminal::Failed(err) => self.record_failure(file, err),
            Terminal::Finished => self.record_failure(
                file,
                UploadError::Indeterminate("the server closed the progress stream".to_string()),
            ),
            Terminal::TimedOut(TimeoutSource::Server) => self.record_failure(
                file,
                UploadError::Indeterminate("the server reported a timeout".to_string()),
            ),
            Terminal::TimedOut(TimeoutSource::Client(lifetime)) => {
                self.record_failure(file, UploadError::ChannelTimeout(lifetime))
            }
            Terminal::Cancelled => AttemptOutcome::Cancelled,
        }
    }

    /// Clear the completed view after `clear_delay` without holding up the
    /// next file. A view replaced in the meantime is left alone; cancellation
    /// clears at once.
    fn schedule_reset(&self, cancel: &CancellationToken) {
        let delay = self.config.clear_delay;
        if delay.is_zero() {
            self.view.send_replace(ProgressView::default());
            return;
        }
        let shown = self.view.borrow().clone();
        let view = self.view.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
            view.send_if_modified(|current| {
                if *current == shown {
                    *current = ProgressView::default();
                    true
                } else {
                    false
                }
            });
        });
    }

    /// Failure before a channel existed: record it and clear the progress indicator.
    fn fail(&mut self, file: &ManifestFile, err: UploadError) -> AttemptOutcome {
        error!(file = %file.name, error = %err, "Upload could not be started");
        self.view
            .send_replace(ProgressView::new(0.0, "Upload failed", err.to_string()));
        self.record_failure(file, err)
    }

    fn record_failure(&mut self, file: &ManifestFile, err: UploadError) -> AttemptOutcome {
        self.results.record_error(&file.name, &err);
        AttemptOutcome::Failed(err)
    }
}
