//! Progress channel: one server-push subscription per upload job.
//!
//! `Connecting → Open → Receiving* → Terminal`. Every message goes through
//! [`ProgressChannel::dispatch`]; once the channel is terminal, nothing else
//! is processed and the underlying stream has been dropped.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::PayloadStream;
use crate::error::{ErrorMetadata, UploadError};
use crate::models::{ImportResult, ProgressEvent};

/// What the user sees of the job in flight. Latest value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressView {
    /// Percent, shown as received (not clamped, not forced monotonic).
    pub progress: f64,
    pub status: String,
    pub details: String,
}

impl ProgressView {
    pub fn new(progress: f64, status: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            progress,
            status: status.into(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutSource {
    /// The server sent a `timeout` event.
    Server,
    /// The channel outlived its maximum lifetime.
    Client(Duration),
}

/// How a channel ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Complete(ImportResult),
    /// An `error` event, or the transport failing underneath the channel.
    Failed(UploadError),
    TimedOut(TimeoutSource),
    /// `finished` without a prior result.
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    Connecting,
    Open,
    Receiving,
    Terminal(Terminal),
}

/// Effect of one input on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Channel already closed, or the message could not be used.
    Ignored,
    /// Keep-alive: liveness confirmed, nothing visible changed.
    Alive,
    Updated,
    Closed,
}

pub struct ProgressChannel {
    task_id: String,
    state: ChannelState,
    view: ProgressView,
    updates: Option<watch::Sender<ProgressView>>,
}

impl ProgressChannel {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: ChannelState::Connecting,
            view: ProgressView::default(),
            updates: None,
        }
    }

    /// Publish every view change to `sender`.
    pub fn with_updates(mut self, sender: watch::Sender<ProgressView>) -> Self {
        self.updates = Some(sender);
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn view(&self) -> &ProgressView {
        &self.view
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ChannelState::Terminal(_))
    }

    /// The subscription is established.
    pub fn mark_open(&mut self) {
        if matches!(self.state, ChannelState::Connecting) {
            info!(task_id = %self.task_id, "Progress channel open");
            self.state = ChannelState::Open;
        }
    }

    /// Parse and apply one raw `data` payload.
    pub fn dispatch(&mut self, payload: &str) -> Dispatch {
        if self.is_closed() {
            debug!(task_id = %self.task_id, "Message after close ignored");
            return Dispatch::Ignored;
        }
        match ProgressEvent::parse(payload) {
            Ok(event) => self.apply(event),
            Err(err) => {
                warn!(task_id = %self.task_id, error = %err, "Unusable progress message");
                Dispatch::Ignored
            }
        }
    }

    pub fn apply(&mut self, event: ProgressEvent) -> Dispatch {
        if self.is_closed() {
            return Dispatch::Ignored;
        }
        match event {
            ProgressEvent::Connected | ProgressEvent::KeepAlive => {
                debug!(task_id = %self.task_id, "Progress channel alive");
                self.mark_open();
                Dispatch::Alive
            }
            ProgressEvent::Step {
                step,
                progress,
                message,
                details,
            } => {
                debug!(task_id = %self.task_id, %step, progress, "Progress update");
                self.state = ChannelState::Receiving;
                self.publish(ProgressView::new(
                    progress,
                    message.unwrap_or_else(|| "Uploading...".to_string()),
                    details.unwrap_or_default(),
                ));
                Dispatch::Updated
            }
            ProgressEvent::Complete { result, .. } => {
                info!(
                    task_id = %self.task_id,
                    files_imported = result.files_imported,
                    "Import complete"
                );
                self.publish(ProgressView::new(100.0, "Upload complete", result.summary()));
                self.close(Terminal::Complete(result))
            }
            ProgressEvent::Error { message } => {
                error!(task_id = %self.task_id, %message, "Import failed");
                self.publish(ProgressView::new(
                    self.view.progress,
                    "Upload failed",
                    message.clone(),
                ));
                self.close(Terminal::Failed(UploadError::Job(message)))
            }
            ProgressEvent::Finished => {
                info!(task_id = %self.task_id, "Server finished the stream");
                self.close(Terminal::Finished)
            }
            ProgressEvent::Timeout => {
                warn!(task_id = %self.task_id, "Server reported a timeout");
                self.close(Terminal::TimedOut(TimeoutSource::Server))
            }
        }
    }

    /// The connection itself failed.
    pub fn fail_transport(&mut self, err: UploadError) -> Dispatch {
        if self.is_closed() {
            return Dispatch::Ignored;
        }
        error!(task_id = %self.task_id, error = %err, "Progress stream failed");
        let err = match err {
            UploadError::Stream(_) | UploadError::Connectivity(_) => err,
            other => UploadError::Stream(other.to_string()),
        };
        self.publish(ProgressView::new(
            self.view.progress,
            "Upload failed",
            err.client_message(),
        ));
        self.close(Terminal::Failed(err))
    }

    /// The maximum lifetime ran out without a terminal event.
    pub fn expire(&mut self, lifetime: Duration) -> Dispatch {
        if self.is_closed() {
            return Dispatch::Ignored;
        }
        warn!(task_id = %self.task_id, ?lifetime, "Progress channel expired");
        self.close(Terminal::TimedOut(TimeoutSource::Client(lifetime)))
    }

    /// User cancellation. Only the local subscription is dropped.
    pub fn cancel(&mut self) -> Dispatch {
        if self.is_closed() {
            return Dispatch::Ignored;
        }
        info!(task_id = %self.task_id, "Upload cancelled by user");
        self.publish(ProgressView::new(0.0, "Upload cancelled", ""));
        self.close(Terminal::Cancelled)
    }

    fn close(&mut self, terminal: Terminal) -> Dispatch {
        self.state = ChannelState::Terminal(terminal);
        Dispatch::Closed
    }

    fn publish(&mut self, view: ProgressView) {
        self.view = view;
        if let Some(sender) = &self.updates {
            sender.send_replace(self.view.clone());
        }
    }

    /// Drive the channel to a terminal state.
    ///
    /// `connect` establishes the subscription. The lifetime deadline starts
    /// before connecting and cancellation is honored at every await point.
    /// The stream is dropped exactly once, when the loop ends.
    pub async fn run<C>(mut self, connect: C, lifetime: Duration, cancel: &CancellationToken) -> Terminal
    where
        C: Future<Output = Result<PayloadStream, UploadError>>,
    {
        let deadline = tokio::time::sleep(lifetime);
        tokio::pin!(deadline);

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.cancel();
                None
            }
            _ = &mut deadline => {
                self.expire(lifetime);
                None
            }
            result = connect => match result {
                Ok(stream) => Some(stream),
                Err(err) => {
                    self.fail_transport(err);
                    None
                }
            },
        };

        if let Some(mut stream) = connected {
            self.mark_open();
            while !self.is_closed() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.cancel();
                    }
                    _ = &mut deadline => {
                        self.expire(lifetime);
                    }
                    next = stream.next() => match next {
                        Some(Ok(payload)) => {
                            self.dispatch(&payload);
                        }
                        Some(Err(err)) => {
                            self.fail_transport(err);
                        }
                        None => {
                            self.fail_transport(UploadError::Stream(
                                "connection closed by server".to_string(),
                            ));
                        }
                    },
                }
            }
            drop(stream);
            debug!(task_id = %self.task_id, "Progress stream dropped");
        }

        match self.state {
            ChannelState::Terminal(terminal) => terminal,
            _ => Terminal::Failed(UploadError::Stream(
                "channel stopped without a terminal state".to_string(),
            )),
        }
    }
}
