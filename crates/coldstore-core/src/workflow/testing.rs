//! Mock backend and resolver for workflow unit tests
//!
//! The mock answers from a script and records every call it receives.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::{Arc, Mutex};

use super::{
    CheckFailureDecision, DuplicateDecision, DuplicateResolver, PayloadStream, UploadBackend,
};
use crate::error::UploadError;
use crate::manifest::ManifestFile;
use crate::models::{AsyncUploadResponse, DuplicateCheckResult, ExistingDisk};

pub fn manifest(name: &str) -> ManifestFile {
    ManifestFile::new(name, None, br#"{"scan_info": {}, "tree": {}}"#.to_vec())
}

pub fn no_duplicate() -> Result<DuplicateCheckResult, UploadError> {
    Ok(DuplicateCheckResult {
        duplicate_found: false,
        existing_disk: None,
    })
}

pub fn duplicate_of(name: &str) -> Result<DuplicateCheckResult, UploadError> {
    Ok(DuplicateCheckResult {
        duplicate_found: true,
        existing_disk: Some(ExistingDisk {
            name: name.to_string(),
            created_at: Some("2024-03-01 10:00:00".to_string()),
        }),
    })
}

pub fn task(id: &str) -> Result<AsyncUploadResponse, UploadError> {
    Ok(AsyncUploadResponse {
        task_id: Some(id.to_string()),
        success: Some(true),
        message: None,
    })
}

/// Script for one mock backend.
#[derive(Clone)]
pub struct MockBackend {
    duplicate: Result<DuplicateCheckResult, UploadError>,
    start: Result<AsyncUploadResponse, UploadError>,
    events: Vec<Result<String, UploadError>>,
    /// Refuse the subscription itself.
    subscribe: Option<UploadError>,
    hold_open: bool,
    pub checks: Arc<Mutex<Vec<String>>>,
    pub submissions: Arc<Mutex<Vec<(String, bool)>>>,
    pub subscriptions: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            duplicate: no_duplicate(),
            start: task("abc"),
            events: Vec::new(),
            subscribe: None,
            hold_open: false,
            checks: Arc::new(Mutex::new(Vec::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_duplicate(mut self, result: Result<DuplicateCheckResult, UploadError>) -> Self {
        self.duplicate = result;
        self
    }

    pub fn with_start(mut self, result: Result<AsyncUploadResponse, UploadError>) -> Self {
        self.start = result;
        self
    }

    pub fn with_events(mut self, events: &[&str]) -> Self {
        self.events = events.iter().map(|e| Ok(e.to_string())).collect();
        self
    }

    pub fn with_stream_error(mut self, error: UploadError) -> Self {
        self.events.push(Err(error));
        self
    }

    pub fn with_subscribe_error(mut self, error: UploadError) -> Self {
        self.subscribe = Some(error);
        self
    }

    /// Keep the stream open after the scripted events instead of ending it.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn check_duplicate(
        &self,
        file: &ManifestFile,
    ) -> Result<DuplicateCheckResult, UploadError> {
        self.checks.lock().unwrap().push(file.name.clone());
        self.duplicate.clone()
    }

    async fn start_import(
        &self,
        file: &ManifestFile,
        replace_existing: bool,
    ) -> Result<AsyncUploadResponse, UploadError> {
        self.submissions
            .lock()
            .unwrap()
            .push((file.name.clone(), replace_existing));
        self.start.clone()
    }

    async fn progress_stream(&self, task_id: &str) -> Result<PayloadStream, UploadError> {
        self.subscriptions.lock().unwrap().push(task_id.to_string());
        if let Some(error) = &self.subscribe {
            return Err(error.clone());
        }
        let scripted = futures::stream::iter(self.events.clone());
        if self.hold_open {
            Ok(scripted.chain(futures::stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }
}

/// Resolver that answers from fixed decisions and counts how often it was asked.
pub struct CountingResolver {
    pub on_duplicate: DuplicateDecision,
    pub on_check_failure: CheckFailureDecision,
    pub duplicate_prompts: usize,
    pub failure_prompts: usize,
}

impl CountingResolver {
    pub fn new(on_duplicate: DuplicateDecision, on_check_failure: CheckFailureDecision) -> Self {
        Self {
            on_duplicate,
            on_check_failure,
            duplicate_prompts: 0,
            failure_prompts: 0,
        }
    }
}

impl DuplicateResolver for CountingResolver {
    fn resolve_duplicate(
        &mut self,
        _: &ManifestFile,
        _: Option<&ExistingDisk>,
    ) -> DuplicateDecision {
        self.duplicate_prompts += 1;
        self.on_duplicate
    }

    fn resolve_check_failure(&mut self, _: &ManifestFile, _: &UploadError) -> CheckFailureDecision {
        self.failure_prompts += 1;
        self.on_check_failure
    }
}
