//! [`UploadBackend`] over HTTP.

use async_trait::async_trait;
use coldstore_core::models::{AsyncUploadResponse, DuplicateCheckResult};
use coldstore_core::{ManifestFile, PayloadStream, UploadBackend, UploadError};

use crate::{ApiClient, ApiStatusError};

/// Map a failed call onto the workflow's error categories.
///
/// Non-2xx responses keep their status; requests that never reached the
/// server are connectivity failures; anything else lands in the stage's
/// own category.
fn classify(err: anyhow::Error, stage: fn(String) -> UploadError) -> UploadError {
    if let Some(status) = err.downcast_ref::<ApiStatusError>() {
        return UploadError::Api {
            status: status.status,
            message: status.message.clone(),
        };
    }
    let unreachable = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_connect() || e.is_timeout());
    if unreachable {
        return UploadError::Connectivity(format!("{:#}", err));
    }
    stage(format!("{:#}", err))
}

#[async_trait]
impl UploadBackend for ApiClient {
    async fn check_duplicate(
        &self,
        file: &ManifestFile,
    ) -> Result<DuplicateCheckResult, UploadError> {
        ApiClient::check_duplicate(self, file)
            .await
            .map_err(|e| classify(e, UploadError::DuplicateCheck))
    }

    async fn start_import(
        &self,
        file: &ManifestFile,
        replace_existing: bool,
    ) -> Result<AsyncUploadResponse, UploadError> {
        ApiClient::start_import(self, file, replace_existing)
            .await
            .map_err(|e| classify(e, UploadError::Submission))
    }

    async fn progress_stream(&self, task_id: &str) -> Result<PayloadStream, UploadError> {
        ApiClient::progress_stream(self, task_id)
            .await
            .map_err(|e| classify(e, UploadError::Stream))
    }
}
