//! Domain methods for the Cold Storage API client.
//!
//! Response types come from `coldstore_core::models`. Path segments taken
//! from user input (disk ids, disk names, task ids) are percent-encoded.

use crate::{sse, ApiClient};
use anyhow::{Context, Result};
use coldstore_core::models::{
    AsyncUploadResponse, BrowseResponse, DiskFilesPage, DiskSummary, DuplicateCheckResult,
    HealthStatus, SearchQuery, SearchResponse, SystemStats, UploadStatusSnapshot,
};
use coldstore_core::manifest::MANIFEST_MEDIA_TYPE;
use coldstore_core::{ManifestFile, PayloadStream};
use reqwest::multipart::{Form, Part};
use tracing::info;

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Multipart body carrying one manifest under the `file` field.
pub(crate) fn manifest_form(file: &ManifestFile) -> Result<Form> {
    let mime = file.media_type.as_deref().unwrap_or(MANIFEST_MEDIA_TYPE);
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(mime)
        .or_else(|_| {
            Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(MANIFEST_MEDIA_TYPE)
        })
        .context("Failed to build multipart body")?;
    Ok(Form::new().part("file", part))
}

impl ApiClient {
    /// All indexed disks.
    pub async fn list_disks(&self) -> Result<Vec<DiskSummary>> {
        self.get("/disks", &[]).await
    }

    pub async fn get_disk(&self, disk_id: &str) -> Result<DiskSummary> {
        self.get(&format!("/disks/{}", segment(disk_id)), &[]).await
    }

    /// Delete a disk and everything indexed under it. Addressed by name.
    pub async fn delete_disk(&self, name: &str) -> Result<()> {
        self.delete(&format!("/disks/{}", segment(name))).await?;
        info!(disk = name, "Disk deleted");
        Ok(())
    }

    /// One page of a disk's files, optionally limited to a path prefix.
    pub async fn list_disk_files(
        &self,
        disk_id: &str,
        path: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<DiskFilesPage> {
        let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(p) = path.filter(|p| !p.is_empty()) {
            query.push(("path", p.to_string()));
        }
        self.get(&format!("/disks/{}/files", segment(disk_id)), &query)
            .await
    }

    /// Contents of one directory. `None` or an empty path is the disk root.
    pub async fn browse(&self, disk_id: &str, path: Option<&str>) -> Result<BrowseResponse> {
        let query: Vec<(&str, String)> = path
            .filter(|p| !p.is_empty())
            .map(|p| vec![("path", p.to_string())])
            .unwrap_or_default();
        self.get(&format!("/disks/{}/browse", segment(disk_id)), &query)
            .await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.get("/search", &query.to_query_pairs()).await
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        self.get("/stats", &[]).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("/health", &[]).await
    }

    /// Ask whether a disk named after this manifest already exists.
    pub async fn check_duplicate(&self, file: &ManifestFile) -> Result<DuplicateCheckResult> {
        let form = manifest_form(file)?;
        self.post_multipart("/upload/check-duplicate", form).await
    }

    /// Submit a manifest for asynchronous import.
    ///
    /// `replace_existing=true` is sent only when replacing; the field is
    /// omitted otherwise.
    pub async fn start_import(
        &self,
        file: &ManifestFile,
        replace_existing: bool,
    ) -> Result<AsyncUploadResponse> {
        let mut form = manifest_form(file)?;
        if replace_existing {
            form = form.text("replace_existing", "true");
        }
        let response: AsyncUploadResponse =
            self.post_multipart("/upload/json-index-async", form).await?;
        info!(
            file = %file.name,
            replace_existing,
            task_id = response.task_handle().unwrap_or("<none>"),
            "Import submitted"
        );
        Ok(response)
    }

    /// Open the progress stream of a job as a stream of event payloads.
    pub async fn progress_stream(&self, task_id: &str) -> Result<PayloadStream> {
        let response = self
            .get_event_stream(&format!("/upload/progress/{}", segment(task_id)))
            .await?;
        Ok(sse::data_stream(response.bytes_stream()))
    }

    /// Point-in-time status of a job, for polling after the stream is gone.
    pub async fn upload_status(&self, task_id: &str) -> Result<UploadStatusSnapshot> {
        self.get(&format!("/upload/status/{}", segment(task_id)), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiStatusError;
    use futures::StreamExt;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    fn manifest() -> ManifestFile {
        ManifestFile::new(
            "disk1.json",
            Some("application/json".to_string()),
            br#"{"scan_info": {}, "tree": {}}"#.to_vec(),
        )
    }

    #[tokio::test]
    async fn delete_disk_encodes_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/disks/Project%20X%2F2024")
            .with_status(200)
            .with_body(r#"{"message": "deleted"}"#)
            .create_async()
            .await;

        client(&server).delete_disk("Project X/2024").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_detail_becomes_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/disks/missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Hårddisk inte hittad"}"#)
            .create_async()
            .await;

        let err = client(&server).get_disk("missing").await.unwrap_err();
        let status = err.downcast_ref::<ApiStatusError>().unwrap();
        assert_eq!(status.status, 404);
        assert_eq!(status.message, "Hårddisk inte hittad");
    }

    #[tokio::test]
    async fn search_sends_only_set_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "brief".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "50".into()),
                Matcher::UrlEncoded("client".into(), "Acme".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"files": [{"filename": "brief.pdf", "disk_name": "disk1"}],
                    "total_count": 1, "page": 1, "per_page": 50}"#,
            )
            .create_async()
            .await;

        let mut query = SearchQuery::new("brief");
        query.client = Some("Acme".to_string());
        query.project = Some(String::new());
        let response = client(&server).search(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.total_count, 1);
        assert_eq!(response.files[0].filename, "brief.pdf");
    }

    #[tokio::test]
    async fn browse_root_omits_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/disks/disk1/browse")
            .match_query(Matcher::Missing)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [{"type": "folder", "filename": "Clients", "path": "Clients"}],
                    "directory_count": 1, "file_count": 0}"#,
            )
            .create_async()
            .await;

        let response = client(&server).browse("disk1", Some("")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.items.len(), 1);
        assert!(response.items[0].is_folder());
    }

    #[tokio::test]
    async fn start_import_sends_replace_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/json-index-async")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="disk1.json""#.into()),
                Matcher::Regex(r#"name="replace_existing""#.into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id": "abc", "success": true}"#)
            .create_async()
            .await;

        let response = client(&server).start_import(&manifest(), true).await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.task_handle(), Some("abc"));
    }

    #[tokio::test]
    async fn progress_stream_yields_event_payloads() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/upload/progress/abc")
            .match_header("accept", "text/event-stream")
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"status\": \"connected\"}\n\n: ping\n\ndata: {\"progress\": 10}\n\n")
            .create_async()
            .await;

        let stream = client(&server).progress_stream("abc").await.unwrap();
        let payloads: Vec<_> = stream.collect().await;
        assert_eq!(
            payloads,
            vec![
                Ok(r#"{"status": "connected"}"#.to_string()),
                Ok(r#"{"progress": 10}"#.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn upload_status_parses_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/upload/status/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id": "abc", "status": "processing", "progress": 40}"#)
            .create_async()
            .await;

        let snapshot = client(&server).upload_status("abc").await.unwrap();
        assert_eq!(snapshot.status.as_deref(), Some("processing"));
        assert_eq!(snapshot.progress, Some(40.0));
    }
}
