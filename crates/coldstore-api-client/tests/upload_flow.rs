//! Manifest uploads end to end against a mock file index server.

use std::time::Duration;

use coldstore_api_client::ApiClient;
use coldstore_core::{
    AttemptOutcome, CheckFailureDecision, DuplicateDecision, FixedResolver, ManifestFile,
    UploadStatus, UploadWorkflow, WorkflowConfig,
};
use mockito::{Matcher, Server, ServerGuard};
use tokio_util::sync::CancellationToken;

const MANIFEST: &str = r#"{
    "scan_info": {"root_path": "/Volumes/disk1", "scan_date": "2024-03-01T10:00:00"},
    "tree": {"name": "disk1", "type": "directory", "children": []},
    "statistics": {"total_files": 42}
}"#;

fn workflow(server: &ServerGuard) -> UploadWorkflow<ApiClient> {
    let client = ApiClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let config = WorkflowConfig {
        progress_timeout: Duration::from_secs(10),
        clear_delay: Duration::from_millis(50),
    };
    UploadWorkflow::new(client, config)
}

fn manifest() -> ManifestFile {
    ManifestFile::new(
        "disk1.json",
        Some("application/json".to_string()),
        MANIFEST.as_bytes().to_vec(),
    )
}

fn resolver(on_duplicate: DuplicateDecision) -> FixedResolver {
    FixedResolver::new(on_duplicate, CheckFailureDecision::Abandon)
}

async fn mock_duplicate(server: &mut ServerGuard, body: &str) -> mockito::Mock {
    server
        .mock("POST", "/upload/check-duplicate")
        .match_body(Matcher::Regex(r#"filename="disk1.json""#.into()))
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn imports_manifest_and_clears_selection() {
    let mut server = Server::new_async().await;
    let check = mock_duplicate(&mut server, r#"{"duplicate_found": false}"#).await;
    let submit = server
        .mock("POST", "/upload/json-index-async")
        .with_header("content-type", "application/json")
        .with_body(r#"{"task_id": "abc", "success": true, "message": "Upload started"}"#)
        .expect(1)
        .create_async()
        .await;
    let progress = server
        .mock("GET", "/upload/progress/abc")
        .with_header("content-type", "text/event-stream")
        .with_body(concat!(
            "data: {\"status\": \"connected\", \"task_id\": \"abc\"}\n\n",
            "data: {\"step\": \"parsing\", \"progress\": 10, \"message\": \"Parsing JSON\"}\n\n",
            "data: {\"step\": \"importing\", \"progress\": 40, \"message\": \"Importing files\"}\n\n",
            "data: {\"step\": \"complete\", \"progress\": 100, \"message\": \"Import complete\", ",
            "\"result\": {\"disk_name\": \"disk1\", \"files_imported\": 42, \"directories_created\": 7}}\n\n",
            "data: {\"status\": \"finished\"}\n\n",
        ))
        .create_async()
        .await;

    let mut workflow = workflow(&server);
    let updates = workflow.subscribe();
    workflow.select(vec![manifest()]).unwrap();

    let outcomes = workflow
        .upload(&mut resolver(DuplicateDecision::Cancel), &CancellationToken::new())
        .await;

    check.assert_async().await;
    submit.assert_async().await;
    progress.assert_async().await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0].1 {
        AttemptOutcome::Imported(result) => assert_eq!(result.files_imported, 42),
        other => panic!("unexpected outcome: {:?}", other),
    }
    let results = workflow.results().entries();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, UploadStatus::Success);
    assert!(results[0].details.as_deref().unwrap().contains("42 files"));
    assert!(workflow.pending().is_empty());
    assert_eq!(updates.borrow().progress, 100.0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(updates.borrow().progress, 0.0);
}

#[tokio::test]
async fn replace_is_sent_with_submission() {
    let mut server = Server::new_async().await;
    mock_duplicate(
        &mut server,
        r#"{"duplicate_found": true, "existing_disk": {"name": "disk1", "created_at": "2024-02-01"}}"#,
    )
    .await;
    let submit = server
        .mock("POST", "/upload/json-index-async")
        .match_body(Matcher::Regex(r#"name="replace_existing"\r\n\r\ntrue"#.into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"task_id": "abc", "success": true}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/upload/progress/abc")
        .with_header("content-type", "text/event-stream")
        .with_body(
            "data: {\"step\": \"error\", \"progress\": 30, \"message\": \"Database locked\"}\n\n",
        )
        .create_async()
        .await;

    let mut workflow = workflow(&server);
    workflow.select(vec![manifest()]).unwrap();
    let outcomes = workflow
        .upload(&mut resolver(DuplicateDecision::Replace), &CancellationToken::new())
        .await;

    submit.assert_async().await;
    assert!(matches!(outcomes[0].1, AttemptOutcome::Failed(_)));
    let results = workflow.results().entries();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, UploadStatus::Error);
    assert_eq!(results[0].message, "Database locked");
    assert_eq!(workflow.pending().len(), 1);
}

#[tokio::test]
async fn declined_duplicate_is_never_submitted() {
    let mut server = Server::new_async().await;
    mock_duplicate(
        &mut server,
        r#"{"duplicate_found": true, "existing_disk": {"name": "disk1"}}"#,
    )
    .await;
    let submit = server
        .mock("POST", "/upload/json-index-async")
        .expect(0)
        .create_async()
        .await;

    let mut workflow = workflow(&server);
    workflow.select(vec![manifest()]).unwrap();
    let outcomes = workflow
        .upload(&mut resolver(DuplicateDecision::Cancel), &CancellationToken::new())
        .await;

    submit.assert_async().await;
    assert_eq!(outcomes[0].1, AttemptOutcome::DuplicateCancelled);
    assert!(workflow.results().is_empty());
    assert!(workflow.pending().is_empty());
}

#[tokio::test]
async fn missing_task_handle_opens_no_stream() {
    let mut server = Server::new_async().await;
    mock_duplicate(&mut server, r#"{"duplicate_found": false}"#).await;
    server
        .mock("POST", "/upload/json-index-async")
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "no worker available"}"#)
        .create_async()
        .await;
    let progress = server
        .mock("GET", Matcher::Regex("^/upload/progress/".into()))
        .expect(0)
        .create_async()
        .await;

    let mut workflow = workflow(&server);
    workflow.select(vec![manifest()]).unwrap();
    workflow
        .upload(&mut resolver(DuplicateDecision::Cancel), &CancellationToken::new())
        .await;

    progress.assert_async().await;
    let results = workflow.results().entries();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, UploadStatus::Error);
}
