//! Cold Storage CLI: command-line client for the file index API.
//!
//! Set COLDSTORE_API_URL, or COLDSTORE_ORIGIN plus COLDSTORE_ENV to derive it.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use coldstore_api_client::ApiClient;
use coldstore_cli::{
    confirm, directory_name, format_date, format_file_size, format_path, init_tracing,
    render_progress, resolver_for, truncate_string, OnDuplicate,
};
use coldstore_core::models::{BrowseItem, DiskSummary, SearchQuery};
use coldstore_core::{
    AttemptOutcome, ClientConfig, ErrorMetadata, ManifestFile, UploadStatus, UploadWorkflow,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "coldstore", about = "Cold Storage file index CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// List all indexed disks
    Disks {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Show one disk
    Disk {
        /// Disk ID
        id: String,
    },
    /// List the files of a disk, one page at a time
    Files {
        /// Disk ID
        disk_id: String,
        /// Only files under this path
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "100")]
        per_page: u32,
    },
    /// List one directory of a disk
    Browse {
        /// Disk ID
        disk_id: String,
        /// Directory path (root when omitted)
        #[arg(long)]
        path: Option<String>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Search indexed files
    Search {
        /// Search term
        query: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        file_type: Option<String>,
        /// Restrict to one disk ID
        #[arg(long)]
        disk: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        per_page: u32,
    },
    /// System-wide statistics
    Stats,
    /// Check that the API and its database are up
    Health,
    /// Delete a disk and its index
    Delete {
        /// Disk name
        name: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Status of an import job
    Status {
        /// Task ID returned when the import started
        task_id: String,
    },
    /// Import one or more JSON manifests
    Upload {
        /// Manifest files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// What to do when a disk with the same name exists
        #[arg(long, value_enum, default_value = "ask")]
        on_duplicate: OnDuplicate,
        /// Upload anyway when the duplicate check fails
        #[arg(long)]
        force: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn print_disk_table(disks: &[DiskSummary]) {
    println!("{:<32} {:>10} {:>12} {:<16}", "DISK", "FILES", "SIZE", "SCANNED");
    for disk in disks {
        println!(
            "{:<32} {:>10} {:>12} {:<16}",
            truncate_string(disk.display_name(), 32),
            disk.effective_file_count(),
            format_file_size(disk.effective_total_size()),
            format_date(disk.scan_date.as_deref().or(disk.created_at.as_deref())),
        );
    }
    let total_files: u64 = disks.iter().map(DiskSummary::effective_file_count).sum();
    let total_size: u64 = disks.iter().map(DiskSummary::effective_total_size).sum();
    println!(
        "{} disks, {} files, {}",
        disks.len(),
        total_files,
        format_file_size(total_size)
    );
}

fn print_browse_table(path: Option<&str>, items: &[BrowseItem]) {
    let path = path.unwrap_or("");
    println!("{} ({})", directory_name(path), format_path(path));
    for item in items {
        match item {
            BrowseItem::Folder { filename, file_count, .. } => println!(
                "  [dir]  {:<48} {:>10}",
                truncate_string(filename, 48),
                file_count.map(|n| format!("{} files", n)).unwrap_or_default()
            ),
            BrowseItem::File { filename, file_size, .. } => println!(
                "         {:<48} {:>10}",
                truncate_string(filename, 48),
                format_file_size(file_size.unwrap_or(0))
            ),
        }
    }
}

#[derive(Serialize)]
struct UploadReport<'a> {
    results: &'a coldstore_core::ResultLog,
    /// Files left selected for a retry.
    pending: Vec<&'a str>,
    declined: Vec<&'a str>,
}

async fn upload(
    config: &ClientConfig,
    client: ApiClient,
    paths: Vec<PathBuf>,
    on_duplicate: OnDuplicate,
    force: bool,
) -> anyhow::Result<()> {
    let files = paths
        .iter()
        .map(|path| ManifestFile::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut workflow = UploadWorkflow::new(client, config.workflow);
    workflow
        .select(files)
        .map_err(|e| anyhow::anyhow!(e.client_message()))?;

    let mut updates = workflow.subscribe();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            if !view.status.is_empty() {
                eprintln!("{}", render_progress(&view));
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling upload");
            on_signal.cancel();
        }
    });

    let mut resolver = resolver_for(on_duplicate, force);
    let outcomes = workflow.upload(resolver.as_mut(), &cancel).await;

    let declined: Vec<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| {
            matches!(
                outcome,
                AttemptOutcome::DuplicateCancelled | AttemptOutcome::Abandoned
            )
        })
        .map(|(name, _)| name.as_str())
        .collect();
    print_json(&UploadReport {
        results: workflow.results(),
        pending: workflow.pending().iter().map(|f| f.name.as_str()).collect(),
        declined,
    })?;

    let failed = workflow.results().count(UploadStatus::Error);
    let imported = workflow.results().count(UploadStatus::Success);
    drop(workflow);
    // A pending view reset keeps the sender alive until the clear delay ends.
    renderer.abort();

    if cancel.is_cancelled() {
        anyhow::bail!("Upload cancelled");
    }
    if failed > 0 {
        anyhow::bail!("{} of {} uploads failed", failed, failed + imported);
    }
    info!(imported, "Upload finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let client = ApiClient::from_config(&config).context(
        "Failed to create API client. Set COLDSTORE_API_URL or COLDSTORE_ORIGIN",
    )?;
    info!(base_url = client.base_url(), "Using file index API");

    match cli.command {
        Commands::Disks { format } => {
            let disks = client.list_disks().await?;
            match format {
                OutputFormat::Json => print_json(&disks)?,
                OutputFormat::Table => print_disk_table(&disks),
            }
        }
        Commands::Disk { id } => {
            let disk = client.get_disk(&id).await?;
            print_json(&disk)?;
        }
        Commands::Files {
            disk_id,
            path,
            page,
            per_page,
        } => {
            let files = client
                .list_disk_files(&disk_id, path.as_deref(), page, per_page)
                .await?;
            print_json(&files)?;
        }
        Commands::Browse {
            disk_id,
            path,
            format,
        } => {
            let listing = client.browse(&disk_id, path.as_deref()).await?;
            match format {
                OutputFormat::Json => print_json(&listing)?,
                OutputFormat::Table => print_browse_table(path.as_deref(), &listing.items),
            }
        }
        Commands::Search {
            query,
            client: client_name,
            project,
            file_type,
            disk,
            page,
            per_page,
        } => {
            let mut search = SearchQuery::new(query);
            search.client = client_name;
            search.project = project;
            search.file_type = file_type;
            search.disk_id = disk;
            search.page = page;
            search.per_page = per_page;
            let response = client.search(&search).await?;
            print_json(&response)?;
        }
        Commands::Stats => {
            let stats = client.stats().await?;
            print_json(&stats)?;
        }
        Commands::Health => {
            let health = client.health().await?;
            print_json(&health)?;
        }
        Commands::Delete { name, yes } => {
            if !yes {
                let question = format!("Delete disk '{}' and everything indexed on it?", name);
                let confirmed = confirm(&mut io::stdin().lock(), &mut io::stderr(), &question)
                    .context("Read confirmation")?;
                if !confirmed {
                    anyhow::bail!("Deletion of '{}' aborted", name);
                }
            }
            client.delete_disk(&name).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Disk {} deleted", name) }),
            )?;
        }
        Commands::Status { task_id } => {
            let status = client.upload_status(&task_id).await?;
            print_json(&status)?;
        }
        Commands::Upload {
            files,
            on_duplicate,
            force,
        } => {
            upload(&config, client, files, on_duplicate, force).await?;
        }
    }

    Ok(())
}
