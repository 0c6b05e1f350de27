use std::io::{self, BufRead, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use coldstore_core::{
    CheckFailureDecision, DuplicateDecision, DuplicateResolver, ErrorMetadata, FixedResolver,
    ManifestFile, ProgressView, UploadError,
};
use coldstore_core::models::ExistingDisk;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const PROGRESS_BAR_WIDTH: usize = 30;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable size, 1024-based with one decimal.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, SIZE_UNITS[unit])
}

/// Backend timestamps come as RFC 3339, ISO without offset, or SQLite's
/// `YYYY-MM-DD HH:MM:SS`.
pub fn format_date(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return "Unknown date".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => "Invalid date".to_string(),
    }
}

/// Display form of a directory path: always rooted.
pub fn format_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Last component of a directory path; `Root` for the disk root.
pub fn directory_name(path: &str) -> &str {
    path.split('/')
        .filter(|part| !part.is_empty())
        .last()
        .unwrap_or("Root")
}

/// One status line for the job in flight.
pub fn render_progress(view: &ProgressView) -> String {
    let filled = if view.progress.is_finite() {
        ((view.progress.clamp(0.0, 100.0) / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    );
    let mut line = format!("[{}] {:>3.0}% {}", bar, view.progress, view.status);
    if !view.details.is_empty() {
        line.push_str(" - ");
        line.push_str(&view.details);
    }
    line
}

/// Ask a yes/no question. Anything but `y`/`yes` (or end of input) is no.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// How `upload` answers when a disk with the manifest's name exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OnDuplicate {
    Ask,
    Replace,
    Skip,
}

/// Asks the user on the terminal.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
    /// Upload without asking when the duplicate check fails.
    force: bool,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(input: R, output: W, force: bool) -> Self {
        Self {
            input,
            output,
            force,
        }
    }

    /// Terminal reads block; inside a runtime they go through `block_in_place`.
    fn ask(&mut self, question: &str) -> bool {
        let answer = if tokio::runtime::Handle::try_current().is_ok() {
            tokio::task::block_in_place(|| confirm(&mut self.input, &mut self.output, question))
        } else {
            confirm(&mut self.input, &mut self.output, question)
        };
        answer.unwrap_or(false)
    }
}

impl<R: BufRead + Send, W: Write + Send> DuplicateResolver for PromptResolver<R, W> {
    fn resolve_duplicate(
        &mut self,
        file: &ManifestFile,
        existing: Option<&ExistingDisk>,
    ) -> DuplicateDecision {
        let question = match existing {
            Some(disk) => format!(
                "{}: disk '{}' (imported {}) already exists. Replace it?",
                file.name,
                disk.name,
                format_date(disk.created_at.as_deref())
            ),
            None => format!("{}: a disk with this name already exists. Replace it?", file.name),
        };
        if self.ask(&question) {
            DuplicateDecision::Replace
        } else {
            DuplicateDecision::Cancel
        }
    }

    fn resolve_check_failure(
        &mut self,
        file: &ManifestFile,
        error: &UploadError,
    ) -> CheckFailureDecision {
        if self.force {
            return CheckFailureDecision::Proceed;
        }
        let question = format!(
            "{}: could not check for an existing disk ({}). Upload anyway?",
            file.name,
            error.client_message()
        );
        if self.ask(&question) {
            CheckFailureDecision::Proceed
        } else {
            CheckFailureDecision::Abandon
        }
    }
}

/// The resolver for the `upload` flags.
pub fn resolver_for(on_duplicate: OnDuplicate, force: bool) -> Box<dyn DuplicateResolver> {
    let on_check_failure = if force {
        CheckFailureDecision::Proceed
    } else {
        CheckFailureDecision::Abandon
    };
    match on_duplicate {
        OnDuplicate::Ask => Box::new(PromptResolver::new(
            io::BufReader::new(io::stdin()),
            io::stderr(),
            force,
        )),
        OnDuplicate::Replace => Box::new(FixedResolver::new(DuplicateDecision::Replace, on_check_failure)),
        OnDuplicate::Skip => Box::new(FixedResolver::new(DuplicateDecision::Cancel, on_check_failure)),
    }
}
