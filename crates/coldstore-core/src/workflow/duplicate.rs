use tracing::{info, warn};

use super::{CheckFailureDecision, DuplicateDecision, DuplicateResolver, UploadBackend};
use crate::error::UploadError;
use crate::manifest::ManifestFile;

/// What the duplicate gate decided for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Proceed { replace_existing: bool },
    /// A duplicate exists and the user declined to replace it.
    Cancelled,
    /// The check failed and the user chose not to upload blind.
    Abandoned,
}

/// Run the duplicate check for `file` and settle it with `resolver`.
///
/// A failed check is never treated as "no duplicate" on its own: the
/// resolver has to choose to proceed.
pub async fn resolve_duplicates<B, R>(backend: &B, resolver: &mut R, file: &ManifestFile) -> Resolution
where
    B: UploadBackend + ?Sized,
    R: DuplicateResolver + ?Sized,
{
    match backend.check_duplicate(file).await {
        Ok(check) if !check.duplicate_found => {
            info!(file = %file.name, "No duplicate found");
            Resolution::Proceed {
                replace_existing: false,
            }
        }
        Ok(check) => {
            info!(
                file = %file.name,
                existing = check.existing_disk.as_ref().map(|d| d.name.as_str()).unwrap_or("?"),
                "Duplicate disk found"
            );
            match resolver.resolve_duplicate(file, check.existing_disk.as_ref()) {
                DuplicateDecision::Replace => Resolution::Proceed {
                    replace_existing: true,
                },
                DuplicateDecision::Cancel => {
                    info!(file = %file.name, "Upload cancelled because of duplicate");
                    Resolution::Cancelled
                }
            }
        }
        Err(err) => {
            let err = match err {
                UploadError::DuplicateCheck(_) | UploadError::Connectivity(_) => err,
                other => UploadError::DuplicateCheck(other.to_string()),
            };
            warn!(file = %file.name, error = %err, "Duplicate check failed");
            match resolver.resolve_check_failure(file, &err) {
                CheckFailureDecision::Proceed => Resolution::Proceed {
                    replace_existing: false,
                },
                CheckFailureDecision::Abandon => Resolution::Abandoned,
            }
        }
    }
}
