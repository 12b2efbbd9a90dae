//! Top-level error and retry-policy types for the SBOM Forge pipeline domain.
//!
//! [`ForgeError`] covers conditions that abort a run. Collaborator failures
//! ([`crate::GenerationError`]) and manifest problems ([`crate::ManifestError`])
//! are defined next to the ports and types that produce them and are wrapped
//! here with stage context.
//!
//! [`RetryPolicy`] is a cross-cutting concern: the orchestrator never retries,
//! but generation providers consult it to decide whether to re-issue a call.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FileName, GenerationError, ManifestError, StageKind};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, rate limiting, server errors.
/// - `NonRetryable` errors: rejected requests, malformed output, invalid
///   configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Materialization failures
// ---------------------------------------------------------------------------

/// One artifact that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationFailure {
    /// Destination that was attempted (output root joined with the artifact path).
    pub path: PathBuf,
    /// Rendered I/O error.
    pub cause: String,
}

impl std::fmt::Display for MaterializationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.cause)
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run.
///
/// Every variant is terminal for the run: the orchestrator has no retry,
/// fallback content, or checkpointing. Earlier stages' output is cumulative
/// context for later stages, so nothing downstream of a failure is attempted.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// A collaborator call failed or returned content unusable in the
    /// requested output mode.
    #[error("{stage} call failed{}: {source}", file_suffix(.file))]
    Collaborator {
        /// Stage whose call failed.
        stage: StageKind,
        /// File the call was made for; `None` for whole-project stages.
        file: Option<FileName>,
        /// Underlying collaborator error.
        #[source]
        source: GenerationError,
    },

    /// The scaffold manifest is unusable. Raised before any file generation.
    #[error("Invalid scaffold manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// One or more artifacts could not be written. Every other artifact was
    /// still attempted.
    #[error("Failed to write {} artifact(s): {}", .failures.len(), join_failures(.failures))]
    Materialization {
        /// Per-file failures, in write order.
        failures: Vec<MaterializationFailure>,
    },

    /// The runtime configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ForgeError {
    /// Wraps a collaborator error for a whole-project stage.
    pub fn collaborator(stage: StageKind, source: GenerationError) -> Self {
        Self::Collaborator {
            stage,
            file: None,
            source,
        }
    }

    /// Wraps a collaborator error for a per-file stage.
    pub fn collaborator_for(stage: StageKind, file: &FileName, source: GenerationError) -> Self {
        Self::Collaborator {
            stage,
            file: Some(file.clone()),
            source,
        }
    }

    /// Returns the stage of a collaborator failure.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::Collaborator { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

fn file_suffix(file: &Option<FileName>) -> String {
    match file {
        Some(name) => format!(" for '{name}'"),
        None => String::new(),
    }
}

fn join_failures(failures: &[MaterializationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_message_names_stage_and_file() {
        let file = FileName::new("a.py").unwrap();
        let err = ForgeError::collaborator_for(
            StageKind::Refinement,
            &file,
            GenerationError::EmptyResponse,
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("refinement call failed for 'a.py'"), "{rendered}");
        assert_eq!(err.stage(), Some(StageKind::Refinement));
    }

    #[test]
    fn materialization_message_lists_every_failure() {
        let err = ForgeError::Materialization {
            failures: vec![
                MaterializationFailure {
                    path: PathBuf::from("out/a.py"),
                    cause: "permission denied".into(),
                },
                MaterializationFailure {
                    path: PathBuf::from("out/b.py"),
                    cause: "read-only file system".into(),
                },
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("2 artifact(s)"));
        assert!(rendered.contains("out/a.py: permission denied"));
        assert!(rendered.contains("out/b.py: read-only file system"));
    }

    #[test]
    fn retry_policy_classification() {
        assert!(RetryPolicy::Retryable { after: None }.is_retryable());
        assert!(!RetryPolicy::NonRetryable.is_retryable());
    }
}
