//! Port definition for the text/JSON generation collaborator.
//!
//! Every content-producing step of the pipeline (SBOM interpretation,
//! blueprint, scaffold, file generation, per-file critique, global critique,
//! refinement) is realised as one call to [`GenerationProvider::complete`] with
//! a different instruction and [`OutputMode`]. Infrastructure crates implement
//! the trait; the orchestrator only ever sees this module.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{RetryPolicy, StageKind};

/// The form the collaborator is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// A single JSON document. The orchestrator parses it and treats a
    /// syntactically invalid answer as a failure.
    Json,
    /// Free text, used verbatim.
    Text,
}

/// One request to the generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Stage issuing the request. Used for tracing and by test doubles.
    pub stage: StageKind,
    /// System-level instruction describing the task.
    pub instruction: String,
    /// User payload carrying all context for this call.
    pub payload: String,
    /// Requested output form.
    pub mode: OutputMode,
}

/// Failure of a single collaborator call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("Transport error: {message}")]
    Transport {
        /// Rendered transport error.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("Service returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
        /// Delay requested by the service via `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The service answered successfully but without any content.
    #[error("Service returned an empty completion")]
    EmptyResponse,

    /// The content could not be interpreted in the requested output mode.
    #[error("Malformed output: {message}")]
    MalformedOutput {
        /// What was wrong with the content.
        message: String,
    },

    /// The provider cannot issue requests as configured.
    #[error("Missing credentials: environment variable {variable} is not set")]
    MissingCredentials {
        /// Name of the environment variable that was expected to hold the key.
        variable: String,
    },
}

impl GenerationError {
    /// Classifies this error for the provider's retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Api {
                status: 429 | 503,
                retry_after,
                ..
            } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Api { status, .. } if *status >= 500 => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }

    /// Builds a [`GenerationError::MalformedOutput`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }
}

/// The text/JSON generation collaborator.
///
/// Implementations return the raw completion text; interpreting it per
/// [`OutputMode`] is the caller's job. Retries, if any, happen inside the
/// implementation.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Issues one completion request.
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}

/// Parses a JSON-mode completion.
///
/// A result that is not a single valid JSON document is a failure; it is never
/// coerced.
pub fn parse_json_output(raw: &str) -> Result<Value, GenerationError> {
    serde_json::from_str(raw.trim())
        .map_err(|e| GenerationError::malformed(format!("invalid JSON document: {e}")))
}
