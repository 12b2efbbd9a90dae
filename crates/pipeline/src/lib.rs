//! Core orchestration domain for SBOM Forge.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, port trait, and error type used throughout the pipeline.
//! Infrastructure crates implement the traits defined here; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`FileName`, `ArtifactPath`, `PipelineRunId`) |
//! | [`types`] | Shared value types (`StageKind`, opaque stage payloads, `RunReport`) |
//! | [`manifest`] | Scaffold manifest parsing and validation |
//! | [`artifacts`] | Per-run file records, feedback maps, and the `ArtifactStore` port |
//! | [`generation`] | The `GenerationProvider` port and its error type |
//! | [`errors`] | Top-level error and retry-policy types |

pub mod artifacts;
pub mod errors;
pub mod generation;
pub mod identifiers;
pub mod manifest;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use artifacts::{ArtifactStore, FileRecord, GlobalFeedback, PerFileFeedback, ProjectArtifactSet};
pub use errors::{ForgeError, MaterializationFailure, RetryPolicy};
pub use generation::{
    parse_json_output, CompletionRequest, GenerationError, GenerationProvider, OutputMode,
};
pub use identifiers::{ArtifactPath, FileName, PipelineRunId};
pub use manifest::{FileSpec, ManifestError, ScaffoldManifest};
pub use types::{
    DependencyBlueprint, DependencyDescription, FeedbackMergePolicy, RunReport, StageKind,
    Timestamp,
};
