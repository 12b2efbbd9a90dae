//! Shared value types for the SBOM Forge pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! stage payloads and run-level bookkeeping.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PipelineRunId;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The kind of collaborator call being made.
///
/// Every content-producing step of the pipeline is one call to the generation
/// collaborator; the stage kind selects the instruction and output mode and is
/// carried on spans and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Raw SBOM text → dependency description.
    SbomInterpretation,
    /// Dependency description → dependency blueprint.
    Blueprint,
    /// Dependency blueprint → scaffold manifest.
    Scaffold,
    /// One manifest entry → generated file content.
    FileGeneration,
    /// One generated file → critique text.
    FileCritique,
    /// All generated files → cross-file issues keyed by file.
    GlobalCritique,
    /// One file plus its feedback → rewritten content.
    Refinement,
}

impl StageKind {
    /// Returns the stable snake_case label used in logs and spans.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SbomInterpretation => "sbom_interpretation",
            Self::Blueprint => "blueprint",
            Self::Scaffold => "scaffold",
            Self::FileGeneration => "file_generation",
            Self::FileCritique => "file_critique",
            Self::GlobalCritique => "global_critique",
            Self::Refinement => "refinement",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Opaque stage payloads
// ---------------------------------------------------------------------------

/// Structured result of SBOM interpretation.
///
/// The orchestrator never inspects its contents; it is embedded verbatim in the
/// blueprint request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyDescription(Value);

impl DependencyDescription {
    /// Wraps a parsed collaborator result.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Ordered dependency blueprint (hierarchy, init order, usage patterns).
///
/// Opaque to the orchestrator; embedded verbatim in the scaffold request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyBlueprint(Value);

impl DependencyBlueprint {
    /// Wraps a parsed collaborator result.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Refinement policy
// ---------------------------------------------------------------------------

/// How each round's global critique is folded into the accumulated global feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMergePolicy {
    /// Key-update: a file omitted by the latest critique keeps its previous issues.
    #[default]
    Sticky,
    /// Clear before merging: only the latest critique's issues are used.
    Fresh,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Summary of one completed `generate` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier recorded on every span of the run.
    pub run_id: PipelineRunId,
    /// When the SBOM interpretation call was issued.
    pub started_at: Timestamp,
    /// When the last artifact was written.
    pub finished_at: Timestamp,
    /// Number of entries in the scaffold manifest.
    pub files_generated: usize,
    /// Number of critique → global critique → rewrite cycles executed.
    pub rounds_completed: u32,
    /// Absolute or root-relative locations of every file written.
    pub written: Vec<PathBuf>,
}
