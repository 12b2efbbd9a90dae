//! SBOM Forge pipeline stages and the executor that sequences them.
//!
//! This crate provides one function per collaborator call, the fan-out/fan-in
//! task manager used by every per-file stage, the refinement loop controller,
//! the filesystem artifact store, and the `PipelineExecutor` that drives a run
//! from SBOM text to files on disk.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the domain types in
//! the [`pipeline`] crate and the [`pipeline::GenerationProvider`] port. They
//! contain no transport details of their own.

pub mod executor;
pub mod fanout;
pub mod materialize;
pub mod prompts;
pub mod refinement;
pub mod stages;

pub use executor::{BuildOutcome, PipelineExecutor, DEFAULT_OUTPUT_ROOT, DEFAULT_REFINEMENT_ROUNDS};
pub use fanout::gather_keyed;
pub use materialize::{materialize, FsArtifactStore};
pub use refinement::{RefinementLoop, RefinementState};
