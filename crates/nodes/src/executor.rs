//! The stage sequencer.
//!
//! [`PipelineExecutor`] drives one run from SBOM text to files on disk:
//!
//! 1. SBOM interpretation, blueprint, and scaffold calls, strictly in order;
//!    each payload embeds the previous stage's full output.
//! 2. File generation fan-out over the validated manifest.
//! 3. The refinement loop.
//! 4. Materialization under the output root.
//!
//! The executor keeps no per-run state. Everything a run produces lives in
//! locals of [`PipelineExecutor::build`] and [`PipelineExecutor::generate`], so
//! one instance can serve several independent runs at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline::{
    ArtifactStore, FeedbackMergePolicy, ForgeError, GenerationProvider, PipelineRunId,
    ProjectArtifactSet, RunReport, ScaffoldManifest, Timestamp,
};
use tracing::{info, instrument, Instrument};

use crate::fanout::gather_keyed;
use crate::materialize::{materialize, FsArtifactStore};
use crate::refinement::RefinementLoop;
use crate::stages;

/// Refinement rounds used when the caller does not choose.
pub const DEFAULT_REFINEMENT_ROUNDS: u32 = 3;

/// Output root used when the caller does not choose.
pub const DEFAULT_OUTPUT_ROOT: &str = "generated_code";

/// The artifact set produced by stages 1 to 5, before anything is written.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The validated file plan.
    pub manifest: ScaffoldManifest,
    /// Final content of every file.
    pub artifacts: ProjectArtifactSet,
    /// Refinement rounds executed.
    pub rounds_completed: u32,
}

/// Sequences every stage of a generation run.
#[derive(Clone)]
pub struct PipelineExecutor {
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn ArtifactStore>,
    merge_policy: FeedbackMergePolicy,
}

impl PipelineExecutor {
    /// Creates an executor that writes artifacts to the local filesystem.
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            store: Arc::new(FsArtifactStore),
            merge_policy: FeedbackMergePolicy::default(),
        }
    }

    /// Replaces the artifact destination.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets how global critiques accumulate across refinement rounds.
    pub fn with_merge_policy(mut self, policy: FeedbackMergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Runs the full pipeline and writes the result under `output_root`.
    pub async fn generate(
        &self,
        sbom: &str,
        refinement_rounds: u32,
        output_root: impl AsRef<Path>,
    ) -> Result<RunReport, ForgeError> {
        let run_id = PipelineRunId::new_random();
        let output_root = output_root.as_ref();
        let span = tracing::info_span!(
            "generate",
            run_id = %run_id,
            rounds = refinement_rounds,
            output_root = %output_root.display(),
        );
        self.generate_run(run_id, sbom, refinement_rounds, output_root)
            .instrument(span)
            .await
    }

    async fn generate_run(
        &self,
        run_id: PipelineRunId,
        sbom: &str,
        refinement_rounds: u32,
        output_root: &Path,
    ) -> Result<RunReport, ForgeError> {
        let started_at = Timestamp::now();
        let outcome = self.build(sbom, refinement_rounds).await?;

        info!(files = outcome.artifacts.len(), "materializing artifacts");
        let written: Vec<PathBuf> =
            materialize(self.store.as_ref(), output_root, &outcome.artifacts).await?;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Timestamp::now(),
            files_generated: outcome.manifest.len(),
            rounds_completed: outcome.rounds_completed,
            written,
        };
        info!(
            files = report.files_generated,
            rounds = report.rounds_completed,
            "run complete"
        );
        Ok(report)
    }

    /// Runs stages 1 to 5 and returns the artifact set without writing it.
    #[instrument(skip_all, fields(rounds = refinement_rounds))]
    pub async fn build(
        &self,
        sbom: &str,
        refinement_rounds: u32,
    ) -> Result<BuildOutcome, ForgeError> {
        let provider = self.provider.as_ref();

        let description = stages::interpret_sbom(provider, sbom).await?;
        info!("SBOM interpreted");
        let blueprint = stages::build_blueprint(provider, &description).await?;
        info!("blueprint built");
        let manifest = stages::plan_scaffold(provider, &blueprint).await?;
        info!(files = manifest.len(), "scaffold planned");

        let mut artifacts = self.generate_files(&manifest).await?;
        info!(files = artifacts.len(), "files generated");

        let rounds_completed = RefinementLoop::new(provider, &manifest, refinement_rounds)
            .with_merge_policy(self.merge_policy)
            .run(&mut artifacts)
            .await?;

        Ok(BuildOutcome {
            manifest,
            artifacts,
            rounds_completed,
        })
    }

    async fn generate_files(
        &self,
        manifest: &ScaffoldManifest,
    ) -> Result<ProjectArtifactSet, ForgeError> {
        let provider = self.provider.as_ref();
        let units = manifest.files().iter().map(|spec| {
            (
                spec.name.clone(),
                stages::generate_file(provider, spec, manifest),
            )
        });
        let mut generated = gather_keyed(units).await?;

        let mut artifacts = ProjectArtifactSet::new();
        for spec in manifest.files() {
            if let Some(code) = generated.remove(&spec.name) {
                artifacts.insert(spec, code);
            }
        }
        Ok(artifacts)
    }
}
