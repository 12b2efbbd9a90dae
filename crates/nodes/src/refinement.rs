//! The critique → global critique → rewrite loop.
//!
//! [`RefinementLoop`] drives an explicit state machine over the current
//! [`ProjectArtifactSet`]:
//!
//! ```text
//! CritiquePending ──► GlobalCritiquePending ──► RefinePending ──┬──► CritiquePending (next round)
//!                                                               └──► Done (after the last round)
//! ```
//!
//! With zero rounds the loop starts in `Done` and leaves the artifact set
//! untouched. Feedback maps are local to one [`RefinementLoop::run`] call.

use std::collections::BTreeMap;

use pipeline::{
    FeedbackMergePolicy, FileName, ForgeError, GenerationProvider, GlobalFeedback,
    PerFileFeedback, ProjectArtifactSet, ScaffoldManifest,
};
use tracing::{info, instrument};

use crate::fanout::gather_keyed;
use crate::stages;

/// Position of the loop within the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementState {
    /// Per-file critiques are next.
    CritiquePending,
    /// The cross-file critique is next.
    GlobalCritiquePending,
    /// Per-file rewrites are next.
    RefinePending,
    /// All rounds have completed.
    Done,
}

/// Runs a fixed number of refinement rounds.
pub struct RefinementLoop<'a> {
    provider: &'a dyn GenerationProvider,
    manifest: &'a ScaffoldManifest,
    rounds: u32,
    merge_policy: FeedbackMergePolicy,
}

impl<'a> RefinementLoop<'a> {
    /// Creates a loop of `rounds` rounds over the files of `manifest`, using
    /// the default (sticky) global-feedback merge.
    pub fn new(
        provider: &'a dyn GenerationProvider,
        manifest: &'a ScaffoldManifest,
        rounds: u32,
    ) -> Self {
        Self {
            provider,
            manifest,
            rounds,
            merge_policy: FeedbackMergePolicy::default(),
        }
    }

    /// Sets how each round's global critique is merged into earlier ones.
    pub fn with_merge_policy(mut self, policy: FeedbackMergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// The state a fresh loop starts in.
    pub fn initial_state(&self) -> RefinementState {
        if self.rounds == 0 {
            RefinementState::Done
        } else {
            RefinementState::CritiquePending
        }
    }

    /// Refines `artifacts` in place and returns the number of rounds completed.
    ///
    /// Any failed call aborts the loop; rewrites from earlier completed rounds
    /// remain applied.
    #[instrument(skip_all, fields(rounds = self.rounds, files = artifacts.len()))]
    pub async fn run(&self, artifacts: &mut ProjectArtifactSet) -> Result<u32, ForgeError> {
        let mut per_file = PerFileFeedback::default();
        let mut global = GlobalFeedback::default();
        let mut round = 0;
        let mut state = self.initial_state();

        while state != RefinementState::Done {
            state = match state {
                RefinementState::CritiquePending => {
                    info!(round = round + 1, "critiquing files");
                    per_file.replace(self.critique_all(artifacts).await?);
                    RefinementState::GlobalCritiquePending
                }
                RefinementState::GlobalCritiquePending => {
                    info!(round = round + 1, "critiquing project");
                    let latest =
                        stages::critique_project(self.provider, artifacts, self.manifest).await?;
                    global.merge(latest, self.merge_policy);
                    RefinementState::RefinePending
                }
                RefinementState::RefinePending => {
                    info!(round = round + 1, "rewriting files");
                    let rewrites = self.refine_all(artifacts, &per_file, &global).await?;
                    artifacts.apply_rewrites(rewrites);
                    round += 1;
                    if round == self.rounds {
                        RefinementState::Done
                    } else {
                        RefinementState::CritiquePending
                    }
                }
                RefinementState::Done => RefinementState::Done,
            };
        }

        Ok(round)
    }

    async fn critique_all(
        &self,
        artifacts: &ProjectArtifactSet,
    ) -> Result<BTreeMap<FileName, String>, ForgeError> {
        let units = artifacts.iter().map(|(name, record)| {
            (
                name.clone(),
                stages::critique_file(self.provider, name, record, self.manifest),
            )
        });
        gather_keyed(units).await
    }

    async fn refine_all(
        &self,
        artifacts: &ProjectArtifactSet,
        per_file: &PerFileFeedback,
        global: &GlobalFeedback,
    ) -> Result<BTreeMap<FileName, String>, ForgeError> {
        let units = artifacts.iter().map(|(name, record)| {
            (
                name.clone(),
                stages::refine_file(
                    self.provider,
                    name,
                    &record.code,
                    per_file.text_for(name),
                    global.issues_for(name),
                ),
            )
        });
        gather_keyed(units).await
    }
}
