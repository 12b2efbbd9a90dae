//! One function per collaborator call.
//!
//! Each function builds the request for its stage, issues it, and interprets
//! the answer. Failures are wrapped with the stage (and file, for per-file
//! stages) so the caller can report exactly which call aborted the run.

use pipeline::{
    parse_json_output, CompletionRequest, DependencyBlueprint, DependencyDescription, FileName,
    FileRecord, FileSpec, ForgeError, GenerationError, GenerationProvider, GlobalFeedback,
    OutputMode, ProjectArtifactSet, ScaffoldManifest, StageKind,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::prompts;

async fn call(
    provider: &dyn GenerationProvider,
    stage: StageKind,
    instruction: &str,
    payload: String,
    mode: OutputMode,
) -> Result<String, GenerationError> {
    let request = CompletionRequest {
        stage,
        instruction: instruction.to_string(),
        payload,
        mode,
    };
    let answer = provider.complete(request).await?;
    debug!(stage = %stage, bytes = answer.len(), "collaborator answered");
    Ok(answer)
}

async fn call_json(
    provider: &dyn GenerationProvider,
    stage: StageKind,
    instruction: &str,
    payload: String,
) -> Result<Value, GenerationError> {
    let raw = call(provider, stage, instruction, payload, OutputMode::Json).await?;
    parse_json_output(&raw)
}

/// Stage 1: raw SBOM text → dependency description.
#[instrument(skip_all, fields(stage = "sbom_interpretation", sbom_bytes = sbom.len()))]
pub async fn interpret_sbom(
    provider: &dyn GenerationProvider,
    sbom: &str,
) -> Result<DependencyDescription, ForgeError> {
    let stage = StageKind::SbomInterpretation;
    call_json(provider, stage, prompts::SBOM_INTERPRETATION, prompts::sbom_payload(sbom))
        .await
        .map(DependencyDescription::new)
        .map_err(|e| ForgeError::collaborator(stage, e))
}

/// Stage 2: dependency description → dependency blueprint.
#[instrument(skip_all, fields(stage = "blueprint"))]
pub async fn build_blueprint(
    provider: &dyn GenerationProvider,
    description: &DependencyDescription,
) -> Result<DependencyBlueprint, ForgeError> {
    let stage = StageKind::Blueprint;
    call_json(
        provider,
        stage,
        prompts::BLUEPRINT,
        prompts::blueprint_payload(description),
    )
    .await
    .map(DependencyBlueprint::new)
    .map_err(|e| ForgeError::collaborator(stage, e))
}

/// Stage 3: dependency blueprint → validated scaffold manifest.
#[instrument(skip_all, fields(stage = "scaffold"))]
pub async fn plan_scaffold(
    provider: &dyn GenerationProvider,
    blueprint: &DependencyBlueprint,
) -> Result<ScaffoldManifest, ForgeError> {
    let stage = StageKind::Scaffold;
    let raw = call_json(
        provider,
        stage,
        prompts::SCAFFOLD,
        prompts::scaffold_payload(blueprint),
    )
    .await
    .map_err(|e| ForgeError::collaborator(stage, e))?;
    Ok(ScaffoldManifest::from_value(raw)?)
}

/// Stage 4 unit: one manifest entry → first version of the file.
#[instrument(skip_all, fields(stage = "file_generation", file = %spec.name))]
pub async fn generate_file(
    provider: &dyn GenerationProvider,
    spec: &FileSpec,
    manifest: &ScaffoldManifest,
) -> Result<String, ForgeError> {
    let stage = StageKind::FileGeneration;
    call(
        provider,
        stage,
        prompts::FILE_GENERATION,
        prompts::file_generation_payload(spec, manifest),
        OutputMode::Text,
    )
    .await
    .map_err(|e| ForgeError::collaborator_for(stage, &spec.name, e))
}

/// Stage 5a unit: one file → critique text.
#[instrument(skip_all, fields(stage = "file_critique", file = %name))]
pub async fn critique_file(
    provider: &dyn GenerationProvider,
    name: &FileName,
    record: &FileRecord,
    manifest: &ScaffoldManifest,
) -> Result<String, ForgeError> {
    let stage = StageKind::FileCritique;
    call(
        provider,
        stage,
        prompts::FILE_CRITIQUE,
        prompts::file_critique_payload(record, manifest),
        OutputMode::Text,
    )
    .await
    .map_err(|e| ForgeError::collaborator_for(stage, name, e))
}

/// Stage 5b: every file at once → cross-file issues keyed by file.
#[instrument(skip_all, fields(stage = "global_critique", files = artifacts.len()))]
pub async fn critique_project(
    provider: &dyn GenerationProvider,
    artifacts: &ProjectArtifactSet,
    manifest: &ScaffoldManifest,
) -> Result<GlobalFeedback, ForgeError> {
    let stage = StageKind::GlobalCritique;
    call_json(
        provider,
        stage,
        prompts::GLOBAL_CRITIQUE,
        prompts::global_critique_payload(artifacts, manifest),
    )
    .await
    .and_then(|document| GlobalFeedback::from_critique(&document, manifest))
    .map_err(|e| ForgeError::collaborator(stage, e))
}

/// Stage 5c unit: one file plus both feedback sources → rewritten file.
#[instrument(skip_all, fields(stage = "refinement", file = %name, issues = issues.len()))]
pub async fn refine_file(
    provider: &dyn GenerationProvider,
    name: &FileName,
    code: &str,
    critique: &str,
    issues: &[Value],
) -> Result<String, ForgeError> {
    let stage = StageKind::Refinement;
    call(
        provider,
        stage,
        prompts::REFINEMENT,
        prompts::refinement_payload(code, critique, issues),
        OutputMode::Text,
    )
    .await
    .map_err(|e| ForgeError::collaborator_for(stage, name, e))
}
