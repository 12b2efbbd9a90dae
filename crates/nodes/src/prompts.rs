//! Instructions and user payloads for every collaborator call.
//!
//! Payloads are laid out as `<< Section >>` blocks followed by a single cue
//! line naming the expected answer. JSON context is rendered pretty-printed so
//! the collaborator sees the same structure the previous stage produced.

use pipeline::{
    DependencyBlueprint, DependencyDescription, FileRecord, FileSpec, ProjectArtifactSet,
    ScaffoldManifest,
};
use serde::Serialize;
use serde_json::Value;

/// Stage 1: raw SBOM to a JSON dependency description.
pub const SBOM_INTERPRETATION: &str = "\
<< Task >>
Parse the CycloneDX SBOM you are given and return a structured description of the project.

<< Instructions >>
1. Extract project metadata: project_name, version, description, authors, licenses. Use null for anything absent.
2. List every dependency with name, version, type (direct or transitive), hashes, and licenses. Nest transitive dependencies under the dependency that pulls them in as `children`.
3. Record any missing or malformed SBOM data under validation.errors as {field, issue} objects.

<< Desired Output >>
A single JSON object with the keys `metadata`, `dependencies`, and `validation`. Output JSON only.";

/// Stage 2: dependency description to a JSON dependency blueprint.
pub const BLUEPRINT: &str = "\
<< Task >>
Turn a parsed SBOM into a dependency blueprint that a code generator can follow.

<< Instructions >>
1. Build the dependency hierarchy, separating direct from transitive dependencies.
2. Derive an initialization order that respects every parent/child relationship.
3. For each dependency describe how the project uses it: the modules it belongs in, how it is configured, and how it is initialized.
4. Flag version conflicts, circular relationships, and missing information under validation.

<< Desired Output >>
A single JSON object with the keys `hierarchy`, `initialization_order`, `usage_patterns`, and `validation`. Output JSON only.";

/// Stage 3: blueprint to the JSON file plan (`{"files": [...]}`).
pub const SCAFFOLD: &str = "\
<< Task >>
Plan the source files of a project from its dependency blueprint.

<< Instructions >>
1. Choose a file layout that fits the project's language and dependencies.
2. Give every file a unique name including its extension, a path relative to the project root, a short description of its role, and the dependencies it uses.
3. Include configuration and dependency-manifest files where the ecosystem needs them.

<< Desired Output >>
{
  \"files\": [
    {
      \"name\": \"string\",
      \"path\": \"string\",
      \"role\": \"string\",
      \"dependencies\": [{ \"name\": \"string\", \"type\": \"direct|transitive\", \"usage\": \"string\" }]
    }
  ]
}
Output JSON only.";

/// Stage 4: first version of one file, as plain text.
pub const FILE_GENERATION: &str = "\
<< Task >>
Write the complete content of one file of a project described by its scaffolding.

<< Instructions >>
1. Implement the file's role fully; no placeholders.
2. Import, initialize, and use every dependency assigned to the file, matching the versions in the scaffolding.
3. Keep the file consistent with the names and paths of the other files in the scaffolding.
4. Follow the conventions of the file's language and document non-obvious code.

<< Desired Output >>
Only the file content. No explanations, no surrounding prose, no code fences.";

/// Per-file review, as plain text.
pub const FILE_CRITIQUE: &str = "\
<< Task >>
Review one generated file and list the problems that must be fixed.

<< Instructions >>
1. Look for logic errors, behaviour that does not match the file's role, and unhandled failure cases.
2. Check that every dependency is imported and used correctly and that nothing unused remains.
3. Point out inconsistent naming, missing documentation, and needless complexity.
4. Reference the relevant lines and give a concrete fix for each problem.

<< Desired Output >>
A list of issues, each with line, type, description, and suggestion.";

/// Cross-file review, as JSON keyed by file name.
pub const GLOBAL_CRITIQUE: &str = "\
<< Task >>
Review all files of a generated project together and report problems that span files.

<< Instructions >>
1. Check that imports between files resolve and that calls match the definitions they target.
2. Check that shared names, constants, and configuration agree across files.
3. Check that every file the scaffolding lists is present and fulfils its role.
4. Check that every dependency is used where the scaffolding says it is.

<< Desired Output >>
{
  \"feedbacks\": [
    { \"file\": \"string (file name exactly as in the scaffolding)\", \"issues\": [\"string\"] }
  ]
}
Output JSON only.";

/// Rewrite of one file from both kinds of feedback, as plain text.
pub const REFINEMENT: &str = "\
<< Task >>
Rewrite one file so that it resolves the feedback it received.

<< Instructions >>
1. The feedback is a two-element list: the single-file review first, then the cross-file issues for this file.
2. Fix every reported problem without dropping working functionality.
3. Keep imports, names, and signatures consistent with the rest of the project.

<< Desired Output >>
Only the complete rewritten file content. No explanations, no surrounding prose, no code fences.";

fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn section(out: &mut String, title: &str, body: &str) {
    out.push_str("<< ");
    out.push_str(title);
    out.push_str(" >>\n");
    out.push_str(body);
    out.push_str("\n\n");
}

/// The SBOM text, verbatim.
pub fn sbom_payload(sbom: &str) -> String {
    let mut out = String::new();
    section(&mut out, "CycloneDX SBOM", sbom);
    out.push_str("Parsed SBOM:");
    out
}

/// The dependency description produced by stage 1.
pub fn blueprint_payload(description: &DependencyDescription) -> String {
    let mut out = String::new();
    section(&mut out, "Parsed SBOM Data", &render(description.as_value()));
    out.push_str("Dependency Blueprint:");
    out
}

/// The blueprint produced by stage 2.
pub fn scaffold_payload(blueprint: &DependencyBlueprint) -> String {
    let mut out = String::new();
    section(&mut out, "Dependency Blueprint", &render(blueprint.as_value()));
    out.push_str("Source Code Scaffolding:");
    out
}

/// One manifest entry plus the whole scaffold for context.
pub fn file_generation_payload(spec: &FileSpec, manifest: &ScaffoldManifest) -> String {
    let mut out = String::new();
    section(&mut out, "File Name", spec.name.as_str());
    section(&mut out, "File Role", &spec.role);
    section(&mut out, "File Dependencies", &render(&spec.dependencies));
    section(&mut out, "Source Code Scaffolding", &render(manifest.raw()));
    out.push_str("Generated Code:");
    out
}

/// The current code of one file with its role, dependencies, and the scaffold.
pub fn file_critique_payload(record: &FileRecord, manifest: &ScaffoldManifest) -> String {
    let mut out = String::new();
    section(&mut out, "File Role", &record.role);
    section(&mut out, "File Dependencies", &render(&record.dependencies));
    section(&mut out, "Generated Code", &record.code);
    section(&mut out, "Source Code Scaffolding", &render(manifest.raw()));
    out.push_str("Feedback:");
    out
}

/// Every current file, keyed by name, plus the scaffold.
pub fn global_critique_payload(
    artifacts: &ProjectArtifactSet,
    manifest: &ScaffoldManifest,
) -> String {
    let mut out = String::new();
    section(&mut out, "All Generated Codes", &render(artifacts));
    section(&mut out, "Source Code Scaffolding", &render(manifest.raw()));
    out.push_str("Global Feedback:");
    out
}

/// The feedback block is always `[per-file critique, cross-file issues]`.
pub fn refinement_payload(code: &str, critique: &str, issues: &[Value]) -> String {
    let feedbacks = (critique, issues);
    let mut out = String::new();
    section(&mut out, "Original Code", code);
    section(&mut out, "Feedbacks", &render(&feedbacks));
    out.push_str("Refined Code:");
    out
}
