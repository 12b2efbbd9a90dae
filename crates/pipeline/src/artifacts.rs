//! Per-run mutable state: generated files and the feedback collected about them.
//!
//! All maps are keyed by [`FileName`]. Results of concurrent collaborator calls
//! are folded in by key, never by completion order, so the final state does
//! not depend on which call finished first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ArtifactPath, FeedbackMergePolicy, FileName, FileSpec, GenerationError, ScaffoldManifest,
};

// ---------------------------------------------------------------------------
// Generated files
// ---------------------------------------------------------------------------

/// The orchestrator's state for one generated file.
///
/// Only `code` changes after creation, and only through
/// [`ProjectArtifactSet::apply_rewrites`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Current file content.
    pub code: String,
    /// Role copied from the manifest entry.
    pub role: String,
    /// Dependencies copied from the manifest entry.
    pub dependencies: Vec<Value>,
    /// Destination relative to the output root.
    pub path: ArtifactPath,
}

/// Every generated file of a run, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectArtifactSet {
    records: BTreeMap<FileName, FileRecord>,
}

impl ProjectArtifactSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first generated version of a manifest entry.
    pub fn insert(&mut self, spec: &FileSpec, code: String) {
        self.records.insert(
            spec.name.clone(),
            FileRecord {
                code,
                role: spec.role.clone(),
                dependencies: spec.dependencies.clone(),
                path: spec.path.clone(),
            },
        );
    }

    /// Replaces the code of every named file with its rewrite.
    ///
    /// Names not already in the set are ignored.
    pub fn apply_rewrites(&mut self, rewrites: BTreeMap<FileName, String>) {
        for (name, code) in rewrites {
            if let Some(record) = self.records.get_mut(&name) {
                record.code = code;
            }
        }
    }

    /// Looks up one file.
    pub fn get(&self, name: &FileName) -> Option<&FileRecord> {
        self.records.get(name)
    }

    /// Iterates files in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileName, &FileRecord)> {
        self.records.iter()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no files were generated.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Latest critique text per file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerFileFeedback {
    entries: BTreeMap<FileName, String>,
}

impl PerFileFeedback {
    /// Replaces every entry with this round's critiques.
    pub fn replace(&mut self, entries: BTreeMap<FileName, String>) {
        self.entries = entries;
    }

    /// Critique for `name`, or `""` if none was recorded.
    pub fn text_for(&self, name: &FileName) -> &str {
        self.entries.get(name).map(String::as_str).unwrap_or("")
    }

    /// Number of files with a critique.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no critiques are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cross-file issues per file, as reported by the global critique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalFeedback {
    issues: BTreeMap<FileName, Vec<Value>>,
}

impl GlobalFeedback {
    /// Interprets a global-critique document for the files in `manifest`.
    ///
    /// Two shapes are accepted:
    ///
    /// - `{"feedbacks": [{"file": "a.py", "issues": [...]}, ...]}`
    /// - `{"a.py": {"issues": [...]}, ...}`, where a bare `{"a.py": [...]}`
    ///   array is taken as the issues list itself
    ///
    /// Entries naming files outside the manifest are skipped. A missing or
    /// null `issues` value counts as no issues.
    pub fn from_critique(
        document: &Value,
        manifest: &ScaffoldManifest,
    ) -> Result<Self, GenerationError> {
        let root = document
            .as_object()
            .ok_or_else(|| GenerationError::malformed("global critique is not a JSON object"))?;

        let mut issues = BTreeMap::new();
        match root.get("feedbacks") {
            Some(list) => {
                let list = list.as_array().ok_or_else(|| {
                    GenerationError::malformed("global critique 'feedbacks' is not an array")
                })?;
                for item in list {
                    let file = item
                        .get("file")
                        .and_then(Value::as_str)
                        .and_then(FileName::new)
                        .ok_or_else(|| {
                            GenerationError::malformed("global critique entry has no 'file' name")
                        })?;
                    if !manifest.contains(&file) {
                        continue;
                    }
                    let entry = issues_of(item, &file)?;
                    issues.insert(file, entry);
                }
            }
            None => {
                for (key, item) in root {
                    let Some(file) = FileName::new(key.as_str()) else {
                        continue;
                    };
                    if !manifest.contains(&file) {
                        continue;
                    }
                    let entry = match item {
                        Value::Array(list) => list.clone(),
                        Value::Null => Vec::new(),
                        Value::Object(_) => issues_of(item, &file)?,
                        _ => {
                            return Err(GenerationError::malformed(format!(
                                "global critique entry for '{file}' is neither an object nor an array"
                            )))
                        }
                    };
                    issues.insert(file, entry);
                }
            }
        }
        Ok(Self { issues })
    }

    /// Folds the latest critique into the accumulated feedback.
    pub fn merge(&mut self, latest: GlobalFeedback, policy: FeedbackMergePolicy) {
        if policy == FeedbackMergePolicy::Fresh {
            self.issues.clear();
        }
        self.issues.extend(latest.issues);
    }

    /// Issues for `name`; empty if the file has never been mentioned.
    pub fn issues_for(&self, name: &FileName) -> &[Value] {
        self.issues.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of files with recorded issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns `true` if no file has recorded issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

fn issues_of(item: &Value, file: &FileName) -> Result<Vec<Value>, GenerationError> {
    match item.get("issues") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => Ok(list.clone()),
        Some(_) => Err(GenerationError::malformed(format!(
            "global critique issues for '{file}' are not an array"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Materialization port
// ---------------------------------------------------------------------------

/// Destination for final artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes `content` as the complete body of `root/path`, creating missing
    /// parent directories and replacing any existing file.
    ///
    /// Returns the location written.
    async fn write_artifact(
        &self,
        root: &Path,
        path: &ArtifactPath,
        content: &str,
    ) -> std::io::Result<PathBuf>;
}
