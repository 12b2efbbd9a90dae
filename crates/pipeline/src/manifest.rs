//! The scaffold manifest: the ordered plan of files to generate.
//!
//! The scaffold planner answers with a JSON document of the form
//!
//! ```json
//! { "files": [ { "name": "main.py", "path": "src/main.py",
//!                "role": "entry point", "dependencies": [ ... ] } ] }
//! ```
//!
//! [`ScaffoldManifest::from_value`] validates the four fields the orchestrator
//! relies on and keeps the raw document so later stages can embed it verbatim.
//! Everything else in the document, including the dependency entries, stays
//! opaque.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ArtifactPath, FileName};

/// A manifest entry that cannot be acted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// The scaffold document is not a JSON object.
    #[error("scaffold document is not a JSON object")]
    NotAnObject,

    /// The scaffold document has no `files` array.
    #[error("scaffold document has no 'files' array")]
    MissingFiles,

    /// An entry is not a JSON object.
    #[error("entry {index} is not a JSON object")]
    EntryNotAnObject {
        /// Position of the entry in the `files` array.
        index: usize,
    },

    /// A required field is absent or null.
    #[error("entry {index} is missing required field '{field}'")]
    MissingField {
        /// Position of the entry in the `files` array.
        index: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A required field has the wrong type or an empty value.
    #[error("entry {index} field '{field}' must be {expected}")]
    InvalidField {
        /// Position of the entry in the `files` array.
        index: usize,
        /// Name of the offending field.
        field: &'static str,
        /// Description of the accepted values.
        expected: &'static str,
    },

    /// Two entries share a name.
    #[error("file name '{name}' appears more than once")]
    DuplicateName {
        /// The repeated name.
        name: FileName,
    },

    /// An entry's path would escape the output root.
    #[error("file '{name}' has path '{path}' outside the output root")]
    UnsafePath {
        /// Entry name.
        name: FileName,
        /// Offending path.
        path: String,
    },
}

/// One file the scaffold planner asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    /// Unique key within the manifest.
    pub name: FileName,
    /// Free-text description of the file's purpose.
    pub role: String,
    /// Opaque dependency entries assigned to this file.
    pub dependencies: Vec<Value>,
    /// Destination relative to the output root.
    pub path: ArtifactPath,
}

/// The validated, immutable file plan for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaffoldManifest {
    raw: Value,
    files: Vec<FileSpec>,
}

impl ScaffoldManifest {
    /// Validates a scaffold document.
    ///
    /// Fails on the first problem found, before anything is generated.
    pub fn from_value(raw: Value) -> Result<Self, ManifestError> {
        let root = raw.as_object().ok_or(ManifestError::NotAnObject)?;
        let entries = root
            .get("files")
            .and_then(Value::as_array)
            .ok_or(ManifestError::MissingFiles)?;

        let mut seen = HashSet::with_capacity(entries.len());
        let mut files = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let entry = entry
                .as_object()
                .ok_or(ManifestError::EntryNotAnObject { index })?;
            let spec = parse_entry(index, entry)?;
            if !seen.insert(spec.name.clone()) {
                return Err(ManifestError::DuplicateName { name: spec.name });
            }
            files.push(spec);
        }

        Ok(Self { raw, files })
    }

    /// The scaffold document exactly as the planner returned it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Entries in manifest order.
    pub fn files(&self) -> &[FileSpec] {
        &self.files
    }

    /// Returns `true` if the manifest has an entry named `name`.
    pub fn contains(&self, name: &FileName) -> bool {
        self.files.iter().any(|spec| &spec.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the planner asked for no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn parse_entry(index: usize, entry: &Map<String, Value>) -> Result<FileSpec, ManifestError> {
    let name = required_str(index, entry, "name")?;
    let name = FileName::new(name).ok_or(ManifestError::InvalidField {
        index,
        field: "name",
        expected: "a non-empty string",
    })?;

    let path = required_str(index, entry, "path")?;
    let path = ArtifactPath::new(path).ok_or(ManifestError::InvalidField {
        index,
        field: "path",
        expected: "a non-empty string",
    })?;
    if !path.is_contained() {
        return Err(ManifestError::UnsafePath {
            name,
            path: path.to_string(),
        });
    }

    let role = required_str(index, entry, "role")?.to_string();

    let dependencies = match entry.get("dependencies") {
        None | Some(Value::Null) => {
            return Err(ManifestError::MissingField {
                index,
                field: "dependencies",
            })
        }
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(ManifestError::InvalidField {
                index,
                field: "dependencies",
                expected: "an array",
            })
        }
    };

    Ok(FileSpec {
        name,
        role,
        dependencies,
        path,
    })
}

fn required_str<'a>(
    index: usize,
    entry: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ManifestError> {
    match entry.get(field) {
        None | Some(Value::Null) => Err(ManifestError::MissingField { index, field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ManifestError::InvalidField {
            index,
            field,
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(name: &str, path: &str) -> Value {
        json!({ "name": name, "path": path, "role": "module", "dependencies": [] })
    }

    #[test]
    fn parses_entries_in_order() {
        let raw = json!({
            "files": [
                { "name": "main.py", "path": "src/main.py", "role": "entry point",
                  "dependencies": [{ "name": "requests", "type": "direct", "usage": "http" }] },
                entry("util.py", "src/util.py"),
            ],
            "validation": { "is_valid": true }
        });
        let manifest = ScaffoldManifest::from_value(raw.clone()).unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.files()[0].name.as_str(), "main.py");
        assert_eq!(manifest.files()[0].role, "entry point");
        assert_eq!(manifest.files()[0].dependencies.len(), 1);
        assert_eq!(manifest.files()[1].path.as_str(), "src/util.py");
        assert_eq!(manifest.raw(), &raw);
    }

    #[test]
    fn empty_file_list_is_valid() {
        let manifest = ScaffoldManifest::from_value(json!({ "files": [] })).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn rejects_documents_without_files() {
        assert_eq!(
            ScaffoldManifest::from_value(json!([])).unwrap_err(),
            ManifestError::NotAnObject
        );
        assert_eq!(
            ScaffoldManifest::from_value(json!({ "entries": [] })).unwrap_err(),
            ManifestError::MissingFiles
        );
    }

    #[test]
    fn reports_each_missing_field() {
        for field in ["name", "path", "role", "dependencies"] {
            let mut value = entry("a.py", "a.py");
            value.as_object_mut().unwrap().remove(field);
            let err = ScaffoldManifest::from_value(json!({ "files": [value] })).unwrap_err();
            assert_eq!(err, ManifestError::MissingField { index: 0, field });
        }
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let raw = json!({ "files": [
            entry("a.py", "a.py"),
            { "name": "b.py", "path": "b.py", "role": "x", "dependencies": "serde" },
        ]});
        assert_eq!(
            ScaffoldManifest::from_value(raw).unwrap_err(),
            ManifestError::InvalidField {
                index: 1,
                field: "dependencies",
                expected: "an array"
            }
        );

        let raw = json!({ "files": [{ "name": "", "path": "a", "role": "x", "dependencies": [] }] });
        assert!(matches!(
            ScaffoldManifest::from_value(raw).unwrap_err(),
            ManifestError::InvalidField { field: "name", .. }
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let raw = json!({ "files": [entry("a.py", "a.py"), entry("a.py", "other/a.py")] });
        assert_eq!(
            ScaffoldManifest::from_value(raw).unwrap_err(),
            ManifestError::DuplicateName {
                name: FileName::new("a.py").unwrap()
            }
        );
    }

    #[test]
    fn rejects_paths_outside_the_root() {
        let raw = json!({ "files": [entry("a.py", "../a.py")] });
        assert!(matches!(
            ScaffoldManifest::from_value(raw).unwrap_err(),
            ManifestError::UnsafePath { .. }
        ));
    }
}
