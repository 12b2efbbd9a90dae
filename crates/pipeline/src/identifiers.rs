//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging a [`FileName`]
//! (the manifest key) with an [`ArtifactPath`] (where the file lands on disk) even
//! though both are strings under the hood.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a string newtype that can never hold a blank value.
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps `value`, or returns `None` when it is empty or all whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (!value.trim().is_empty()).then_some(Self(value))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline execution run (one invocation of `generate`).
///
/// Generated fresh for every run and recorded on the run's root span so all
/// collaborator calls made on its behalf can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a fresh random (v4) run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (manifest entries)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a file within a scaffold manifest (e.g. `"main.py"`).
    ///
    /// This is the key of every per-file map the orchestrator maintains; it is
    /// unique within one manifest.
    FileName
}

string_id! {
    /// A file-system path relative to the output root (e.g. `"src/main.py"`).
    ArtifactPath
}

impl ArtifactPath {
    /// Returns `true` if the path stays beneath whatever root it is joined to.
    ///
    /// Absolute paths, drive prefixes, and `..` components are rejected.
    pub fn is_contained(&self) -> bool {
        Path::new(&self.0)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }

    /// Returns the path as a [`Path`].
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}
