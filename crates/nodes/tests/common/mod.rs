//! Scripted in-memory generation collaborator shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{CompletionRequest, GenerationError, GenerationProvider, OutputMode, StageKind};
use serde_json::{json, Value};

/// Extracts the body of a `<< title >>` section from a payload.
pub fn section<'a>(payload: &'a str, title: &str) -> Option<&'a str> {
    let marker = format!("<< {title} >>\n");
    let start = payload.find(&marker)? + marker.len();
    let rest = &payload[start..];
    let end = rest.find("\n\n").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Builds a scaffold document with one entry per `(name, path)` pair.
pub fn scaffold(files: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = files
        .iter()
        .map(|(name, path)| {
            json!({ "name": name, "path": path, "role": format!("role of {name}"), "dependencies": [] })
        })
        .collect();
    json!({ "files": entries })
}

/// A collaborator whose answers are derived from the request payload.
///
/// - File generation answers `gen:<name>`.
/// - File critique answers `critique of <code>`.
/// - Global critique answers one issue `global:<name>:<round>` per manifest
///   file, unless a scripted document is queued.
/// - Refinement answers `rewrite #<n> of <name>`, counting per file.
pub struct ScriptedProvider {
    scaffold: Value,
    names: Vec<String>,
    requests: Mutex<Vec<CompletionRequest>>,
    global_docs: Mutex<VecDeque<Value>>,
    global_rounds: Mutex<u32>,
    rewrites: Mutex<HashMap<String, u32>>,
    overrides: Mutex<HashMap<StageKind, String>>,
    failures: Mutex<Vec<(StageKind, Option<String>)>>,
    delays: HashMap<String, Duration>,
}

impl ScriptedProvider {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            scaffold: scaffold(files),
            names: files.iter().map(|(name, _)| name.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
            global_docs: Mutex::new(VecDeque::new()),
            global_rounds: Mutex::new(0),
            rewrites: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
            failures: Mutex::new(Vec::new()),
            delays: HashMap::new(),
        }
    }

    /// Uses `scaffold` verbatim as the planner's answer.
    pub fn with_scaffold(mut self, scaffold: Value) -> Self {
        self.scaffold = scaffold;
        self
    }

    /// Delays every answer about `name` by `delay`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Answers the next global critique with `document`.
    pub fn queue_global(&self, document: Value) {
        self.global_docs.lock().unwrap().push_back(document);
    }

    /// Answers every call of `stage` with `raw`.
    pub fn override_stage(&self, stage: StageKind, raw: &str) {
        self.overrides.lock().unwrap().insert(stage, raw.to_string());
    }

    /// Fails calls of `stage`, optionally only those about `file`.
    pub fn fail_on(&self, stage: StageKind, file: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .push((stage, file.map(str::to_string)));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, stage: StageKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.stage == stage)
            .count()
    }

    pub fn stages(&self) -> Vec<StageKind> {
        self.requests.lock().unwrap().iter().map(|r| r.stage).collect()
    }

    fn file_of(&self, request: &CompletionRequest) -> Option<String> {
        let haystack = match request.stage {
            StageKind::FileGeneration => section(&request.payload, "File Name")?,
            StageKind::FileCritique => section(&request.payload, "Generated Code")?,
            StageKind::Refinement => section(&request.payload, "Original Code")?,
            _ => return None,
        };
        self.names
            .iter()
            .find(|name| haystack.ends_with(name.as_str()))
            .cloned()
    }

    fn answer(&self, request: &CompletionRequest, file: Option<&str>) -> String {
        if let Some(raw) = self.overrides.lock().unwrap().get(&request.stage) {
            return raw.clone();
        }
        match request.stage {
            StageKind::SbomInterpretation => json!({ "metadata": { "project_name": "demo" } }).to_string(),
            StageKind::Blueprint => json!({ "initialization_order": [] }).to_string(),
            StageKind::Scaffold => self.scaffold.to_string(),
            StageKind::FileGeneration => format!("gen:{}", file.unwrap_or("?")),
            StageKind::FileCritique => format!(
                "critique of {}",
                section(&request.payload, "Generated Code").unwrap_or("")
            ),
            StageKind::GlobalCritique => {
                let mut round = self.global_rounds.lock().unwrap();
                *round += 1;
                if let Some(doc) = self.global_docs.lock().unwrap().pop_front() {
                    return doc.to_string();
                }
                let feedbacks: Vec<Value> = self
                    .names
                    .iter()
                    .map(|name| json!({ "file": name, "issues": [format!("global:{name}:{round}")] }))
                    .collect();
                json!({ "feedbacks": feedbacks }).to_string()
            }
            StageKind::Refinement => {
                let name = file.unwrap_or("?").to_string();
                let mut rewrites = self.rewrites.lock().unwrap();
                let n = rewrites.entry(name.clone()).or_insert(0);
                *n += 1;
                format!("rewrite #{n} of {name}")
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let json_stages = [
            StageKind::SbomInterpretation,
            StageKind::Blueprint,
            StageKind::Scaffold,
            StageKind::GlobalCritique,
        ];
        let expected_mode = if json_stages.contains(&request.stage) {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        assert_eq!(request.mode, expected_mode, "wrong mode for {}", request.stage);

        self.requests.lock().unwrap().push(request.clone());
        let file = self.file_of(&request);

        if let Some(delay) = file.as_ref().and_then(|f| self.delays.get(f)) {
            tokio::time::sleep(*delay).await;
        }

        let fails = self.failures.lock().unwrap().iter().any(|(stage, target)| {
            *stage == request.stage && (target.is_none() || target.as_deref() == file.as_deref())
        });
        if fails {
            return Err(GenerationError::Api {
                status: 500,
                message: format!("scripted failure for {}", request.stage),
                retry_after: None,
            });
        }

        Ok(self.answer(&request, file.as_deref()))
    }
}
