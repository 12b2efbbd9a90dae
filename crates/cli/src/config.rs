//! `.sbomforge/config.toml` loading and validation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use llm::ProviderConfig;
use nodes::{DEFAULT_OUTPUT_ROOT, DEFAULT_REFINEMENT_ROUNDS};
use pipeline::{FeedbackMergePolicy, ForgeError};
use serde::Deserialize;

/// Config file consulted when `--config` is not given. Missing is not an error.
pub const DEFAULT_CONFIG_PATH: &str = ".sbomforge/config.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Generation endpoint, model, and retry settings.
    pub provider: ProviderConfig,
    /// Run shape: rounds, destination, and feedback merging.
    pub pipeline: PipelineSettings,
    /// Log format and optional span export.
    pub telemetry: TelemetrySettings,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Critique and rewrite rounds after the first generation pass.
    pub refinement_rounds: u32,
    /// Directory the generated files are written under.
    pub output_root: PathBuf,
    /// How cross-file issues carry over between rounds.
    pub global_feedback: FeedbackMergePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            refinement_rounds: DEFAULT_REFINEMENT_ROUNDS,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            global_feedback: FeedbackMergePolicy::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// `[telemetry]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySettings {
    /// Format of log lines written to stderr.
    pub log_format: LogFormat,
    /// OTLP gRPC endpoint; span export is disabled when absent.
    pub otlp_endpoint: Option<String>,
}

impl CliConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicitly named file must exist; the default one may be absent, in
    /// which case built-in defaults apply.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)
                .with_context(|| format!("failed to load {}", path.display())),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        }
    }

    /// Rejects settings that cannot produce a usable run.
    pub fn validate(&self) -> Result<(), ForgeError> {
        self.provider.validate()?;
        if self.pipeline.output_root.as_os_str().is_empty() {
            return Err(invalid("pipeline.output_root must not be empty"));
        }
        if let Some(endpoint) = &self.telemetry.otlp_endpoint {
            if endpoint.trim().is_empty() {
                return Err(invalid("telemetry.otlp_endpoint must not be empty when set"));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ForgeError {
    ForgeError::Configuration {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CliConfig::from_toml("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.pipeline.refinement_rounds, 3);
        assert_eq!(config.pipeline.output_root, PathBuf::from("generated_code"));
        assert_eq!(config.pipeline.global_feedback, FeedbackMergePolicy::Sticky);
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_every_section() {
        let config = CliConfig::from_toml(
            r#"
            [provider]
            model = "gpt-4o-mini"
            base_url = "http://localhost:11434/v1"
            max_retries = 5

            [pipeline]
            refinement_rounds = 1
            output_root = "out"
            global_feedback = "fresh"

            [telemetry]
            log_format = "json"
            otlp_endpoint = "http://localhost:4317"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.max_retries, 5);
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.pipeline.refinement_rounds, 1);
        assert_eq!(config.pipeline.output_root, PathBuf::from("out"));
        assert_eq!(config.pipeline.global_feedback, FeedbackMergePolicy::Fresh);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(
            config.telemetry.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let err = CliConfig::from_toml("[provider]\nmax_retries = 50\n").unwrap_err();
        assert!(err.to_string().contains("max_retries"));

        assert!(CliConfig::from_toml("[pipeline]\nglobal_feedback = \"merged\"\n").is_err());
        assert!(CliConfig::from_toml("[pipeline]\nrounds = 2\n").is_err());
        assert!(CliConfig::from_toml("[telemetry]\notlp_endpoint = \" \"\n").is_err());
    }

    #[test]
    fn validation_failures_are_configuration_errors() {
        let mut config = CliConfig::default();
        config.provider.max_retries = 50;
        assert!(matches!(
            config.validate(),
            Err(ForgeError::Configuration { message }) if message.contains("max_retries")
        ));

        let mut config = CliConfig::default();
        config.pipeline.output_root = PathBuf::new();
        assert!(matches!(
            config.validate(),
            Err(ForgeError::Configuration { message }) if message.contains("output_root")
        ));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(CliConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nrefinement_rounds = 0").unwrap();
        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.refinement_rounds, 0);
    }
}
