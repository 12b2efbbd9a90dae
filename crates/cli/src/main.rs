//! SBOM Forge CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `.sbomforge/config.toml` (or `--config`),
//!    validate it, and apply command-line overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with a JSON or
//!    pretty layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter. All spans and events emitted by the workspace flow through it.
//! 3. **Construct infrastructure**: create the [`llm::OpenAiProvider`] and
//!    inject it into a [`nodes::PipelineExecutor`].
//! 4. **Run once**: read the SBOM document, generate the project, print the
//!    [`pipeline::RunReport`] as JSON on stdout, and exit non-zero on failure.

mod config;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use llm::OpenAiProvider;
use nodes::PipelineExecutor;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use crate::config::{CliConfig, LogFormat};

/// Generate a multi-file project from a CycloneDX SBOM.
#[derive(Debug, Parser)]
#[command(name = "sbomforge", version, about)]
struct Args {
    /// Configuration file [default: .sbomforge/config.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// SBOM document to read, or `-` for stdin
    #[arg(long, default_value = "-")]
    sbom: String,

    /// Number of refinement rounds
    #[arg(long)]
    rounds: Option<u32>,

    /// Directory the generated files are written under
    #[arg(long)]
    output: Option<PathBuf>,

    /// Model identifier sent to the provider
    #[arg(long)]
    model: Option<String>,

    /// Log line format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(rounds) = self.rounds {
            config.pipeline.refinement_rounds = rounds;
        }
        if let Some(output) = &self.output {
            config.pipeline.output_root = output.clone();
        }
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(format) = self.log_format {
            config.telemetry.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match telemetry::init(&config.telemetry) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<CliConfig> {
    let mut config = CliConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(args: &Args, config: &CliConfig) -> anyhow::Result<()> {
    let sbom = read_sbom(&args.sbom).await?;

    let provider = OpenAiProvider::from_env(config.provider.clone())
        .context("failed to construct generation provider")?;
    let executor = PipelineExecutor::new(Arc::new(provider))
        .with_merge_policy(config.pipeline.global_feedback);

    info!(
        model = %config.provider.model,
        rounds = config.pipeline.refinement_rounds,
        output_root = %config.pipeline.output_root.display(),
        "starting generation"
    );
    let report = executor
        .generate(
            &sbom,
            config.pipeline.refinement_rounds,
            &config.pipeline.output_root,
        )
        .await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render run report")?
    );
    Ok(())
}

async fn read_sbom(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read SBOM from stdin")?;
        return Ok(text);
    }
    let path = Path::new(source);
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read SBOM from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let args = Args::parse_from([
            "sbomforge",
            "--rounds",
            "0",
            "--output",
            "out",
            "--model",
            "local",
            "--log-format",
            "json",
        ]);
        let mut config = CliConfig::default();
        args.apply(&mut config);
        assert_eq!(config.pipeline.refinement_rounds, 0);
        assert_eq!(config.pipeline.output_root, PathBuf::from("out"));
        assert_eq!(config.provider.model, "local");
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(args.sbom, "-");
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let args = Args::parse_from(["sbomforge", "--sbom", "bom.json"]);
        let mut config = CliConfig::default();
        config.pipeline.refinement_rounds = 7;
        args.apply(&mut config);
        assert_eq!(config.pipeline.refinement_rounds, 7);
        assert_eq!(args.sbom, "bom.json");
    }

    #[tokio::test]
    async fn reads_sbom_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.json");
        std::fs::write(&path, r#"{"bomFormat":"CycloneDX"}"#).unwrap();
        let text = read_sbom(path.to_str().unwrap()).await.unwrap();
        assert!(text.contains("CycloneDX"));
        assert!(read_sbom(dir.path().join("none.json").to_str().unwrap())
            .await
            .is_err());
    }
}
