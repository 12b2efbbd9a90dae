//! SBOM Forge LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::GenerationProvider`] trait for OpenAI-compatible
//! chat-completions endpoints. Additional providers are added as new modules
//! in this crate without any changes to the `pipeline` or `nodes` crates.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing,
//! `Retry-After` handling, and exponential back-off live here. The orchestrator
//! sees only [`pipeline::GenerationProvider`] and never retries on its own.

pub mod config;
pub mod openai;

pub use config::{ConfigError, ProviderConfig, DEFAULT_BASE_URL, MAX_RETRIES_LIMIT};
pub use openai::OpenAiProvider;
