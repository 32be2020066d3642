//! Typed configuration and path helpers.
//!
//! Figment merges `config.toml` + `config.<env>.toml` + `RAGSTORE_*` env vars
//! (`__` separates nested keys, e.g. `RAGSTORE_STORE__URI`). Every section
//! rejects unknown keys so a misspelt option fails at startup.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "RAGSTORE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub store: StoreConfig,
    pub dense: DenseConfig,
    pub sparse: SparseConfig,
    pub ingest: IngestConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// LanceDB location: a local directory or a remote URI.
    pub uri: String,
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { uri: "data/ragstore".to_string(), create_if_missing: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenseProvider {
    #[serde(rename = "bge-m3")]
    BgeM3,
    #[serde(rename = "hashing")]
    Hashing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Metal,
    Cuda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    Cls,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DenseConfig {
    pub provider: DenseProvider,
    pub model_id: String,
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub device: DeviceKind,
    /// Maximum number of tokens fed to the model; longer inputs are truncated.
    pub max_len: usize,
    pub pooling: Pooling,
    /// Output dimension of the hashing provider. The BGE-M3 dimension comes
    /// from the model config.
    pub dim: usize,
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            provider: DenseProvider::BgeM3,
            model_id: "BAAI/bge-m3".to_string(),
            model_dir: None,
            device: DeviceKind::Cpu,
            max_len: 512,
            pooling: Pooling::Cls,
            dim: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SparseConfig {
    pub k1: f32,
    pub b: f32,
    /// Average document length (in tokens) assumed when no corpus
    /// statistics are loaded.
    pub avg_doc_len: f32,
    /// JSON file with fitted corpus statistics.
    pub stats_path: Option<String>,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, avg_doc_len: 64.0, stats_path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 1000, chunk_size: 1000, overlap: 200, show_progress: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub top_k: usize,
    /// RRF smoothing constant `K` in `1 / (K + rank)`.
    pub rrf_k: f32,
    /// Each field search fetches `top_k * over_fetch` candidates before fusion.
    pub over_fetch: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 3, rrf_k: 60.0, over_fetch: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub dir: String,
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), dir: "logs".to_string(), to_file: true }
    }
}

impl Settings {
    /// Load for the environment named by `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => return Err(Error::InvalidConfig(format!("unknown RUST_ENV '{other}'"))),
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extract from an arbitrary figment and validate.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if self.store.uri.trim().is_empty() { return invalid("store.uri must not be empty".into()); }
        if self.dense.max_len == 0 { return invalid("dense.max_len must be >= 1".into()); }
        if self.dense.provider == DenseProvider::Hashing && self.dense.dim == 0 { return invalid("dense.dim must be >= 1".into()); }
        if !(self.sparse.k1.is_finite() && self.sparse.k1 >= 0.0) { return invalid(format!("sparse.k1 must be >= 0, got {}", self.sparse.k1)); }
        if !(0.0..=1.0).contains(&self.sparse.b) { return invalid(format!("sparse.b must be within [0, 1], got {}", self.sparse.b)); }
        if !(self.sparse.avg_doc_len.is_finite() && self.sparse.avg_doc_len > 0.0) { return invalid("sparse.avg_doc_len must be > 0".into()); }
        if self.ingest.batch_size == 0 { return invalid("ingest.batch_size must be >= 1".into()); }
        if self.ingest.chunk_size == 0 { return invalid("ingest.chunk_size must be >= 1".into()); }
        if self.ingest.overlap > self.ingest.chunk_size {
            return invalid(format!("ingest.overlap ({}) must not exceed ingest.chunk_size ({})", self.ingest.overlap, self.ingest.chunk_size));
        }
        if self.search.top_k == 0 { return invalid("search.top_k must be >= 1".into()); }
        if !(self.search.rrf_k.is_finite() && self.search.rrf_k > 0.0) { return invalid("search.rrf_k must be > 0".into()); }
        if self.search.over_fetch == 0 { return invalid("search.over_fetch must be >= 1".into()); }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

