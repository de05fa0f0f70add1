//! Configuration loading for paperscout.
//! Reads paperscout.toml from the current directory or the path in the
//! PAPERSCOUT_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "PAPERSCOUT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "paperscout.toml";
pub const NCBI_API_KEY_ENV: &str = "NCBI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SourcesConfig {
    #[serde(default)]
    pub arxiv: SourceConfig,
    #[serde(default)]
    pub pubmed: SourceConfig,
}

/// Per-source request settings. `base_url = None` means the adapter's
/// built-in endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,
    #[serde(default = "default_min_abstract_tokens")]
    pub min_abstract_tokens: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn bool_true()                  -> bool  { true }
fn default_max_results()        -> usize { 100 }
fn default_timeout_secs()       -> u64   { 30 }
fn default_retry_attempts()     -> u32   { 3 }
fn default_retry_delay_ms()     -> u64   { 4_000 }
fn default_retry_max_delay_ms() -> u64   { 10_000 }
fn default_oversample_factor()  -> usize { 2 }
fn default_min_abstract_tokens() -> usize { 10 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: bool_true(),
            base_url: None,
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            oversample_factor: default_oversample_factor(),
            min_abstract_tokens: default_min_abstract_tokens(),
            api_key: None,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.max_results == 0 {
            return Err(ConfigError::Invalid(format!("sources.{name}.max_results must be > 0")));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(format!("sources.{name}.retry_attempts must be > 0")));
        }
        if self.oversample_factor == 0 {
            return Err(ConfigError::Invalid(format!("sources.{name}.oversample_factor must be >= 1")));
        }
        if self.retry_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "sources.{name}.retry_delay_ms ({}) exceeds retry_max_delay_ms ({})",
                self.retry_delay_ms, self.retry_max_delay_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextConfig {
    #[serde(default = "default_num_sentences")]
    pub num_sentences: usize,
    #[serde(default = "default_num_keywords")]
    pub num_keywords: usize,
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,
}

fn default_num_sentences()   -> usize { 3 }
fn default_num_keywords()    -> usize { 10 }
fn default_min_word_length() -> usize { 3 }

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            num_sentences: default_num_sentences(),
            num_keywords: default_num_keywords(),
            min_word_length: default_min_word_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_summarize_top_k")]
    pub summarize_top_k: usize,
    /// 0 disables the overall timeout.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_max_results_per_source")]
    pub max_results_per_source: usize,
}

fn default_summarize_top_k()        -> usize { 5 }
fn default_query_timeout_secs()     -> u64   { 120 }
fn default_max_results_per_source() -> usize { 5 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summarize_top_k: default_summarize_top_k(),
            query_timeout_secs: default_query_timeout_secs(),
            max_results_per_source: default_max_results_per_source(),
        }
    }
}

impl PipelineConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String { "data/processed".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}


impl Config {
    /// Load configuration.
    /// Checks PAPERSCOUT_CONFIG env var first, then ./paperscout.toml. A
    /// missing default file yields the built-in defaults; a missing file
    /// named explicitly is an error.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from(path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_from(DEFAULT_CONFIG_PATH),
            Err(_) => {
                info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sources.arxiv.validate("arxiv")?;
        self.sources.pubmed.validate("pubmed")?;
        if self.text.num_sentences == 0 {
            return Err(ConfigError::Invalid("text.num_sentences must be > 0".into()));
        }
        if self.text.num_keywords == 0 {
            return Err(ConfigError::Invalid("text.num_keywords must be > 0".into()));
        }
        Ok(())
    }

    /// Fill secrets the file left unset from the environment.
    fn apply_env(&mut self) {
        if self.sources.pubmed.api_key.is_none() {
            self.sources.pubmed.api_key = std::env::var(NCBI_API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
    }
}
