use anyhow::{Result, anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use log::warn;

/// Application configuration module
/// This module handles loading, validating and saving the `conf.json`
/// settings that drive a translation run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language, either an ISO code or a free-form name
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Subtitle post-processing config
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Retry, backoff and cooldown policy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Attempts per chunk on one credential
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempts for a chunk holding a single segment
    #[serde(default = "default_single_segment_attempts")]
    pub single_segment_attempts: u32,

    /// Base delay, doubled on each retry (in milliseconds)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Pause when every credential is throttled (in seconds)
    #[serde(default = "default_quota_cooldown_secs")]
    pub quota_cooldown_secs: u64,

    /// How many cooldowns a single chunk may trigger before the run fails
    #[serde(default = "default_quota_cooldown_rounds")]
    pub quota_cooldown_rounds: u32,
}

impl RetryConfig {
    /// Delay to wait after the given 0-based failed attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    pub fn quota_cooldown(&self) -> Duration {
        Duration::from_secs(self.quota_cooldown_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            single_segment_attempts: default_single_segment_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            quota_cooldown_secs: default_quota_cooldown_secs(),
            quota_cooldown_rounds: default_quota_cooldown_rounds(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Backend connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Comma separated credentials, tried in order
    #[serde(default)]
    pub api_keys: String,

    /// Credentials shorter than this are ignored
    #[serde(default = "default_min_key_length")]
    pub min_key_length: usize,

    /// Token ceiling of one request
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,

    /// Separator between subtitle units in requests and responses
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Extra context handed to the model, overrides the filename hint
    #[serde(default)]
    pub context: Option<String>,

    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            api_keys: String::new(),
            min_key_length: default_min_key_length(),
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            delimiter: default_delimiter(),
            context: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration for subtitle post-processing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleConfig {
    /// Put every speaker of a merged dialogue line on its own line
    #[serde(default = "default_true")]
    pub format_dialogue: bool,

    /// Derive show or movie context from the input file name
    #[serde(default = "default_true")]
    pub derive_context_from_filename: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            format_dialogue: true,
            derive_context_from_filename: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "Portuguese (Brazil)".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_single_segment_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_quota_cooldown_secs() -> u64 {
    65 // per-minute quotas reset within this window
}

fn default_quota_cooldown_rounds() -> u32 {
    1
}

fn default_min_key_length() -> usize {
    30
}

fn default_max_tokens_per_chunk() -> usize {
    400
}

fn default_delimiter() -> char {
    '|'
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load a configuration file, writing the defaults first when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if crate::language_utils::resolve_language_label(&self.target_language).is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }

        let translation = &self.translation;
        if translation.provider.model.trim().is_empty() {
            return Err(anyhow!("Model name must not be empty"));
        }
        url::Url::parse(&translation.provider.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", translation.provider.endpoint))?;
        if !(0.0..=2.0).contains(&translation.provider.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                translation.provider.temperature
            ));
        }
        if translation.max_tokens_per_chunk == 0 {
            return Err(anyhow!("max_tokens_per_chunk must be at least 1"));
        }
        if translation.delimiter.is_whitespace() {
            return Err(anyhow!("The unit delimiter cannot be whitespace"));
        }
        if translation.retry.max_attempts == 0 || translation.retry.single_segment_attempts == 0 {
            return Err(anyhow!("Retry attempt counts must be at least 1"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            subtitle: SubtitleConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
