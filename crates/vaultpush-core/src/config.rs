//! Configuration module for vaultpush.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, RetryPolicy};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for vaultpush.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub upload: UploadConfig,
    pub workers: WorkersConfig,
    pub routing: RoutingConfig,
    pub source: SourceConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// S3-compatible object store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `host:port` or a full URL.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
    /// Use `https://` when the endpoint has no scheme.
    pub secure: bool,
}

/// Attributes attached to every uploaded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub content_type: String,
    /// Empty string disables the header.
    pub content_language: String,
    /// User metadata sent with each put.
    pub metadata: HashMap<String, String>,
}

/// Worker pool and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub num_workers: usize,
    /// Capacity of the job queue between the walker and the workers.
    pub buffer_size: usize,
    /// Total attempts per file, including the first.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// 1.0 keeps the delay fixed; larger values back off exponentially.
    pub backoff_factor: f64,
}

/// Which top-level directories map to which buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Accepted directory name prefixes, e.g. `05` for `05 - Posts`.
    pub prefixes: Vec<String>,
    /// Separator between prefix and bucket label.
    pub separator: String,
    /// Directory names whose contents are keyed as if they lived in the parent.
    pub flatten_dirs: Vec<String>,
    /// Ignore entries whose name starts with `.`.
    pub skip_hidden: bool,
}

/// Where the tree to sync comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// An existing directory on disk.
    Local,
    /// A fresh `git clone` before each run.
    Git,
}

/// Source tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Root directory (or clone target for `git`).
    pub path: PathBuf,
    pub git_url: Option<String>,
    /// SSH private key used for cloning.
    pub ssh_key_path: Option<PathBuf>,
}

/// Daemon scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Also append log lines to this file; stdout is always written.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultpush/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultpush")
            .join("config.yaml")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ValidationError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Recognised variables: `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`,
    /// `MINIO_SECRET_KEY`, `GIT_URL`, `GIT_CERT_PATH`, `APP_SCHEDULE`,
    /// `LOGGING_FILE_PATH`.
    /// Setting `GIT_URL` switches the source to `git`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("MINIO_ENDPOINT") {
            self.store.endpoint = endpoint;
        }
        if let Some(access_key) = get("MINIO_ACCESS_KEY") {
            self.store.access_key = access_key;
        }
        if let Some(secret_key) = get("MINIO_SECRET_KEY") {
            self.store.secret_key = secret_key;
        }
        if let Some(url) = get("GIT_URL") {
            self.source.git_url = Some(url);
            self.source.kind = SourceKind::Git;
        }
        if let Some(key_path) = get("GIT_CERT_PATH") {
            self.source.ssh_key_path = Some(PathBuf::from(key_path));
        }
        if let Some(log_path) = get("LOGGING_FILE_PATH") {
            self.logging.file = Some(PathBuf::from(log_path));
        }
        if let Some(minutes) = get("APP_SCHEDULE") {
            self.schedule.interval_minutes =
                minutes.trim().parse().map_err(|_| ValidationError {
                    field: "APP_SCHEDULE".into(),
                    message: format!("expected a number of minutes, got '{minutes}'"),
                })?;
        }
        Ok(())
    }

    /// Retry policy derived from the `workers` section.
    pub fn retry_policy(&self) -> Result<RetryPolicy, DomainError> {
        RetryPolicy::new(
            self.workers.max_retries,
            Duration::from_millis(self.workers.retry_delay_ms),
            self.workers.backoff_factor,
        )
    }

    /// Interval between daemon sync cycles.
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_minutes.saturating_mul(60))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default user metadata attached to uploaded notes.
const DEFAULT_METADATA_KEYS: &[&str] = &["is-posted", "is-translated", "saved-on-cloud", "is-summarized"];

/// Two workers per available core.
fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            region: "us-east-1".to_string(),
            force_path_style: true,
            secure: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            content_language: "ru-RU".to_string(),
            metadata: DEFAULT_METADATA_KEYS
                .iter()
                .map(|k| ((*k).to_string(), "false".to_string()))
                .collect(),
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            buffer_size: 1000,
            max_retries: 3,
            retry_delay_ms: 2000,
            backoff_factor: 1.0,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["05".to_string(), "06".to_string()],
            separator: " - ".to_string(),
            flatten_dirs: Vec::new(),
            skip_hidden: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            path: PathBuf::from("obsidian"),
            git_url: None,
            ssh_key_path: None,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"workers.num_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- store ---
        if self.store.endpoint.trim().is_empty() {
            push("store.endpoint", "must not be empty".into());
        }

        // --- workers ---
        if self.workers.num_workers == 0 {
            push("workers.num_workers", "must be greater than 0".into());
        }
        if self.workers.buffer_size == 0 {
            push("workers.buffer_size", "must be greater than 0".into());
        }
        if self.workers.max_retries == 0 {
            push("workers.max_retries", "must be greater than 0".into());
        }
        if !self.workers.backoff_factor.is_finite() || self.workers.backoff_factor < 1.0 {
            push(
                "workers.backoff_factor",
                format!("must be >= 1.0, got {}", self.workers.backoff_factor),
            );
        }

        // --- routing ---
        if self.routing.prefixes.is_empty() {
            push("routing.prefixes", "at least one prefix is required".into());
        }
        if self.routing.prefixes.iter().any(|p| p.is_empty()) {
            push("routing.prefixes", "prefixes must not be empty strings".into());
        }
        if self.routing.separator.is_empty() {
            push("routing.separator", "must not be empty".into());
        }

        // --- source ---
        if self.source.kind == SourceKind::Git
            && self.source.git_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            push("source.git_url", "required when source.kind is 'git'".into());
        }
        if self.source.path.as_os_str().is_empty() {
            push("source.path", "must not be empty".into());
        }

        // --- schedule ---
        if self.schedule.interval_minutes == 0 {
            push("schedule.interval_minutes", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use vaultpush_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .store_endpoint("minio.local:9000")
///     .workers_num_workers(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- store ---

    pub fn store_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.store.endpoint = endpoint.into();
        self
    }

    pub fn store_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.config.store.access_key = access_key.into();
        self.config.store.secret_key = secret_key.into();
        self
    }

    pub fn store_region(mut self, region: impl Into<String>) -> Self {
        self.config.store.region = region.into();
        self
    }

    pub fn store_secure(mut self, secure: bool) -> Self {
        self.config.store.secure = secure;
        self
    }

    // --- upload ---

    pub fn upload_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.upload.content_type = content_type.into();
        self
    }

    pub fn upload_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.upload.metadata.insert(key.into(), value.into());
        self
    }

    // --- workers ---

    pub fn workers_num_workers(mut self, n: usize) -> Self {
        self.config.workers.num_workers = n;
        self
    }

    pub fn workers_buffer_size(mut self, n: usize) -> Self {
        self.config.workers.buffer_size = n;
        self
    }

    pub fn workers_max_retries(mut self, n: u32) -> Self {
        self.config.workers.max_retries = n;
        self
    }

    pub fn workers_retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.workers.retry_delay_ms = ms;
        self
    }

    pub fn workers_backoff_factor(mut self, factor: f64) -> Self {
        self.config.workers.backoff_factor = factor;
        self
    }

    // --- routing ---

    pub fn routing_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.routing.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn routing_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.routing.separator = separator.into();
        self
    }

    pub fn routing_flatten_dir(mut self, name: impl Into<String>) -> Self {
        self.config.routing.flatten_dirs.push(name.into());
        self
    }

    pub fn routing_skip_hidden(mut self, skip: bool) -> Self {
        self.config.routing.skip_hidden = skip;
        self
    }

    // --- source ---

    pub fn source_local(mut self, path: PathBuf) -> Self {
        self.config.source.kind = SourceKind::Local;
        self.config.source.path = path;
        self
    }

    pub fn source_git(mut self, url: impl Into<String>, checkout: PathBuf) -> Self {
        self.config.source.kind = SourceKind::Git;
        self.config.source.git_url = Some(url.into());
        self.config.source.path = checkout;
        self
    }

    pub fn source_ssh_key(mut self, path: PathBuf) -> Self {
        self.config.source.ssh_key_path = Some(path);
        self
    }

    // --- schedule ---

    pub fn schedule_interval_minutes(mut self, minutes: u64) -> Self {
        self.config.schedule.interval_minutes = minutes;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    pub fn logging_file(mut self, path: PathBuf) -> Self {
        self.config.logging.file = Some(path);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
