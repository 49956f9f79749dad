//! Configuration management for jobtrawl.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The loaded `AppConfig` is constructed once
//! at startup and passed explicitly into the pipeline.

use crate::error::{ConfigError, ConfigResult};
use crate::types::RenderConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Placeholder substituted with the slugged keyword in URL templates.
pub const KEYWORD_PLACEHOLDER: &str = "{keyword}";

/// Main application configuration.
///
/// This is loaded from `~/.config/jobtrawl/config.toml` (or platform equivalent)
/// unless an explicit path is given. If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Search and pagination settings
    pub crawl: CrawlConfig,
    /// Fetch concurrency and resource budget
    pub dispatch: DispatchConfig,
    /// Rendering options for search and item pages
    pub render: RenderSettings,
    /// Enrichment (LLM) settings
    pub llm: LlmConfig,
    /// Storage backend settings
    pub storage: StorageConfig,
    /// Log destination and level
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// An explicit `path` must exist; the default platform path may be absent.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound {
                        path: p.to_path_buf(),
                    });
                }
                p.to_path_buf()
            }
            None => Self::config_path()?,
        };

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents).map_err(|source| ConfigError::Syntax {
                path: config_path.clone(),
                source,
            })?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Supports the following variables:
    /// - `JOBTRAWL_MAX_PAGES`, `JOBTRAWL_CONCURRENCY`, `JOBTRAWL_MEMORY_THRESHOLD`
    /// - `JOBTRAWL_PAGINATION_MODE` (`eager` / `adaptive`)
    /// - `JOBTRAWL_STORAGE_BACKEND` (`sqlite` / `memory`), `JOBTRAWL_DATABASE_URL`
    /// - `JOBTRAWL_LLM_PROVIDER`, `JOBTRAWL_LLM_MODEL`, `JOBTRAWL_LLM_URL`, `JOBTRAWL_LLM_API_KEY`
    /// - `JOBTRAWL_LOG_LEVEL`, `JOBTRAWL_LOG_DIR`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("JOBTRAWL_MAX_PAGES") {
            self.crawl.max_pages = parse_env("JOBTRAWL_MAX_PAGES", &val)?;
            tracing::debug!(
                "Override crawl.max_pages from env: {}",
                self.crawl.max_pages
            );
        }

        if let Some(val) = lookup("JOBTRAWL_PAGINATION_MODE") {
            self.crawl.pagination_mode = parse_env("JOBTRAWL_PAGINATION_MODE", &val)?;
        }

        if let Some(val) = lookup("JOBTRAWL_CONCURRENCY") {
            self.dispatch.concurrency = parse_env("JOBTRAWL_CONCURRENCY", &val)?;
            tracing::debug!(
                "Override dispatch.concurrency from env: {}",
                self.dispatch.concurrency
            );
        }

        if let Some(val) = lookup("JOBTRAWL_MEMORY_THRESHOLD") {
            self.dispatch.memory_threshold_percent =
                parse_env("JOBTRAWL_MEMORY_THRESHOLD", &val)?;
        }

        if let Some(val) = lookup("JOBTRAWL_STORAGE_BACKEND") {
            self.storage.backend = parse_env("JOBTRAWL_STORAGE_BACKEND", &val)?;
        }

        if let Some(val) = lookup("JOBTRAWL_DATABASE_URL") {
            self.storage.database_url = val;
        }

        if let Some(val) = lookup("JOBTRAWL_LLM_PROVIDER") {
            self.llm.provider = parse_env("JOBTRAWL_LLM_PROVIDER", &val)?;
        }

        if let Some(val) = lookup("JOBTRAWL_LLM_MODEL") {
            self.llm.model = val;
            tracing::debug!("Override llm.model from env: {}", self.llm.model);
        }

        if let Some(val) = lookup("JOBTRAWL_LLM_URL") {
            self.llm.base_url = val;
        }

        if let Some(val) = lookup("JOBTRAWL_LLM_API_KEY") {
            self.llm.api_key = Some(val);
        }

        if let Some(val) = lookup("JOBTRAWL_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Some(val) = lookup("JOBTRAWL_LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(val));
        }

        Ok(())
    }

    /// Check that every required setting is present and in range.
    pub fn validate(&self) -> ConfigResult<()> {
        let at_least_one = |field: &str| ConfigError::invalid(field, "must be at least 1");

        if self.crawl.max_pages == 0 {
            return Err(at_least_one("crawl.max_pages"));
        }
        if self.crawl.page_batch_size == 0 {
            return Err(at_least_one("crawl.page_batch_size"));
        }
        if !self.crawl.base_url_template.contains(KEYWORD_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                "crawl.base_url_template",
                format!("must contain the {KEYWORD_PLACEHOLDER} placeholder"),
            ));
        }
        regex::Regex::new(&self.crawl.item_link_pattern)
            .map_err(|e| ConfigError::invalid("crawl.item_link_pattern", e.to_string()))?;
        if self.crawl.quit_token.trim().is_empty() {
            return Err(ConfigError::missing("crawl.quit_token"));
        }
        if self.dispatch.concurrency == 0 {
            return Err(at_least_one("dispatch.concurrency"));
        }
        let threshold = self.dispatch.memory_threshold_percent;
        if !(threshold > 0.0 && threshold <= 100.0) {
            return Err(ConfigError::invalid(
                "dispatch.memory_threshold_percent",
                format!("must be in (0, 100], got {threshold}"),
            ));
        }
        if self.llm.concurrency == 0 {
            return Err(at_least_one("llm.concurrency"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::missing("llm.model"));
        }
        if self.llm.provider == LlmProviderKind::OpenAi
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::missing("llm.api_key"));
        }
        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_url.trim().is_empty()
        {
            return Err(ConfigError::missing("storage.database_url"));
        }
        if self.storage.write_attempts == 0 {
            return Err(at_least_one("storage.write_attempts"));
        }
        Ok(())
    }

    /// Write this configuration as TOML, creating parent directories.
    /// The API key is never written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!(path = %path.display(), "writing config");

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobtrawl/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobtrawl", "jobtrawl").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_env<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{value}': {e}")))
}

/// How result pages are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Plan every page upfront and fetch them all concurrently
    Eager,
    /// Fetch pages in small batches and stop at the first empty page
    Adaptive,
}

impl FromStr for PaginationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("unknown pagination mode '{other}'")),
        }
    }
}

/// Search and pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Search page URL template; `{keyword}` is replaced by the slugged keyword
    pub base_url_template: String,
    /// Regex an internal link must match to count as an item link
    pub item_link_pattern: String,
    /// Template for links excluded as the search page's own pseudo-item
    pub exclusion_pattern: String,
    /// Maximum number of result pages to scan per keyword
    pub max_pages: u32,
    /// Pagination scheduling mode
    pub pagination_mode: PaginationMode,
    /// Pages requested per batch in adaptive mode
    pub page_batch_size: u32,
    /// Input that ends the interactive loop
    pub quit_token: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url_template: "https://hk.jobsdb.com/{keyword}-jobs".to_string(),
            item_link_pattern: r"\d+\?type=standard".to_string(),
            exclusion_pattern: "{keyword}-jobs".to_string(),
            max_pages: 10,
            pagination_mode: PaginationMode::Adaptive,
            page_batch_size: 1,
            quit_token: "q".to_string(),
        }
    }
}

/// Which fetch collaborator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchBackend {
    /// Plain HTTP requests
    Http,
    /// Headless Chromium rendering
    Browser,
}

/// Fetch concurrency and resource budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of in-flight fetches
    pub concurrency: usize,
    /// Memory usage percent above which new launches are throttled
    pub memory_threshold_percent: f64,
    /// How often memory pressure is re-checked while throttled, in milliseconds
    pub check_interval_ms: u64,
    /// Per-page fetch timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Fetch collaborator backend
    pub fetch_backend: FetchBackend,
    /// User agent string for HTTP fetches
    pub user_agent: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            memory_threshold_percent: 70.0,
            check_interval_ms: 1000,
            fetch_timeout_secs: 30,
            fetch_backend: FetchBackend::Http,
            user_agent: concat!("jobtrawl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Rendering options for search and item pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Options used for search result pages
    pub search_page: RenderConfig,
    /// Options used for item pages
    pub item_page: RenderConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            search_page: RenderConfig::default(),
            item_page: RenderConfig::default().with_target_elements([
                r#"h1[data-automation="job-detail-title"]"#,
                r#"div[data-automation="jobAdDetails"]"#,
            ]),
        }
    }
}

/// Which inference backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProviderKind {
    /// Local Ollama server
    #[serde(rename = "ollama")]
    Ollama,
    /// `OpenAI`-compatible chat completions API
    #[serde(rename = "openai")]
    OpenAi,
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

/// Enrichment (LLM) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Inference backend
    pub provider: LlmProviderKind,
    /// Model identifier
    pub model: String,
    /// Server base URL
    pub base_url: String,
    /// API key (read from the environment, never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate per item
    pub max_tokens: u32,
    /// Per-item inference timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of in-flight inference calls
    pub concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Ollama,
            model: "mistral:latest".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 120,
            concurrency: 4,
        }
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// `SQLite` database
    Sqlite,
    /// Process-local map, lost on exit
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Database path or `sqlite:` URL
    pub database_url: String,
    /// Connection pool size
    pub max_connections: u32,
    /// Attempts per record for transient write failures
    pub write_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "jobtrawl.db".to_string(),
            max_connections: 5,
            write_attempts: 3,
        }
    }
}

/// Log destination and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Directory for log files (stderr when unset)
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,jobtrawl=debug".to_string(),
            directory: None,
        }
    }
}
