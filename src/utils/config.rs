//! Configuration for cvrag
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`cvrag.toml` unless `--config` says otherwise)
//! 3. Environment variables; a `.env` file loaded via `dotenvy` overrides
//!    variables already set in the shell
//!
//! The environment variable names are the ones the deployment already uses
//! (`TOP_K`, `OLLAMA_MODEL`, `ANTHROPIC_API_KEY`, ...). Credentials are only
//! ever read from the environment, never from the TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of fragments to retrieve per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Directory holding the index and metadata artifacts
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    #[serde(default = "default_index_file")]
    pub index_file: String,

    #[serde(default = "default_meta_file")]
    pub meta_file: String,

    /// Keep the loaded artifacts in memory instead of reading them per query
    #[serde(default)]
    pub cache_index: bool,
}

/// Largest accepted `top_k`. A CV index holds a few dozen fragments, and
/// every retrieved fragment ends up in the prompt.
pub const MAX_TOP_K: usize = 100;

fn default_top_k() -> usize {
    2
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_index_file() -> String {
    "index.bin".to_string()
}

fn default_meta_file() -> String {
    "meta.json".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            index_dir: default_index_dir(),
            index_file: default_index_file(),
            meta_file: default_meta_file(),
            cache_index: false,
        }
    }
}

impl RetrievalConfig {
    pub fn index_path(&self) -> PathBuf {
        self.index_dir.join(&self.index_file)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.index_dir.join(&self.meta_file)
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Local model cache; nothing is downloaded at query time
    #[serde(default = "default_embedding_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_embedding_model() -> String {
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string()
}

fn default_embedding_cache_dir() -> PathBuf {
    PathBuf::from(".fastembed_cache")
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_embedding_cache_dir(),
        }
    }
}

// ============= Prompt Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Language the answer must be written in
    #[serde(default = "default_language")]
    pub language: String,

    /// Human name of the document collection, e.g. "CV"
    #[serde(default = "default_corpus")]
    pub corpus: String,

    #[serde(default = "default_max_bullets")]
    pub max_bullets: usize,

    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

fn default_language() -> String {
    "English".to_string()
}

fn default_corpus() -> String {
    "CV".to_string()
}

fn default_max_bullets() -> usize {
    3
}

fn default_max_words() -> usize {
    60
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            corpus: default_corpus(),
            max_bullets: default_max_bullets(),
            max_words: default_max_words(),
        }
    }
}

// ============= Generation Configuration =============

/// Settings for the three generation backends.
///
/// Which backend answers is decided purely by what is populated here:
/// a local model name wins, then an Anthropic key, then OpenAI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub openai: OpenAIConfig,
}

impl GenerationConfig {
    /// True when a local model identifier is configured.
    pub fn local_selected(&self) -> bool {
        self.ollama.model.is_some()
    }

    /// True when an Anthropic credential is configured.
    pub fn anthropic_selected(&self) -> bool {
        self.anthropic.api_key.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Model name; setting it selects the local backend
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Request timeout in seconds
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: f64,

    #[serde(default = "default_num_predict")]
    pub num_predict: i32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_num_thread")]
    pub num_thread: u32,

    #[serde(default = "default_num_ctx")]
    pub num_ctx: u64,

    /// How long the server keeps the model loaded, e.g. "10m", "-1", "0"
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_ollama_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_timeout() -> f64 {
    600.0
}

fn default_num_predict() -> i32 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_num_thread() -> u32 {
    8
}

fn default_num_ctx() -> u64 {
    1024
}

fn default_keep_alive() -> String {
    "10m".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: None,
            host: default_ollama_host(),
            timeout_secs: default_ollama_timeout(),
            num_predict: default_num_predict(),
            temperature: default_temperature(),
            num_thread: default_num_thread(),
            num_ctx: default_num_ctx(),
            keep_alive: default_keep_alive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(skip)]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    400
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Explicit key. When unset, `OPENAI_API_KEY` is read at call time.
    #[serde(skip)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_base")]
    pub api_base: String,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            api_base: default_openai_base(),
        }
    }
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

/// Load `path` into the process environment if it exists.
///
/// Values from the file replace variables that are already set.
pub fn load_dotenv(path: &Path) -> bool {
    match dotenvy::from_path_override(path) {
        Ok(()) => true,
        Err(err) if err.not_found() => false,
        Err(err) => {
            tracing::warn!(path = ?path, error = %err, "Ignoring unreadable .env file");
            false
        }
    }
}

impl RagConfig {
    /// Load configuration from `path`, `.env` and the process environment.
    ///
    /// A missing file falls back to defaults unless `required` is set, which
    /// the CLI does when the user passed `--config` explicitly.
    pub fn load<P: AsRef<Path>>(path: P, required: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            Self::from_toml(&fs::read_to_string(path)?)?
        } else if required {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        } else {
            Self::default()
        };

        load_dotenv(Path::new(".env"));
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TOP_K") {
            self.retrieval.top_k = parse("TOP_K", &v)?;
        }
        if let Some(v) = get("INDEX_DIR") {
            self.retrieval.index_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CACHE_INDEX") {
            self.retrieval.cache_index = parse_bool("CACHE_INDEX", &v)?;
        }

        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("EMBEDDING_CACHE_DIR") {
            self.embedding.cache_dir = PathBuf::from(v);
        }

        if let Some(v) = get("RAG_LANGUAGE") {
            self.prompt.language = v;
        }

        let ollama = &mut self.generation.ollama;
        if let Some(v) = get("OLLAMA_MODEL") {
            ollama.model = Some(v);
        }
        if let Some(v) = get("OLLAMA_HOST") {
            ollama.host = v;
        }
        if let Some(v) = get("OLLAMA_TIMEOUT") {
            ollama.timeout_secs = parse("OLLAMA_TIMEOUT", &v)?;
        }
        if let Some(v) = get("NUM_PREDICT") {
            ollama.num_predict = parse("NUM_PREDICT", &v)?;
        }
        if let Some(v) = get("NUM_THREAD") {
            ollama.num_thread = parse("NUM_THREAD", &v)?;
        }
        if let Some(v) = get("NUM_CTX") {
            ollama.num_ctx = parse("NUM_CTX", &v)?;
        }
        if let Some(v) = get("OLLAMA_KEEP_ALIVE") {
            ollama.keep_alive = v;
        }

        // Shared by the local and Anthropic backends.
        if let Some(v) = get("RAG_TEMPERATURE") {
            let temperature: f32 = parse("RAG_TEMPERATURE", &v)?;
            self.generation.ollama.temperature = temperature;
            self.generation.anthropic.temperature = temperature;
        }

        if let Some(v) = get("ANTHROPIC_API_KEY") {
            self.generation.anthropic.api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_MODEL") {
            self.generation.anthropic.model = v;
        }

        // OPENAI_API_KEY is read by the backend on every call, not here.
        if let Some(v) = get("OPENAI_MODEL") {
            self.generation.openai.model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.generation.openai.api_base = v;
        }

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse("PORT", &v)?;
        }

        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.format = v
                .parse()
                .map_err(|e: String| ConfigError::invalid("LOG_FORMAT", e))?;
        }

        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 || self.retrieval.top_k > MAX_TOP_K {
            return Err(ConfigError::invalid(
                "top_k",
                format!("must be between 1 and {}", MAX_TOP_K),
            ));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::invalid("embedding.model", "must not be empty"));
        }
        if self.prompt.language.trim().is_empty() {
            return Err(ConfigError::invalid("prompt.language", "must not be empty"));
        }
        if self.prompt.max_bullets == 0 || self.prompt.max_words == 0 {
            return Err(ConfigError::invalid(
                "prompt",
                "max_bullets and max_words must be positive",
            ));
        }

        let ollama = &self.generation.ollama;
        if !(ollama.timeout_secs.is_finite() && ollama.timeout_secs > 0.0) {
            return Err(ConfigError::invalid(
                "ollama.timeout_secs",
                "must be a positive number of seconds",
            ));
        }
        for (key, t) in [
            ("ollama.temperature", ollama.temperature),
            ("anthropic.temperature", self.generation.anthropic.temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::invalid(key, "must be between 0 and 2"));
            }
        }

        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{}': {}", value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{}' is not a boolean", other))),
    }
}
