//! Configuration loading and root folder resolution

use crate::convergence::DEFAULT_MAX_VALIDATION_PASSES;
use crate::important_words::{ImportantWordFilter, DEFAULT_MIN_WORD_LENGTH};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LINGO_ROOT_FOLDER";

/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lingo.db";

/// Contents of `lingo.toml`
///
/// Every section is optional; missing values fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub openai: OpenAiConfig,
    pub coverage: CoverageConfig,
    /// Extra short-but-important words per language code
    pub important_words: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive, e.g. "info" or "lingo_server=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Words longer than this many characters are always important
    pub min_word_length: usize,
    /// Validation passes per phrase, including the initial one
    pub max_validation_passes: usize,
    /// Phrases of one generation batch processed at the same time
    pub generation_concurrency: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_word_length: DEFAULT_MIN_WORD_LENGTH,
            max_validation_passes: DEFAULT_MAX_VALIDATION_PASSES,
            generation_concurrency: 4,
        }
    }
}

impl TomlConfig {
    /// Build the important-word filter from built-ins plus configured additions
    pub fn important_word_filter(&self) -> ImportantWordFilter {
        ImportantWordFilter::with_extensions(self.coverage.min_word_length, &self.important_words)
    }
}

/// Default configuration file path: `<config_dir>/lingo/lingo.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lingo").join("lingo.toml"))
}

/// Parse a TOML configuration file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration, degrading to defaults
///
/// A missing file is normal (defaults are used). An unreadable or invalid
/// file logs a warning and also yields defaults; it never stops startup.
pub fn load_toml_config(explicit_path: Option<&Path>) -> TomlConfig {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using defaults");
                return TomlConfig::default();
            }
        },
    };

    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match read_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent default
    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lingo"))
        .unwrap_or_else(|| PathBuf::from("./lingo_data"))
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the OpenAI API key
///
/// **Priority:** ENV → TOML
pub fn resolve_openai_api_key(config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(OPENAI_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = config.openai.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("OpenAI API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("OpenAI API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "OpenAI API key not configured. Set {} or add api_key under [openai] in lingo.toml",
        OPENAI_API_KEY_ENV
    )))
}
