//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a TOML file. Each value resolves in priority
//! order: command-line argument, environment variable, TOML file, then the
//! OS-dependent compiled default. A missing TOML file is not an error.

use crate::policy::{TrustScoreWeights, UrgencyWeights};
use crate::trust::TrustThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root folder override
pub const ENV_ROOT_FOLDER: &str = "TOS_ROOT_FOLDER";
/// Explicit TOML path
pub const ENV_CONFIG: &str = "TOS_CONFIG";
/// LLM credentials, checked in this order
pub const ENV_LLM_API_KEYS: &[&str] = &["TOS_LLM_API_KEY", "ANTHROPIC_API_KEY"];

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "tos.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Listen address for one microservice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    /// Unset means the service's own default port
    pub port: Option<u16>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Request timeout for the HTTP client
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-opus-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Background task channel capacity
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

/// Contents of the bootstrap TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub gov: ServiceConfig,
    pub bridge: ServiceConfig,
    pub llm: LlmConfig,
    pub trust: TrustThresholds,
    pub trust_score: TrustScoreWeights,
    pub urgency: UrgencyWeights,
    pub worker: WorkerConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.trust.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields defaults with a warning
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Locate the TOML file: CLI, then `TOS_CONFIG`, then the platform location
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    default_config_path()
}

/// Root folder: CLI, then `TOS_ROOT_FOLDER`, then TOML, then compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }
    default_root_folder()
}

/// LLM API key: environment first, then TOML; `None` disables AI assessment
pub fn resolve_llm_api_key(toml_config: &TomlConfig) -> Option<String> {
    for var in ENV_LLM_API_KEYS {
        if let Ok(key) = std::env::var(var) {
            if is_valid_key(&key) {
                info!("LLM API key loaded from {}", var);
                return Some(key);
            }
        }
    }

    if let Some(key) = toml_config.llm.api_key.as_ref() {
        if is_valid_key(key) {
            info!("LLM API key loaded from TOML config");
            return Some(key.clone());
        }
    }

    warn!("No LLM API key configured; AI quality assessment disabled");
    None
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn default_config_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join("tos").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return path;
            }
        }
        PathBuf::from("/etc/tos/config.toml")
    } else {
        dirs::config_dir()
            .map(|d| d.join("tos").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("tos.toml"))
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("tos"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tos"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("tos"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tos"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("tos"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tos"))
    } else {
        PathBuf::from("./tos_data")
    }
}
