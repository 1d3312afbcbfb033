use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::prompts::ModelTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", or "stub" (stub is for tests and the default demo config).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_models")]
    pub models: HashMap<String, String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub debug_trace: bool,
}

fn default_provider() -> String {
    "stub".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_models() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("weak".to_string(), "gpt-4o-mini".to_string());
    m.insert("planning".to_string(), "gpt-4o".to_string());
    m.insert("developer".to_string(), "gpt-4o".to_string());
    m
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            base_url: None,
            models: default_models(),
            timeout_seconds: default_timeout_seconds(),
            debug_trace: false,
        }
    }
}

impl LlmConfig {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        let key = match tier {
            ModelTier::Weak => "weak",
            ModelTier::Planning => "planning",
            ModelTier::Developer => "developer",
        };
        self.models.get(key).map(|s| s.as_str()).unwrap_or("gpt-4o-mini")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarativePaths {
    #[serde(default = "default_datasources_file")]
    pub datasources_file: PathBuf,
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,
    #[serde(default = "default_prompts_file")]
    pub prompts_file: PathBuf,
}

fn default_datasources_file() -> PathBuf {
    PathBuf::from("declarative/datasources.yaml")
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("declarative/schemas")
}

fn default_prompts_file() -> PathBuf {
    PathBuf::from("declarative/prompts.yaml")
}

impl Default for DeclarativePaths {
    fn default() -> Self {
        Self {
            datasources_file: default_datasources_file(),
            schema_dir: default_schema_dir(),
            prompts_file: default_prompts_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub declarative: DeclarativePaths,
    #[serde(default = "default_turn_deadline_seconds")]
    pub turn_deadline_seconds: u64,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_turn_deadline_seconds() -> u64 {
    60
}

fn default_history_window() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            pool: PoolConfig::default(),
            declarative: DeclarativePaths::default(),
            turn_deadline_seconds: default_turn_deadline_seconds(),
            history_window: default_history_window(),
            log_level: default_log_level(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Loads `path` if it exists (TOML), falling back to defaults, then applies
    /// environment overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `NLSQL_LLM_API_KEY`, `NLSQL_<TIER>_API_KEY` (tier-specific wins for that
    /// tier's calls only if the client looks it up separately; here we keep a
    /// single shared key plus per-tier model id overrides), `NLSQL_DEBUG_TRACE`,
    /// `NLSQL_LOG_LEVEL`, `NLSQL_<TIER>_MODEL`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("NLSQL_LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(provider) = std::env::var("NLSQL_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(base_url) = std::env::var("NLSQL_LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Ok(debug) = std::env::var("NLSQL_DEBUG_TRACE") {
            self.llm.debug_trace = debug == "1" || debug.eq_ignore_ascii_case("true");
        }
        if let Ok(level) = std::env::var("NLSQL_LOG_LEVEL") {
            self.log_level = level;
        }
        for tier in ["weak", "planning", "developer"] {
            let var = format!("NLSQL_{}_MODEL", tier.to_uppercase());
            if let Ok(model) = std::env::var(&var) {
                self.llm.models.insert(tier.to_string(), model);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.provider != "stub" && self.llm.api_key.is_empty() {
            return Err(CoreError::Config(format!(
                "provider {} requires NLSQL_LLM_API_KEY",
                self.llm.provider
            )));
        }
        if self.pool.max_connections < self.pool.min_connections {
            return Err(CoreError::Config(
                "pool.max_connections must be >= pool.min_connections".to_string(),
            ));
        }
        if self.turn_deadline_seconds == 0 {
            return Err(CoreError::Config("turn_deadline_seconds must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_with_stub_provider() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_stub_provider_requires_api_key() {
        let mut config = Config::default();
        config.llm.provider = "openai".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.port, default_port());
    }

    #[test]
    fn env_override_wins_over_file_default() {
        std::env::set_var("NLSQL_LOG_LEVEL", "debug");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.log_level, "debug");
        std::env::remove_var("NLSQL_LOG_LEVEL");
    }
}
