//! Application configuration.
//!
//! A single [`AppConfig`] value is loaded at startup (TOML file plus an
//! environment fallback for the API key) and handed to the components that
//! need it. Nothing reads the environment after construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "foreman.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// When non-empty, file operations are confined to these directories.
    #[serde(default)]
    pub allowed_dirs: Vec<PathBuf>,
    /// Dotted extensions; empty means the built-in default set.
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("foreman.db")
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_turns() -> u32 {
    20
}

fn default_command_timeout() -> u64 {
    300
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_turns: default_max_turns(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allowed_dirs: Vec::new(),
            allowed_extensions: Vec::new(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `foreman.toml` in the working directory when
    /// present, or fall back to defaults. `FOREMAN_API_KEY` fills the API key
    /// when the file leaves it empty.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if config.model.api_key.is_empty()
            && let Ok(key) = std::env::var("FOREMAN_API_KEY")
        {
            config.model.api_key = key;
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("invalid config at {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_retries, 3);
        assert_eq!(config.agent.max_turns, 20);
        assert_eq!(config.tools.command_timeout_secs, 300);
        assert_eq!(config.store.db_path, PathBuf::from("foreman.db"));
        assert!(config.tools.allowed_dirs.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [agent]
            max_turns = 5

            [model]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.agent.max_retries, 3);
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.base_url, "https://api.deepseek.com/v1");
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreman.toml");
        std::fs::write(
            &path,
            r#"
            [store]
            db_path = "/tmp/test-foreman.db"

            [tools]
            allowed_dirs = ["/workspace"]
            command_timeout_secs = 60
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/test-foreman.db"));
        assert_eq!(config.tools.allowed_dirs, vec![PathBuf::from("/workspace")]);
        assert_eq!(config.tools.command_timeout_secs, 60);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[agent\nmax_turns = oops").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
