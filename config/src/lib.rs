mod credential;
mod source;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use credential::{API_KEY_ENV, Credential};
pub use source::{DataSource, NetworkedParams};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Please provide a valid Groq API key.")]
    MissingCredential,
    #[error("Please provide all MySQL connection details (missing: {}).", .missing.join(", "))]
    MissingConnectionParams { missing: Vec<&'static str> },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SqlChatConfig {
    pub ai: AIConfig,
    pub embedded: EmbeddedConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AIConfig {
    pub model: String,
    pub url: String,
    pub temperature: f32,
    /// Upper bound on model turns that request tools before the agent gives up.
    pub max_rounds: u32,
    /// Rows of a query result handed back to the model.
    pub result_limit: usize,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            url: "https://api.groq.com/openai/v1".to_string(),
            temperature: 0.0,
            max_rounds: 15,
            result_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddedConfig {
    pub path: PathBuf,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Employee.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 7200 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl SqlChatConfig {
    pub fn get_or_default() -> Self {
        let Ok(home_dir) = std::env::var("HOME") else {
            return SqlChatConfig::default();
        };

        let path = PathBuf::from(format!("{home_dir}/.config/sqlchat/config.toml"));
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return SqlChatConfig::default();
        }

        match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}, using defaults");
                SqlChatConfig::default()
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_groq() {
        let config = SqlChatConfig::default();
        assert_eq!(config.ai.model, "llama3-8b-8192");
        assert_eq!(config.ai.url, "https://api.groq.com/openai/v1");
        assert_eq!(config.embedded.path, PathBuf::from("Employee.db"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(7200));
    }

    #[test]
    fn load_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[ai]
model = "llama-3.1-8b-instant"

[cache]
ttl_secs = 60
"#,
        )
        .unwrap();

        let config = SqlChatConfig::load_from_path(&path).unwrap();
        assert_eq!(config.ai.model, "llama-3.1-8b-instant");
        assert_eq!(config.ai.max_rounds, 15);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.embedded.path, PathBuf::from("Employee.db"));
    }

    #[test]
    fn load_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml {{{").unwrap();

        let err = SqlChatConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = SqlChatConfig::load_from_path(Path::new("/nonexistent/sqlchat.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
