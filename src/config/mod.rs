use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

/// Environment variable holding the provider API key. Required at startup.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub base_url: String,
    /// Optional extra paragraph appended to the system instruction.
    pub instruction: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable GEMINI_API_KEY is not set; export it or add it to a .env file")]
    MissingApiKey,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    base_url: Option<String>,
    instruction: Option<String>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            instruction: None,
        }
    }
}

/// Reads the provider secret from the environment. The agent refuses to
/// start without it.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    match env::var(API_KEY_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingApiKey),
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(AppConfig {
        model: parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        base_url: parsed
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        instruction: parsed.instruction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;

    #[test]
    #[serial]
    fn returns_default_when_missing() {
        let original_dir = env::current_dir().expect("current dir");
        let temp = tempfile::tempdir().expect("tempdir");
        env::set_current_dir(temp.path()).expect("switch to temp dir");

        let config = AppConfig::load(None).expect("load succeeds");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.instruction.is_none());

        env::set_current_dir(original_dir).expect("restore current dir");
    }

    #[test]
    fn reads_all_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent.toml");
        let mut file = File::create(&path).expect("create config");
        writeln!(
            file,
            r#"
model = "gemini-2.5-pro"
base_url = "http://localhost:9090"
instruction = "prefer short answers"
"#
        )
        .expect("write");

        let config = AppConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.base_url, "http://localhost:9090");
        assert_eq!(config.instruction.as_deref(), Some("prefer short answers"));
    }

    #[test]
    fn falls_back_to_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent.toml");
        fs::write(&path, "instruction = \"be terse\"").expect("write");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.instruction.as_deref(), Some("be terse"));
    }

    #[test]
    fn rejects_invalid_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent.toml");
        fs::write(&path, "model = [not toml").expect("write");

        let err = AppConfig::load(Some(&path)).expect_err("parse failure");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    #[serial]
    fn missing_api_key_is_an_error() {
        let previous = env::var(API_KEY_ENV).ok();
        unsafe { env::remove_var(API_KEY_ENV) };

        let err = api_key_from_env().expect_err("key absent");
        assert!(matches!(err, ConfigError::MissingApiKey));

        unsafe { env::set_var(API_KEY_ENV, "sk-test") };
        assert_eq!(api_key_from_env().expect("key present"), "sk-test");

        match previous {
            Some(value) => unsafe { env::set_var(API_KEY_ENV, value) },
            None => unsafe { env::remove_var(API_KEY_ENV) },
        }
    }
}
