use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "SEARCH_MCP_CONFIG";
pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
pub const DEFAULT_LOG_DIR: &str = "/tmp/search-mcp";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Settings for the upstream search backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub user_agent: Option<String>,
}

impl ToolConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(10_000))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(3_000))
    }

    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(1)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for `search-mcp.log`. An empty string disables the file sink.
    pub dir: Option<String>,
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn log_dir(&self) -> Option<&str> {
        match self.dir.as_deref() {
            None => Some(DEFAULT_LOG_DIR),
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d),
        }
    }

    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub search: ToolConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults, then the TOML file named by `SEARCH_MCP_CONFIG` (if set), then env overrides.
    pub fn from_env_and_toml() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(&path)?,
            _ => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SEARCH_BASE_URL") {
            if !v.trim().is_empty() {
                self.search.base_url = Some(v);
            }
        }
        if let Some(ms) = env_parse::<u64>("SEARCH_TIMEOUT_MS") {
            self.search.timeout_ms = Some(ms);
        }
        if let Some(n) = env_parse::<u32>("SEARCH_RETRIES") {
            self.search.retries = Some(n);
        }
        if let Ok(dir) = std::env::var("SEARCH_MCP_LOG_DIR") {
            self.logging.dir = Some(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.search.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "search.base_url must be an http(s) URL, got '{base}'"
            )));
        }
        if self.search.timeout().is_zero() {
            return Err(ConfigError::Invalid("search.timeout_ms cannot be 0".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            CONFIG_PATH_ENV,
            "SEARCH_BASE_URL",
            "SEARCH_TIMEOUT_MS",
            "SEARCH_RETRIES",
            "SEARCH_MCP_LOG_DIR",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_file_or_env() {
        clear_env();
        let cfg = AppConfig::from_env_and_toml().unwrap();
        assert_eq!(cfg.search.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.search.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.search.retries(), 1);
        assert_eq!(cfg.logging.log_dir(), Some(DEFAULT_LOG_DIR));
        assert_eq!(cfg.logging.level(), "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn env_overrides_toml_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[search]
base_url = "http://from-file"
timeout_ms = 2500
retries = 3

[logging]
level = "debug"
"#
        )
        .unwrap();
        std::env::set_var(CONFIG_PATH_ENV, file.path());
        std::env::set_var("SEARCH_BASE_URL", "http://from-env");
        std::env::set_var("SEARCH_MCP_LOG_DIR", "");

        let cfg = AppConfig::from_env_and_toml().unwrap();
        assert_eq!(cfg.search.base_url(), "http://from-env");
        assert_eq!(cfg.search.timeout(), Duration::from_millis(2500));
        assert_eq!(cfg.search.retries(), 3);
        assert_eq!(cfg.logging.level(), "debug");
        assert_eq!(cfg.logging.log_dir(), None);
        clear_env();
    }

    #[test]
    #[serial]
    fn non_numeric_env_falls_back_to_default() {
        clear_env();
        std::env::set_var("SEARCH_TIMEOUT_MS", "soon");
        let cfg = AppConfig::from_env_and_toml().unwrap();
        assert_eq!(cfg.search.timeout(), Duration::from_secs(10));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_config_file_is_an_error() {
        clear_env();
        std::env::set_var(CONFIG_PATH_ENV, "/definitely/not/here.toml");
        let err = AppConfig::from_env_and_toml().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        clear_env();
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search\nbase_url = ").unwrap();
        let err = AppConfig::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn validate_rejects_zero_timeout_and_bad_url() {
        let mut cfg = AppConfig::default();
        cfg.search.timeout_ms = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.search.base_url = Some("ftp://nope".into());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("http(s) URL"));
    }
}
