//! Configuration loader and validator for the asset sync pipeline.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub youtube: Youtube,
    pub http: Http,
}

/// Queue and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_ms: u64,
    pub workers: usize,
    pub handler_timeout_seconds: u64,
}

/// YouTube Data API settings. An empty key is accepted here; the video
/// handler reports ERROR for each entry it cannot process without one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Youtube {
    #[serde(default)]
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Http {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` wins; otherwise a SQLite file under `data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/asset-queue.db", self.app.data_dir))
    }

    pub fn youtube_api_key(&self) -> Option<&str> {
        let key = self.youtube.api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.app.poll_interval_ms)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.app.handler_timeout_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.workers == 0 {
        return Err(ConfigError::Invalid("app.workers must be > 0"));
    }
    if cfg.app.handler_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("app.handler_timeout_seconds must be > 0"));
    }

    if Url::parse(&cfg.youtube.endpoint).is_err() {
        return Err(ConfigError::Invalid("youtube.endpoint must be a valid URL"));
    }

    if cfg.http.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("http.timeout_seconds must be > 0"));
    }
    if cfg.http.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("http.user_agent must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the project.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 500
  workers: 2
  handler_timeout_seconds: 60

youtube:
  api_key: "YOUR_YOUTUBE_DATA_API_KEY"
  endpoint: "https://www.googleapis.com/youtube/v3/videos"

http:
  timeout_seconds: 20
  user_agent: "pim-asset-sync/0.1"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn example_cfg() -> Config {
        serde_yaml::from_str(example()).unwrap()
    }

    #[test]
    fn parse_example_ok() {
        let cfg = example_cfg();
        validate(&cfg).unwrap();
        assert_eq!(cfg.handler_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.youtube_api_key(), Some("YOUR_YOUTUBE_DATA_API_KEY"));
    }

    #[test]
    fn empty_api_key_is_valid_but_absent() {
        let mut cfg = example_cfg();
        cfg.youtube.api_key = "  ".into();
        validate(&cfg).unwrap();
        assert_eq!(cfg.youtube_api_key(), None);
    }

    #[test]
    fn missing_api_key_field_defaults_to_empty() {
        let yaml = example().replace("  api_key: \"YOUR_YOUTUBE_DATA_API_KEY\"\n", "");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.youtube.api_key.is_empty());
    }

    #[test]
    fn invalid_app_settings() {
        let mut cfg = example_cfg();
        cfg.app.workers = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("app.workers")),
            _ => panic!("wrong error"),
        }

        let mut cfg = example_cfg();
        cfg.app.poll_interval_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = example_cfg();
        cfg.app.handler_timeout_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = example_cfg();
        cfg.app.data_dir = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_endpoint_and_http() {
        let mut cfg = example_cfg();
        cfg.youtube.endpoint = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("youtube.endpoint")),
            _ => panic!("wrong error"),
        }

        let mut cfg = example_cfg();
        cfg.http.timeout_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg = example_cfg();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.workers, 2);
    }
}
