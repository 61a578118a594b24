//! Configuration handling for plantboard
//!
//! Configuration is stored in `config.toml` under the platform config
//! directory (`~/.config/plantboard/` on Linux), or at the path passed with
//! `--config`. A few keys can be overridden from the environment:
//!
//! - `PLANTBOARD_GATEWAY_URL`
//! - `PLANTBOARD_SOLVER_URL`
//! - `PLANTBOARD_TOKEN`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gantt::{clamp_zoom, ViewMode};

pub const ENV_GATEWAY_URL: &str = "PLANTBOARD_GATEWAY_URL";
pub const ENV_SOLVER_URL: &str = "PLANTBOARD_SOLVER_URL";
pub const ENV_TOKEN: &str = "PLANTBOARD_TOKEN";

/// File name of the what-if draft kept in the data directory
const WHATIF_DRAFT_FILE: &str = "whatif.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Defaults for the Gantt views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GanttConfig {
    pub view: ViewMode,
    pub zoom: f64,
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            view: ViewMode::Day,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the document-storage gateway (also serves the assistant)
    pub gateway_url: String,

    /// Base URL of the scheduling solver
    pub solver_url: String,

    /// Static bearer token sent to the gateway
    pub token: Option<String>,

    /// Tag injected into every saved document
    pub app_identifier: String,

    /// Language of assistant greetings (`fr` or `en`)
    pub language: String,

    /// HTTP timeout for gateway and solver calls
    pub timeout_seconds: u64,

    /// Where the what-if draft lives (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,

    pub gantt: GanttConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            solver_url: "http://localhost:8000".to_string(),
            token: None,
            app_identifier: "ordonnancement-app".to_string(),
            language: "fr".to_string(),
            timeout_seconds: 30,
            data_dir: None,
            gantt: GanttConfig::default(),
        }
    }
}

impl Config {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "plantboard", "plantboard")
    }

    /// Returns the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration and applies environment overrides
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Applies overrides from a variable lookup (the process environment in practice)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_GATEWAY_URL) {
            self.gateway_url = url;
        }
        if let Some(url) = non_empty(ENV_SOLVER_URL) {
            self.solver_url = url;
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.token = Some(token);
        }
    }

    pub fn validate(&mut self) -> std::result::Result<(), ConfigError> {
        for (key, url) in [("gateway_url", &self.gateway_url), ("solver_url", &self.solver_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an http(s) URL, got '{}'",
                    key, url
                )));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be positive".to_string(),
            ));
        }

        self.gantt.zoom = clamp_zoom(self.gantt.zoom);
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Directory holding local state (the what-if draft)
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }

    pub fn whatif_draft_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(WHATIF_DRAFT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.app_identifier, "ordonnancement-app");
        assert_eq!(config.gantt.view, ViewMode::Day);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.token.is_none());
    }

    #[test]
    fn parse_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
gateway_url = "https://gateway.example.com"
token = "secret"
language = "en"

[gantt]
view = "hour"
zoom = 2.0
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.gateway_url, "https://gateway.example.com");
        assert_eq!(config.solver_url, "http://localhost:8000");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.language, "en");
        assert_eq!(config.gantt.view, ViewMode::Hour);
        assert_eq!(config.gantt.zoom, 2.0);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_seconds = \"soon\"").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Parse(_))));
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_GATEWAY_URL, "https://gw.internal"),
            (ENV_TOKEN, "from-env"),
            (ENV_SOLVER_URL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.gateway_url, "https://gw.internal");
        assert_eq!(config.token.as_deref(), Some("from-env"));
        // Blank values are ignored
        assert_eq!(config.solver_url, "http://localhost:8000");
    }

    #[test]
    fn validate_rejects_bad_urls_and_clamps_zoom() {
        let mut config = Config {
            solver_url: "localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.gantt.zoom = 12.0;
        config.validate().unwrap();
        assert_eq!(config.gantt.zoom, 4.0);
    }

    #[test]
    fn draft_path_uses_configured_data_dir() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.whatif_draft_path().unwrap(), dir.path().join("whatif.json"));
    }
}
