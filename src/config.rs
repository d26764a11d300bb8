use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::language::Language;
use crate::reveal::RevealPacing;

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "DRIVERS_FRIEND_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend API, without trailing slash
    pub api_base_url: String,

    /// Upper bound on a single backend call, in seconds
    pub request_timeout_secs: u64,

    /// Language used for new sessions
    pub default_language: Language,

    /// Pacing of the simulated typing reveal
    pub reveal: RevealConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Application home directory (config file and logs)
    #[serde(skip)]
    pub home: PathBuf,
}

/// Reveal pacing, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub thinking_min_ms: u64,
    pub thinking_max_ms: u64,
    pub tick_ms: u64,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    /// How many messages the history pane keeps on screen
    pub history_limit: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            thinking_min_ms: 1000,
            thinking_max_ms: 2000,
            tick_ms: 100,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            history_limit: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            default_language: Language::default(),
            reveal: RevealConfig::default(),
            ui: UiConfig::default(),
            home: default_home(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drivers-friend")
}

impl Config {
    /// Load `~/.drivers-friend/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = default_home();
        let config_path = home.join("config.toml");

        let mut config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            Config::default()
        };
        config.home = home;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file. The environment still
    /// overrides what the file says.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_from_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_from_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if let Some(parent) = path.parent() {
            config.home = parent.to_path_buf();
        }
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(url) = env(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.set_api_base_url(url);
            }
        }
    }

    pub fn set_api_base_url(&mut self, url: impl Into<String>) {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.reveal.tick_ms == 0 {
            bail!("reveal.tick_ms must be greater than zero");
        }
        if self.reveal.thinking_min_ms >= self.reveal.thinking_max_ms {
            bail!(
                "reveal.thinking_min_ms ({}) must be below reveal.thinking_max_ms ({})",
                self.reveal.thinking_min_ms,
                self.reveal.thinking_max_ms
            );
        }
        if self.ui.history_limit == 0 {
            bail!("ui.history_limit must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reveal_pacing(&self) -> RevealPacing {
        RevealPacing {
            thinking_min: Duration::from_millis(self.reveal.thinking_min_ms),
            thinking_max: Duration::from_millis(self.reveal.thinking_max_ms),
            tick: Duration::from_millis(self.reveal.tick_ms),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("drivers-friend.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_backend() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.default_language, Language::EnUs);
        assert_eq!(config.reveal_pacing(), RevealPacing::default());
        config.validate().unwrap();
    }

    #[test]
    fn load_from_keeps_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"http://regs.internal:9000/api\"\ndefault_language = \"de\"\n",
        )
        .unwrap();

        let loaded = Config::load_from_with_env(&path, |_| None).unwrap();
        assert_eq!(loaded.default_language, Language::De);
        assert_eq!(loaded.api_base_url, "http://regs.internal:9000/api");
        assert_eq!(loaded.home, dir.path());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_language = \"en-IN\"\n[reveal]\ntick_ms = 50\n").unwrap();

        let loaded = Config::load_from_with_env(&path, |_| None).unwrap();
        assert_eq!(loaded.default_language, Language::EnIn);
        assert_eq!(loaded.reveal.tick_ms, 50);
        assert_eq!(loaded.reveal.thinking_min_ms, 1000);
        assert_eq!(loaded.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn env_url_overrides_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base_url = \"http://file-host/api\"\ndefault_language = \"de\"\n")
            .unwrap();

        let loaded = Config::load_from_with_env(&path, |key| {
            (key == API_URL_ENV).then(|| "http://env-host:9999/api/".to_string())
        })
        .unwrap();
        assert_eq!(loaded.api_base_url, "http://env-host:9999/api");
        assert_eq!(loaded.default_language, Language::De);
    }

    #[test]
    fn blank_env_url_keeps_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base_url = \"http://file-host/api\"\n").unwrap();

        let loaded = Config::load_from_with_env(&path, |_| Some("   ".to_string())).unwrap();
        assert_eq!(loaded.api_base_url, "http://file-host/api");
    }

    #[test]
    fn rejects_inverted_thinking_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reveal]\nthinking_min_ms = 3000\nthinking_max_ms = 2000\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("thinking_min_ms"));
    }

    #[test]
    fn rejects_zero_history_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\nhistory_limit = 0\n").unwrap();

        let err = Config::load_from_with_env(&path, |_| None).unwrap_err();
        assert!(err.to_string().contains("history_limit"));
    }
}
