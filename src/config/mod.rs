//! Application configuration (`config/rater.toml`).
//!
//! TOML shape:
//! preferences_path = "user_preferences.json"
//! fetch_timeout_secs = 15
//!
//! [ai]
//! enabled = true
//! provider = "openai"
//! model = "gpt-4o-mini"
//! api_key = "ENV"
//!
//! Lookup: $RATER_CONFIG_PATH, then `config/rater.toml`; a missing file means
//! defaults. $RATER_PREFERENCES_PATH overrides `preferences_path`.

pub mod ai;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub use ai::AiConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/rater.toml";
pub const ENV_CONFIG_PATH: &str = "RATER_CONFIG_PATH";
pub const ENV_PREFERENCES_PATH: &str = "RATER_PREFERENCES_PATH";

fn default_preferences_path() -> PathBuf {
    PathBuf::from("user_preferences.json")
}
fn default_fetch_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferences_path: default_preferences_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            ai: AiConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing rater config")
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)?;
        cfg.finish()?;
        Ok(cfg)
    }

    /// Env path → default path → built-in defaults.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        if path.exists() {
            let cfg = Self::load_from_file(&path)?;
            info!(path = %path.display(), ai_enabled = cfg.ai.enabled, provider = %cfg.ai.provider, "config loaded");
            return Ok(cfg);
        }

        warn!(path = %path.display(), "config file not found, using defaults");
        let mut cfg = Self::default();
        cfg.finish()?;
        Ok(cfg)
    }

    fn finish(&mut self) -> Result<()> {
        if let Ok(p) = std::env::var(ENV_PREFERENCES_PATH) {
            if !p.trim().is_empty() {
                self.preferences_path = PathBuf::from(p.trim());
            }
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        self.ai.resolve()
    }
}
