// src/config/ai.rs
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_daily_limit() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Any Chat Completions compatible endpoint root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key: default_api_key(),
            daily_limit: default_daily_limit(),
            timeout_secs: default_timeout_secs(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl AiConfig {
    /// Normalize provider and resolve an "ENV" api key. A missing env key is
    /// only an error when the provider is enabled and needs one.
    pub fn resolve(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => match env::var("OPENAI_API_KEY") {
                    Ok(k) => k,
                    Err(_) if self.enabled => bail!("Missing OPENAI_API_KEY env var"),
                    Err(_) => String::new(),
                },
                "mock" => String::new(),
                other => bail!("Unsupported provider in config: {other}"),
            };
        }

        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(())
    }
}
