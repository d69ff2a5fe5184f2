use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::answer::Answerer;

pub const DEFAULT_SOURCE_URL: &str = "https://lnkk.in/icc-mens-cricket-world-cup-odi/";
pub const DEFAULT_LLM_BASE_URL: &str = "https://models.github.ai/inference";
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub llm_base_url: String,
    pub model: String,
    pub llm_timeout: Duration,
    pub source_url: String,
    pub fetch_timeout: Duration,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build from any key lookup. Only the credential is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GITHUB_TOKEN")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("GITHUB_TOKEN required"))?;

        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            api_key,
            llm_base_url: or_default("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            model: or_default("LLM_MODEL", DEFAULT_MODEL),
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)?),
            source_url: or_default("SOURCE_URL", DEFAULT_SOURCE_URL),
            fetch_timeout: Duration::from_secs(parse_or(&lookup, "FETCH_TIMEOUT_SECS", 10)?),
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:8000"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub answerer: Arc<Answerer>,
}
