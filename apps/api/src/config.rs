use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::pipeline::store::{DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_TTL};
use crate::pipeline::StageErrorPolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// What the runner does after a stage writes an error sentinel.
    pub stage_error_policy: StageErrorPolicy,
    /// Per-request timeout for completion calls.
    pub llm_timeout: Duration,
    /// Most session records kept in memory before the oldest is evicted.
    pub session_capacity: usize,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            stage_error_policy: parse_policy(std::env::var("STAGE_ERROR_POLICY").ok().as_deref())?,
            llm_timeout: Duration::from_secs(parse_positive(
                "LLM_TIMEOUT_SECS",
                std::env::var("LLM_TIMEOUT_SECS").ok().as_deref(),
                120,
            )?),
            session_capacity: parse_positive(
                "SESSION_CAPACITY",
                std::env::var("SESSION_CAPACITY").ok().as_deref(),
                DEFAULT_SESSION_CAPACITY as u64,
            )? as usize,
            session_ttl: Duration::from_secs(parse_positive(
                "SESSION_TTL_SECS",
                std::env::var("SESSION_TTL_SECS").ok().as_deref(),
                DEFAULT_SESSION_TTL.as_secs(),
            )?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Parses a non-zero whole number, falling back to `default` when unset.
fn parse_positive(key: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number"))?;
    if value == 0 {
        return Err(anyhow!("{key} must be greater than zero"));
    }
    Ok(value)
}

fn parse_policy(raw: Option<&str>) -> Result<StageErrorPolicy> {
    match raw {
        None => Ok(StageErrorPolicy::default()),
        Some(value) => value
            .parse()
            .map_err(|e: String| anyhow!(e))
            .context("STAGE_ERROR_POLICY is invalid"),
    }
}
