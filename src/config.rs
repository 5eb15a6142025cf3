//! Runtime configuration, read from the environment (and `.env` via dotenv).

use crate::error::{AgentError, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SCHEMA: &str = "dbo";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub bind_addr: String,
    /// Ceiling on one chat response, from request to the final fragment
    pub chat_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Schema whose views make up the catalog
    pub schema: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub host: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AgentError::Config("DATABASE_URL is not set".to_string()))?;

        let database = DatabaseConfig {
            url,
            schema: lookup("WAREHOUSE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30)?),
        };

        let defaults = ModelConfig::default();
        let model = ModelConfig {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            temperature: parse_or(&lookup, "MODEL_TEMPERATURE", defaults.temperature)?,
            top_p: parse_or(&lookup, "MODEL_TOP_P", defaults.top_p)?,
        };

        Ok(Self {
            database,
            model,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            chat_timeout: Duration::from_secs(parse_or(&lookup, "CHAT_TIMEOUT_SECS", 30)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
