//! Runtime configuration, read from the process environment (and `.env`).

use anyhow::{Context, Result};
use std::net::SocketAddr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const DEFAULT_USER_AGENT: &str = concat!("lunaflow-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` runs the server against the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub advisory: AdvisoryConfig,
    pub locator: LocatorConfig,
}

#[derive(Clone, Debug)]
pub struct AdvisoryConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct LocatorConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("invalid BIND_ADDR")?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("invalid DATABASE_MAX_CONNECTIONS")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let api_key = get("GEMINI_API_KEY").filter(|k| k != "PLACEHOLDER_API_KEY");

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            max_connections,
            advisory: AdvisoryConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            },
            locator: LocatorConfig {
                nominatim_url: get("NOMINATIM_URL")
                    .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string()),
                overpass_url: get("OVERPASS_URL")
                    .unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_string()),
                user_agent: get("HTTP_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
        })
    }
}
