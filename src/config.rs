//! Process configuration read from the environment.
//!
//! `.env` is loaded by `main` before `Config::from_env` runs, so every value
//! here may come from either source.

use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_IDLE_TTL_SECS: u64 = 0;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidVar { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: String,
    pub port: u16,
    /// Idle matches older than this are evicted. `None` keeps them forever.
    pub match_idle_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.into(),
            port: DEFAULT_PORT,
            match_idle_ttl: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Read `ADDR`, `PORT`, `MATCH_IDLE_TTL_SECS` and
    /// `MATCH_SWEEP_INTERVAL_SECS`. Unset or empty variables take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidVar` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env_string("ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let port = env_parse("PORT", DEFAULT_PORT)?;
        let ttl_secs = env_parse("MATCH_IDLE_TTL_SECS", DEFAULT_IDLE_TTL_SECS)?;
        let sweep_secs = env_parse("MATCH_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        Ok(Self {
            addr,
            port,
            match_idle_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env_string(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidVar { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
