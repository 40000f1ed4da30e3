use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{config_error, Error};
use crate::jobs::PollPolicy;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_SIGNAL_RADIUS_M: f64 = 200.0;
pub const DEFAULT_NEARBY_SIGNALS_RADIUS_M: u32 = 500;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base address of the analysis backend, e.g. `http://localhost:8000`.
    pub api_base: String,
    pub poll: PollPolicy,
    pub signal_radius_m: f64,
    pub nearby_signals_radius_m: u32,
    pub http_timeout: Duration,
}

impl Config {
    pub fn new<S: Into<String>>(api_base: S) -> Self {
        Self {
            api_base: api_base.into(),
            poll: PollPolicy::default(),
            signal_radius_m: DEFAULT_SIGNAL_RADIUS_M,
            nearby_signals_radius_m: DEFAULT_NEARBY_SIGNALS_RADIUS_M,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Loads `.env` when present, then reads the process environment.
    #[tracing::instrument(name = "Config::from_env")]
    pub fn from_env() -> Result<Self, Error> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!("no .env loaded: {}", err);
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("ROUTE_API_BASE")
            .ok_or_else(|| config_error("ROUTE_API_BASE is not set"))?;

        let mut config = Config::new(api_base.trim_end_matches('/'));

        let interval_ms = parse_or(&lookup, "ROUTE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        config.poll.interval = Duration::from_millis(interval_ms);
        config.poll.max_attempts =
            parse_or(&lookup, "ROUTE_POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS)?;
        config.poll.transport_retries = parse_or(&lookup, "ROUTE_POLL_TRANSPORT_RETRIES", 0)?;
        config.signal_radius_m = parse_or(&lookup, "SIGNAL_RADIUS_M", DEFAULT_SIGNAL_RADIUS_M)?;
        config.nearby_signals_radius_m = parse_or(
            &lookup,
            "NEARBY_SIGNALS_RADIUS_M",
            DEFAULT_NEARBY_SIGNALS_RADIUS_M,
        )?;
        config.http_timeout = Duration::from_secs(parse_or(
            &lookup,
            "HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        if config.poll.max_attempts == 0 {
            return Err(config_error("ROUTE_POLL_MAX_ATTEMPTS must be positive"));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| config_error(format!("{} has an invalid value: {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("ROUTE_API_BASE", "http://api/")])).unwrap();

        assert_eq!(config.api_base, "http://api");
        assert_eq!(config.poll.interval, Duration::from_millis(2000));
        assert_eq!(config.poll.max_attempts, 60);
        assert_eq!(config.poll.transport_retries, 0);
        assert_eq!(config.signal_radius_m, 200.0);
        assert_eq!(config.nearby_signals_radius_m, 500);
    }

    #[test]
    fn overrides_and_rejects_garbage() {
        let config = Config::from_lookup(lookup(&[
            ("ROUTE_API_BASE", "http://api"),
            ("ROUTE_POLL_INTERVAL_MS", "1500"),
            ("ROUTE_POLL_MAX_ATTEMPTS", "40"),
        ]))
        .unwrap();
        assert_eq!(config.poll.interval, Duration::from_millis(1500));
        assert_eq!(config.poll.max_attempts, 40);

        let err = Config::from_lookup(lookup(&[
            ("ROUTE_API_BASE", "http://api"),
            ("SIGNAL_RADIUS_M", "far"),
        ]))
        .unwrap_err();
        assert_eq!(err.code, 1);

        assert!(Config::from_lookup(lookup(&[])).is_err());
    }
}
