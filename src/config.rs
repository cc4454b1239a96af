use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::rate_limit::RateLimitPolicy;

pub const DEFAULT_GIPHY_API_URL: &str = "http://api.giphy.com/v1/gifs/search";

/// Per-host call quotas as `(calls, seconds)`. Hosts missing here are not limited.
const DEFAULT_RATE_LIMITS: &[(&str, u32, u64)] = &[
    ("api.urbandictionary.com", 2, 60),
    ("api.openai.com", 3, 60),
    ("www.googleapis.com", 5, 60),
    ("ipinfo.io", 1, 30),
    ("api.open-notify.org", 1, 60),
    ("geocode.xyz", 1, 60),
    ("v2.jokeapi.dev", 10, 60),
    ("api.kanye.rest", 1, 60),
    ("newsapi.org", 1, 30),
    ("accounts.spotify.com", 3, 60),
    ("api.spotify.com", 3, 60),
    ("api.mymemory.translated.net", 1, 60),
    ("api.openweathermap.org", 3, 60),
    ("api.wolframalpha.com", 3, 60),
    ("xkcd.com", 5, 60),
    ("api.github.com", 3, 60),
    ("api.giphy.com", 3, 60),
    ("strawpoll.com", 3, 60),
    ("api.thecatapi.com", 10, 60),
];

/// Settings for the shared HTTP facade.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub cache_length: usize,
    pub cache_age: Duration,
    pub rate_limits: HashMap<String, RateLimitPolicy>,
    /// Applied to hosts absent from `rate_limits`. `None` leaves them unlimited.
    pub default_rate_limit: Option<RateLimitPolicy>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cache_length: 100,
            cache_age: Duration::from_secs(30),
            rate_limits: default_rate_limits(),
            default_rate_limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub discord_public_key: String,
    pub discord_bot_token: String,
    pub discord_application_id: u64,
    pub giphy_api_key: Option<String>,
    pub giphy_api_url: String,
    pub http: HttpConfig,
    pub confirm_timeout: Duration,
    pub gateway_enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut http = HttpConfig {
            cache_length: optional("HTTP_CACHE_LENGTH", 100)?,
            cache_age: Duration::from_secs(optional("HTTP_CACHE_SECONDS", 30)?),
            ..HttpConfig::default()
        };
        if let Ok(spec) = env::var("HTTP_RATE_LIMITS") {
            http.rate_limits.extend(parse_rate_limits(&spec)?);
        }
        if let Ok(spec) = env::var("HTTP_DEFAULT_RATE_LIMIT") {
            http.default_rate_limit = Some(parse_policy(&spec)?);
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            discord_public_key: required("DISCORD_PUBLIC_KEY")?,
            discord_bot_token: required("DISCORD_BOT_TOKEN")?,
            discord_application_id: required("DISCORD_APPLICATION_ID")?
                .parse()
                .map_err(|_| Error::Config("DISCORD_APPLICATION_ID must be a valid u64".into()))?,
            giphy_api_key: env::var("GIPHY_API_KEY").ok().filter(|k| !k.is_empty()),
            giphy_api_url: env::var("GIPHY_API_URL")
                .unwrap_or_else(|_| DEFAULT_GIPHY_API_URL.into()),
            http,
            confirm_timeout: Duration::from_secs(optional("CONFIRM_TIMEOUT_SECONDS", 60)?),
            gateway_enabled: optional("GATEWAY_ENABLED", true)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: optional("PORT", 3000)?,
        })
    }
}

pub fn default_rate_limits() -> HashMap<String, RateLimitPolicy> {
    DEFAULT_RATE_LIMITS
        .iter()
        .map(|(host, calls, secs)| {
            (
                host.to_string(),
                RateLimitPolicy::new(*calls, Duration::from_secs(*secs)),
            )
        })
        .collect()
}

/// Parses `host=calls/secs` pairs separated by commas.
pub fn parse_rate_limits(spec: &str) -> Result<HashMap<String, RateLimitPolicy>> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(String, RateLimitPolicy)> {
            let (host, policy) = entry
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("rate limit `{entry}` must be host=calls/secs")))?;
            Ok((host.trim().to_lowercase(), parse_policy(policy)?))
        })
        .collect()
}

fn parse_policy(spec: &str) -> Result<RateLimitPolicy> {
    let invalid = || Error::Config(format!("rate limit policy `{spec}` must be calls/secs"));
    let (calls, secs) = spec.trim().split_once('/').ok_or_else(invalid)?;
    let calls: u32 = calls.trim().parse().map_err(|_| invalid())?;
    let secs: u64 = secs.trim().parse().map_err(|_| invalid())?;
    if calls == 0 || secs == 0 {
        return Err(invalid());
    }
    Ok(RateLimitPolicy::new(calls, Duration::from_secs(secs)))
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config(format!("{key} required")))
}

fn optional<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {value}"))),
        Err(_) => Ok(default),
    }
}
