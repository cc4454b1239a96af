use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::http::cache::{cache_key, CachedResponse, ResponseCache};
use crate::http::rate_limit::RateLimiter;
use crate::http::response::{HttpResponse, JsonResponse, RawResponse};

const USER_AGENT: &str = concat!("supportbot/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call switches for [`HttpClient::call`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Serve a GET from the cache when a fresh entry exists.
    pub use_cache: bool,
    /// Return `{status, text}` instead of parsed JSON.
    pub get_raw_response: bool,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    pub fn raw(mut self) -> Self {
        self.get_raw_response = true;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// Shared client for third-party REST APIs.
///
/// Every call is checked against the per-host rate limiter before anything
/// goes on the wire; GET responses are cached under the normalized URL.
pub struct HttpClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    cache: ResponseCache,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.rate_limits.clone(), config.default_rate_limit),
            cache: ResponseCache::new(config.cache_length, config.cache_age),
        })
    }

    pub async fn get(&self, url: &str, options: CallOptions) -> Result<HttpResponse> {
        self.call(Method::GET, url, options).await
    }

    pub async fn call(
        &self,
        method: Method,
        url: &str,
        options: CallOptions,
    ) -> Result<HttpResponse> {
        let host = host_of(url)?;
        self.limiter.check(&host)?;

        let url = normalize_url(url);
        let key = cache_key(&url, &options.params);
        let log_key = redact(&url, &options.params);
        let is_get = method == Method::GET;

        if options.use_cache && is_get {
            if let Some(cached) = self.cache.get(&key) {
                info!(cache_key = %log_key, "Retrieving cached HTTP GET response");
                return Ok(normalize(&method, &log_key, cached, options.get_raw_response));
            }
        }

        info!(cache_key = %log_key, "Making HTTP {} request", method);
        let mut request = self.client.request(method.clone(), url.as_str());
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        // Reading the whole body hands the connection back to the pool
        // whether or not decoding succeeds later.
        let response = request.send().await?;
        let fetched = CachedResponse {
            status: response.status().as_u16(),
            body: response.bytes().await?,
        };

        if is_get {
            self.cache.put(key, fetched.clone());
            debug!(cache_key = %log_key, entries = self.cache.len(), "Stored HTTP GET response");
        }

        Ok(normalize(&method, &log_key, fetched, options.get_raw_response))
    }
}

/// Authority used to partition rate limits: `host` or `host:port`.
///
/// A port equal to the scheme default is dropped, so `http://x:80` and
/// `http://x` share one quota.
pub fn host_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(format!("{url}: no host")))?
        .to_lowercase();
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Query parameters whose values never reach the logs
const SECRET_PARAMS: &[&str] = &["api_key", "apikey", "key", "token", "access_token"];

/// The cache key with credential values masked, for logging.
pub fn redact(url: &str, params: &[(String, String)]) -> String {
    let masked: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| {
            if SECRET_PARAMS.contains(&name.to_lowercase().as_str()) {
                (name.clone(), "***".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect();
    cache_key(url, &masked)
}

pub fn normalize_url(url: &str) -> String {
    url.replace(' ', "%20").replace('+', "%2b")
}

fn normalize(
    method: &Method,
    cache_key: &str,
    response: CachedResponse,
    get_raw_response: bool,
) -> HttpResponse {
    if get_raw_response {
        return HttpResponse::Raw(RawResponse {
            status: response.status,
            text: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(body) => HttpResponse::Json(JsonResponse {
            status_code: response.status,
            body,
        }),
        Err(e) => {
            error!(%method, cache_key, error = %e, "HTTP response body is not valid JSON");
            HttpResponse::Json(JsonResponse::empty(response.status))
        }
    }
}
