use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{Config, LookupError, WeatherResult};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider error text that means the query did not resolve to any place.
const NOT_FOUND_MARKER: &str = "No matching location found";

/// Client for the WeatherAPI.com `current.json` endpoint.
///
/// One lookup is exactly one GET: no retries and no caching.
#[derive(Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    lang: String,
    timeout: Duration,
    http: Client,
}

impl std::fmt::Debug for WeatherApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiClient")
            .field("base_url", &self.base_url)
            .field("lang", &self.lang)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl WeatherApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_weather_api_key()?;

        Ok(Self::new(api_key.to_owned())
            .with_base_url(&config.weather_api_url)
            .with_lang(&config.lang)
            .with_timeout(config.timeout))
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = base_url.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch_current(&self, location: &str) -> Result<WeatherResult, LookupError> {
        let url = format!("{}/current.json", self.base_url);
        debug!(%url, location, lang = %self.lang, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("lang", self.lang.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = res.status();
        debug!(status = status.as_u16(), "WeatherAPI responded");

        if !status.is_success() {
            return Err(LookupError::HttpError(status.as_u16()));
        }

        let body = res.text().await.map_err(network_error)?;
        debug!(body = %truncate_body(&body), "WeatherAPI response body");

        classify_body(&body)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn lookup(&self, location: &str) -> Result<WeatherResult, LookupError> {
        self.fetch_current(location).await
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

/// Turns a successful (2xx) response body into a result or a classified error.
fn classify_body(body: &str) -> Result<WeatherResult, LookupError> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        warn!(error = %err, "WeatherAPI body is not valid JSON");
        LookupError::ParseError
    })?;

    if let Some(provider_error) = value.get("error") {
        let message =
            provider_error.get("message").and_then(Value::as_str).ok_or(LookupError::ParseError)?;

        if message.contains(NOT_FOUND_MARKER) {
            return Err(LookupError::NotFound);
        }
        return Err(LookupError::ApiError(message.to_string()));
    }

    let parsed: WaResponse = serde_json::from_value(value).map_err(|err| {
        warn!(error = %err, "WeatherAPI body is missing required fields");
        LookupError::ParseError
    })?;

    Ok(WeatherResult {
        location: parsed.location.name,
        country: parsed.location.country,
        temp_c: parsed.current.temp_c,
        condition: parsed.current.condition.text,
        // WeatherAPI hands out scheme-relative icon paths ("//cdn.weatherapi.com/...").
        icon_url: format!("http:{}", parsed.current.condition.icon),
        observed_at: parsed.current.last_updated_epoch.and_then(unix_to_utc),
    })
}

fn network_error(err: reqwest::Error) -> LookupError {
    // The request URL carries the API key.
    let err = err.without_url();
    error!(error = %err, timeout = err.is_timeout(), "Network error talking to WeatherAPI");
    LookupError::NetworkError
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 500;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
