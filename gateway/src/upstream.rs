//! Third-party HTTP providers
//!
//! One method per upstream call. Responses come back as raw JSON; the
//! route handlers pick out the fields they expose. No retries and no
//! caching: a failure surfaces straight to the caller.

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{ApiKeys, GatewayConfig, UpstreamUrls};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("{provider} returned an unexpected body: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

pub const REST_COUNTRIES: &str = "restcountries";
pub const OPENWEATHER: &str = "openweather";
pub const EXCHANGERATE: &str = "exchangerate";
pub const WIKIPEDIA: &str = "wikipedia";
pub const NEWS: &str = "newsapi";
pub const OPENCAGE: &str = "opencage";

pub struct UpstreamClient {
    client: reqwest::Client,
    urls: UpstreamUrls,
    keys: ApiKeys,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            urls: config.urls.clone(),
            keys: config.keys.clone(),
        })
    }

    async fn send(&self, provider: &'static str, request: RequestBuilder) -> UpstreamResult<Option<Value>> {
        let response = request
            .send()
            .await
            .map_err(|source| UpstreamError::Request { provider, source })?;

        let status = response.status();
        debug!("{} responded {}", provider, status);
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider,
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|e| UpstreamError::Parse {
                provider,
                message: e.to_string(),
            })
    }

    /// Like [`send`](Self::send) but a 404 is an error too.
    async fn send_required(&self, provider: &'static str, request: RequestBuilder) -> UpstreamResult<Value> {
        self.send(provider, request)
            .await?
            .ok_or(UpstreamError::Status {
                provider,
                status: StatusCode::NOT_FOUND.as_u16(),
            })
    }

    /// Every country with `name` and `cca2`.
    pub async fn all_countries(&self) -> UpstreamResult<Vec<Value>> {
        let url = format!("{}/all", self.urls.rest_countries);
        let body = self
            .send_required(REST_COUNTRIES, self.client.get(url).query(&[("fields", "name,cca2")]))
            .await?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(UpstreamError::Parse {
                provider: REST_COUNTRIES,
                message: format!("expected an array, got {}", kind_of(&other)),
            }),
        }
    }

    /// One country by ISO code, restricted to `fields`. `None` when the
    /// provider does not know the code.
    ///
    /// The provider answers with either a bare object or a one-element
    /// array depending on the query; both are accepted.
    pub async fn country(&self, code: &str, fields: &str) -> UpstreamResult<Option<Value>> {
        let url = format!("{}/alpha/{}", self.urls.rest_countries, code);
        let body = self
            .send(REST_COUNTRIES, self.client.get(url).query(&[("fields", fields)]))
            .await?;
        Ok(match body {
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(Value::Object(map)) if map.is_empty() => None,
            other => other,
        })
    }

    /// Five-day / three-hour forecast for a city, metric units.
    pub async fn forecast(&self, city: &str) -> UpstreamResult<Value> {
        let url = format!("{}/forecast", self.urls.openweather);
        let request = self.client.get(url).query(&[
            ("q", city),
            ("appid", self.keys.openweather.as_str()),
            ("units", "metric"),
        ]);
        self.send_required(OPENWEATHER, request).await
    }

    pub async fn pair_conversion(&self, from: &str, to: &str, amount: f64) -> UpstreamResult<Value> {
        let url = format!(
            "{}/{}/pair/{}/{}/{}",
            self.urls.exchangerate, self.keys.exchangerate, from, to, amount
        );
        self.send_required(EXCHANGERATE, self.client.get(url)).await
    }

    /// Full USD conversion-rate table.
    pub async fn usd_rates(&self) -> UpstreamResult<Value> {
        let url = format!("{}/{}/latest/USD", self.urls.exchangerate, self.keys.exchangerate);
        self.send_required(EXCHANGERATE, self.client.get(url)).await
    }

    /// Plain-text intro extract of the article titled `title`.
    pub async fn wikipedia_extract(&self, title: &str) -> UpstreamResult<Value> {
        let request = self.client.get(&self.urls.wikipedia).query(&[
            ("action", "query"),
            ("format", "json"),
            ("prop", "extracts"),
            ("exintro", "true"),
            ("explaintext", "true"),
            ("redirects", "1"),
            ("titles", title),
        ]);
        self.send_required(WIKIPEDIA, request).await
    }

    pub async fn top_headlines(&self, country: &str) -> UpstreamResult<Value> {
        let url = format!("{}/top-headlines", self.urls.news);
        let request = self.client.get(url).query(&[
            ("country", country),
            ("apiKey", self.keys.news.as_str()),
            ("pageSize", "5"),
        ]);
        self.send_required(NEWS, request).await
    }

    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> UpstreamResult<Value> {
        let url = format!("{}/json", self.urls.opencage);
        let request = self.client.get(url).query(&[
            ("q", format!("{},{}", lat, lon)),
            ("key", self.keys.opencage.clone()),
            ("no_annotations", "1".to_string()),
        ]);
        self.send_required(OPENCAGE, request).await
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse failure for `provider`, for handlers that find a body missing a
/// field they rely on.
pub fn malformed(provider: &'static str, message: impl Into<String>) -> UpstreamError {
    UpstreamError::Parse {
        provider,
        message: message.into(),
    }
}
