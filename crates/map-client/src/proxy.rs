//! Proxy HTTP client and the wire types it returns

use crate::{ClientError, Result};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection};
use marker_cluster::OverlayKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Entry of the country dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub country: String,
    pub country_code: String,
}

/// Country facts panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryFacts {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub region: String,
    pub capital: String,
    #[serde(default)]
    pub population: u64,
    pub currency: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    pub languages: String,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub latlng: Vec<f64>,
}

impl CountryFacts {
    /// Capital city to fetch weather for, if the country has one.
    pub fn weather_city(&self) -> Option<&str> {
        let capital = self.capital.trim();
        (!capital.is_empty() && capital != "N/A").then_some(capital)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

/// USD to local currency quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyQuote {
    pub currency: CurrencyInfo,
    pub base: String,
    pub rate: f64,
    pub amount: f64,
    pub converted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiSummary {
    pub extract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_pct: Option<f64>,
    pub wind_kmh: Option<f64>,
    pub summary: String,
    pub description: String,
    pub icon: String,
}

/// Weather panel, reduced from the forecast payload the proxy passes
/// through: the first slot is "now", then one slot per following day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub current: ForecastSlot,
    pub outlook: Vec<ForecastSlot>,
}

/// Forecast entries are 3 hours apart.
const SLOTS_PER_DAY: usize = 8;
const OUTLOOK_DAYS: usize = 3;

#[derive(Deserialize)]
struct RawForecast {
    #[serde(default)]
    list: Vec<RawSlot>,
    city: Option<RawCity>,
}

#[derive(Deserialize)]
struct RawCity {
    name: String,
}

#[derive(Deserialize)]
struct RawSlot {
    dt: i64,
    main: RawMain,
    #[serde(default)]
    weather: Vec<RawCondition>,
    wind: Option<RawWind>,
}

#[derive(Deserialize)]
struct RawMain {
    temp: f64,
    humidity: Option<f64>,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Deserialize)]
struct RawWind {
    speed: f64,
}

impl RawSlot {
    fn into_slot(self) -> Result<ForecastSlot> {
        let time = DateTime::from_timestamp(self.dt, 0)
            .ok_or_else(|| ClientError::Parse(format!("forecast timestamp {}", self.dt)))?;
        let condition = self.weather.into_iter().next();
        let (summary, description, icon) = condition
            .map(|c| (c.main, c.description, c.icon))
            .unwrap_or_default();
        Ok(ForecastSlot {
            time,
            temperature_c: self.main.temp,
            humidity_pct: self.main.humidity,
            // m/s to km/h
            wind_kmh: self.wind.map(|w| w.speed * 3.6),
            summary,
            description,
            icon,
        })
    }
}

impl WeatherReport {
    pub fn from_forecast(requested_city: &str, payload: serde_json::Value) -> Result<Self> {
        let raw: RawForecast =
            serde_json::from_value(payload).map_err(|e| ClientError::Parse(e.to_string()))?;
        let city = raw
            .city
            .map(|c| c.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| requested_city.to_string());

        let mut slots: Vec<Option<RawSlot>> = raw.list.into_iter().map(Some).collect();
        let current = slots
            .first_mut()
            .and_then(Option::take)
            .ok_or_else(|| ClientError::Parse("forecast has no entries".to_string()))?
            .into_slot()?;

        let mut outlook = Vec::with_capacity(OUTLOOK_DAYS);
        for day in 1..=OUTLOOK_DAYS {
            match slots.get_mut(day * SLOTS_PER_DAY).and_then(Option::take) {
                Some(slot) => outlook.push(slot.into_slot()?),
                None => break,
            }
        }

        Ok(Self {
            city,
            current,
            outlook,
        })
    }
}

#[derive(Deserialize)]
struct RawNews {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: String,
    description: Option<String>,
    #[serde(default)]
    url: String,
    source: Option<RawSource>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawSource {
    name: Option<String>,
}

pub fn headlines_from_payload(payload: serde_json::Value) -> Result<Vec<NewsHeadline>> {
    let raw: RawNews =
        serde_json::from_value(payload).map_err(|e| ClientError::Parse(e.to_string()))?;
    Ok(raw
        .articles
        .into_iter()
        .filter(|a| !a.title.is_empty())
        .map(|a| NewsHeadline {
            title: a.title,
            description: a.description.filter(|d| !d.is_empty()),
            url: a.url,
            source: a.source.and_then(|s| s.name),
            published_at: a.published_at,
        })
        .collect())
}

/// Everything the map needs from the proxy. Futures are `Send` so each
/// call can run on its own task.
pub trait GazetteerApi: Send + Sync + 'static {
    fn countries(&self) -> impl Future<Output = Result<Vec<CountryEntry>>> + Send;

    fn geocode(&self, lat: f64, lon: f64) -> impl Future<Output = Result<GeocodeResult>> + Send;

    fn boundary(&self, code: &str) -> impl Future<Output = Result<Feature>> + Send;

    fn country_info(&self, code: &str) -> impl Future<Output = Result<CountryFacts>> + Send;

    fn weather(&self, city: &str) -> impl Future<Output = Result<WeatherReport>> + Send;

    fn wikipedia(&self, country_name: &str) -> impl Future<Output = Result<WikiSummary>> + Send;

    fn news(&self, code: &str) -> impl Future<Output = Result<Vec<NewsHeadline>>> + Send;

    fn currency(&self, code: &str, amount: f64) -> impl Future<Output = Result<CurrencyQuote>> + Send;

    fn overlay(
        &self,
        kind: OverlayKind,
        code: &str,
    ) -> impl Future<Output = Result<FeatureCollection>> + Send;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// [`GazetteerApi`] over HTTP against the gateway.
pub struct ProxyClient {
    config: ClientConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ProxyClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("{} returned {}", path, status));
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

impl GazetteerApi for ProxyClient {
    async fn countries(&self) -> Result<Vec<CountryEntry>> {
        self.get_json("/api/countries", &[]).await
    }

    async fn geocode(&self, lat: f64, lon: f64) -> Result<GeocodeResult> {
        self.get_json(
            "/api/geocode",
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
        )
        .await
    }

    async fn boundary(&self, code: &str) -> Result<Feature> {
        self.get_json(&format!("/api/country-boundary/{}", code), &[])
            .await
    }

    async fn country_info(&self, code: &str) -> Result<CountryFacts> {
        self.get_json(&format!("/api/country-info/{}", code), &[]).await
    }

    async fn weather(&self, city: &str) -> Result<WeatherReport> {
        let payload = self
            .get_json("/api/weather", &[("city", city.to_string())])
            .await?;
        WeatherReport::from_forecast(city, payload)
    }

    async fn wikipedia(&self, country_name: &str) -> Result<WikiSummary> {
        self.get_json("/api/wikipedia", &[("country", country_name.to_string())])
            .await
    }

    async fn news(&self, code: &str) -> Result<Vec<NewsHeadline>> {
        let payload = self
            .get_json("/api/news", &[("country", code.to_lowercase())])
            .await?;
        headlines_from_payload(payload)
    }

    async fn currency(&self, code: &str, amount: f64) -> Result<CurrencyQuote> {
        self.get_json(
            "/api/currency",
            &[("country", code.to_string()), ("amount", amount.to_string())],
        )
        .await
    }

    async fn overlay(&self, kind: OverlayKind, code: &str) -> Result<FeatureCollection> {
        self.get_json(&format!("/api/{}/{}", kind.as_str(), code), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(dt: i64, temp: f64, main: &str) -> serde_json::Value {
        json!({
            "dt": dt,
            "main": {"temp": temp, "humidity": 70},
            "weather": [{"main": main, "description": main.to_lowercase(), "icon": "04d"}],
            "wind": {"speed": 5.0}
        })
    }

    #[test]
    fn test_weather_report_from_forecast() {
        let list: Vec<_> = (0..40)
            .map(|i| slot(1_700_000_000 + i * 10_800, 10.0 + i as f64, "Clouds"))
            .collect();
        let payload = json!({"city": {"name": "London"}, "list": list});

        let report = WeatherReport::from_forecast("london", payload).unwrap();
        assert_eq!(report.city, "London");
        assert_eq!(report.current.temperature_c, 10.0);
        assert_eq!(report.current.wind_kmh, Some(18.0));
        assert_eq!(report.current.description, "clouds");
        assert_eq!(report.outlook.len(), 3);
        assert_eq!(report.outlook[0].temperature_c, 18.0);
        assert_eq!(report.outlook[2].temperature_c, 34.0);
    }

    #[test]
    fn test_weather_report_short_forecast() {
        let payload = json!({"list": [slot(1_700_000_000, 3.5, "Rain")]});
        let report = WeatherReport::from_forecast("Oslo", payload).unwrap();
        assert_eq!(report.city, "Oslo");
        assert!(report.outlook.is_empty());

        let empty = WeatherReport::from_forecast("Oslo", json!({"list": []}));
        assert!(matches!(empty, Err(ClientError::Parse(_))));
    }

    #[test]
    fn test_headlines_from_payload() {
        let payload = json!({
            "status": "ok",
            "articles": [
                {"title": "Budget announced", "description": "", "url": "https://example.org/a",
                 "source": {"id": null, "name": "Example News"}, "publishedAt": "2024-03-01T09:30:00Z"},
                {"title": "", "url": "https://example.org/removed"},
                {"title": "Rail strike ends", "url": "https://example.org/b"}
            ]
        });
        let headlines = headlines_from_payload(payload).unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].source.as_deref(), Some("Example News"));
        assert_eq!(headlines[0].description, None);
        assert!(headlines[0].published_at.is_some());
        assert_eq!(headlines[1].title, "Rail strike ends");
    }

    #[test]
    fn test_country_facts_weather_city() {
        let mut facts: CountryFacts = serde_json::from_value(json!({
            "name": "United Kingdom", "code": "GB", "capital": "London",
            "currency": "British pound", "currencyCode": "GBP", "languages": "English"
        }))
        .unwrap();
        assert_eq!(facts.weather_city(), Some("London"));
        assert_eq!(facts.currency_code.as_deref(), Some("GBP"));

        facts.capital = "N/A".to_string();
        assert_eq!(facts.weather_city(), None);
    }

    #[test]
    fn test_url_join() {
        let client = ProxyClient::new(ClientConfig {
            base_url: "http://127.0.0.1:3000/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("/api/countries"), "http://127.0.0.1:3000/api/countries");
    }
}
