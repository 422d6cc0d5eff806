//! Gateway configuration from the environment

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;

/// Base URLs of the upstream providers. Overridable so tests can point
/// them at a local mock.
#[derive(Debug, Clone)]
pub struct UpstreamUrls {
    pub rest_countries: String,
    pub openweather: String,
    pub exchangerate: String,
    pub wikipedia: String,
    pub news: String,
    pub opencage: String,
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        Self {
            rest_countries: "https://restcountries.com/v3.1".to_string(),
            openweather: "https://api.openweathermap.org/data/2.5".to_string(),
            exchangerate: "https://v6.exchangerate-api.com/v6".to_string(),
            wikipedia: "https://en.wikipedia.org/w/api.php".to_string(),
            news: "https://newsapi.org/v2".to_string(),
            opencage: "https://api.opencagedata.com/geocode/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openweather: String,
    pub exchangerate: String,
    pub news: String,
    pub opencage: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub urls: UpstreamUrls,
    pub keys: ApiKeys,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("data"),
            static_dir: None,
            timeout: Duration::from_secs(10),
            urls: UpstreamUrls::default(),
            keys: ApiKeys::default(),
        }
    }
}

impl GatewayConfig {
    /// Read the process environment, after loading `.env` if present.
    pub fn from_env() -> Self {
        // A missing .env is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("GAZETTEER_PORT")
            .or_else(|| var("PORT"))
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);
        let timeout = var("UPSTREAM_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let urls = UpstreamUrls {
            rest_countries: var("REST_COUNTRIES_URL").unwrap_or(defaults.urls.rest_countries),
            openweather: var("OPENWEATHER_URL").unwrap_or(defaults.urls.openweather),
            exchangerate: var("EXCHANGERATE_URL").unwrap_or(defaults.urls.exchangerate),
            wikipedia: var("WIKIPEDIA_URL").unwrap_or(defaults.urls.wikipedia),
            news: var("NEWS_URL").unwrap_or(defaults.urls.news),
            opencage: var("OPENCAGE_URL").unwrap_or(defaults.urls.opencage),
        };

        let keys = ApiKeys {
            openweather: var("OPENWEATHER_API_KEY").unwrap_or_default(),
            exchangerate: var("EXCHANGERATE_API_KEY").unwrap_or_default(),
            news: var("NEWS_API_KEY").unwrap_or_default(),
            opencage: var("OPENCAGE_API_KEY").unwrap_or_default(),
        };

        Self {
            port,
            data_dir: var("GAZETTEER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            static_dir: var("GAZETTEER_STATIC_DIR").map(PathBuf::from),
            timeout,
            urls,
            keys,
        }
    }

    /// Names of upstream keys that are not configured.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("OPENWEATHER_API_KEY", &self.keys.openweather),
            ("EXCHANGERATE_API_KEY", &self.keys.exchangerate),
            ("NEWS_API_KEY", &self.keys.news),
            ("OPENCAGE_API_KEY", &self.keys.opencage),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}
