use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use gazetteer_gateway::config::{ApiKeys, UpstreamUrls};
use gazetteer_gateway::{build_router, AppState, GatewayConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

type Params = Query<HashMap<String, String>>;

const BORDERS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"ADMIN": "United Kingdom", "ISO_A2": "GB"},
         "geometry": {"type": "Polygon", "coordinates": [[[-8.6, 49.9], [1.8, 49.9], [1.8, 60.8], [-8.6, 60.8], [-8.6, 49.9]]]}},
        {"type": "Feature", "properties": {"ADMIN": "France", "ISO_A2": "FR"},
         "geometry": {"type": "Polygon", "coordinates": [[[-4.8, 42.3], [8.2, 42.3], [8.2, 51.1], [-4.8, 51.1], [-4.8, 42.3]]]}}
    ]
}"#;

const AIRPORTS: &str = r#"507,"London Heathrow Airport","London","United Kingdom","LHR","EGLL",51.4706,-0.461941,83,0,"E","Europe/London","airport","OurAirports"
502,"Gatwick Airport","London","United Kingdom","LGW","EGKK",51.148102,-0.190278,202,0,"E","Europe/London","airport","OurAirports"
1382,"Charles de Gaulle International Airport","Paris","France","CDG","LFPG",49.012798,2.55,392,1,"E","Europe/Paris","airport","OurAirports"
"#;

const CITIES: &str = "\"city\",\"city_ascii\",\"lat\",\"lng\",\"country\",\"iso2\",\"iso3\",\"admin_name\",\"capital\",\"population\",\"id\"
\"London\",\"London\",\"51.5072\",\"-0.1275\",\"United Kingdom\",\"GB\",\"GBR\",\"London, City of\",\"primary\",\"11262000\",\"1826645935\"
\"Manchester\",\"Manchester\",\"53.4794\",\"-2.2453\",\"United Kingdom\",\"GB\",\"GBR\",\"Manchester\",\"\",\"2705000\",\"1826246369\"
\"Paris\",\"Paris\",\"48.8567\",\"2.3522\",\"France\",\"FR\",\"FRA\",\"Île-de-France\",\"primary\",\"11060000\",\"1250015082\"
";

fn country_record(code: &str) -> Option<Value> {
    match code {
        "GB" => Some(json!({
            "name": {"common": "United Kingdom", "official": "United Kingdom of Great Britain and Northern Ireland"},
            "cca2": "GB",
            "flags": {"png": "https://flagcdn.com/w320/gb.png"},
            "region": "Europe",
            "capital": ["London"],
            "population": 67215293,
            "currencies": {"GBP": {"name": "British pound", "symbol": "£"}},
            "languages": {"eng": "English"},
            "area": 242900.0,
            "latlng": [54.0, -2.0]
        })),
        "FR" => Some(json!({
            "name": {"common": "France"},
            "cca2": "FR",
            "capital": ["Paris"],
            "currencies": {"EUR": {"name": "Euro", "symbol": "€"}}
        })),
        "AQ" => Some(json!({"name": {"common": "Antarctica"}, "cca2": "AQ"})),
        _ => None,
    }
}

/// Upstream answers that are served under the `/down` prefix: every call
/// fails or returns a body that is not JSON.
fn failing_upstream() -> Router {
    Router::new()
        .route("/rc/all", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/rc/alpha/:code", get(|| async { "<html>maintenance</html>" }))
}

fn mock_upstream() -> Router {
    Router::new()
        .route(
            "/rc/all",
            get(|| async {
                Json(json!([
                    {"name": {"common": "United Kingdom"}, "cca2": "GB"},
                    {"name": {"common": "France"}, "cca2": "FR"},
                    {"cca2": "XX"},
                    {"name": {"common": "Antarctica"}, "cca2": "AQ"}
                ]))
            }),
        )
        .route(
            "/rc/alpha/:code",
            get(|Path(code): Path<String>| async move {
                if code == "ER" {
                    return StatusCode::BAD_GATEWAY.into_response();
                }
                match country_record(&code) {
                    Some(record) => Json(json!([record])).into_response(),
                    None => (StatusCode::NOT_FOUND, Json(json!({"status": 404, "message": "Not Found"})))
                        .into_response(),
                }
            }),
        )
        .route(
            "/ow/forecast",
            get(|Query(params): Params| async move {
                let city = params.get("q").cloned().unwrap_or_default();
                if city == "Nowhere" {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
                Json(json!({
                    "cod": "200",
                    "city": {"name": city},
                    "list": [{"dt": 1_700_000_000, "main": {"temp": 11.2}, "weather": [{"main": "Rain"}]}]
                }))
                .into_response()
            }),
        )
        .route(
            "/ex/:key/latest/USD",
            get(|Path(key): Path<String>| async move {
                match key.as_str() {
                    "down-key" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
                    "garbled-key" => "rates: USD=1 GBP=0.79".into_response(),
                    _ => {
                        assert_eq!(key, "ex-key");
                        Json(json!({"result": "success", "base_code": "USD",
                                    "conversion_rates": {"USD": 1, "GBP": 0.79}}))
                        .into_response()
                    }
                }
            }),
        )
        .route(
            "/ex/:key/pair/:from/:to/:amount",
            get(|Path((_key, from, to, amount)): Path<(String, String, String, f64)>| async move {
                Json(json!({"result": "success", "base_code": from, "target_code": to,
                            "conversion_rate": 0.79, "conversion_result": amount * 0.79}))
            }),
        )
        .route(
            "/wiki",
            get(|Query(params): Params| async move {
                let title = params.get("titles").cloned().unwrap_or_default();
                if title == "Atlantis" {
                    Json(json!({"query": {"pages": {"-1": {"title": "Atlantis", "missing": ""}}}}))
                } else {
                    Json(json!({"query": {"pages": {"31717": {"title": title, "extract": "An island country."}}}}))
                }
            }),
        )
        .route(
            "/news/top-headlines",
            get(|Query(params): Params| async move {
                Json(json!({"status": "ok", "totalResults": 1, "country": params.get("country"),
                            "articles": [{"title": "Headline", "url": "https://example.org"}]}))
            }),
        )
        .route(
            "/oc/json",
            get(|Query(params): Params| async move {
                let q = params.get("q").cloned().unwrap_or_default();
                if q.starts_with("51.5") {
                    Json(json!({"results": [{"components": {"country": "United Kingdom", "country_code": "gb"}}]}))
                } else {
                    Json(json!({"results": []}))
                }
            }),
        )
        .nest("/down", failing_upstream())
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}", addr)
}

struct Harness {
    base: String,
    client: reqwest::Client,
    _data: TempDir,
}

struct Setup {
    datasets: bool,
    countries_down: bool,
    exchange_key: &'static str,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            datasets: true,
            countries_down: false,
            exchange_key: "ex-key",
        }
    }
}

impl Harness {
    async fn start(with_datasets: bool) -> Self {
        Self::with(Setup {
            datasets: with_datasets,
            ..Setup::default()
        })
        .await
    }

    async fn with(setup: Setup) -> Self {
        let upstream = serve(mock_upstream()).await;
        let data = TempDir::new().expect("temp dir");
        if setup.datasets {
            write(data.path(), "countryBorders.geo.json", BORDERS);
            write(data.path(), "airports.dat", AIRPORTS);
            write(data.path(), "worldcities.csv", CITIES);
        }

        let config = GatewayConfig {
            data_dir: data.path().to_path_buf(),
            urls: UpstreamUrls {
                rest_countries: if setup.countries_down {
                    format!("{}/down/rc", upstream)
                } else {
                    format!("{}/rc", upstream)
                },
                openweather: format!("{}/ow", upstream),
                exchangerate: format!("{}/ex", upstream),
                wikipedia: format!("{}/wiki", upstream),
                news: format!("{}/news", upstream),
                opencage: format!("{}/oc", upstream),
            },
            keys: ApiKeys {
                exchangerate: setup.exchange_key.to_string(),
                ..ApiKeys::default()
            },
            ..GatewayConfig::default()
        };
        let state = AppState::from_config(&config).expect("state");
        let base = serve(build_router(state)).await;

        Self {
            base,
            client: reqwest::Client::new(),
            _data: data,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .expect("request");
        let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }
}

fn write(dir: &FsPath, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).expect("write fixture");
}

#[tokio::test]
async fn health_reports_service() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "gazetteer-gateway");
}

#[tokio::test]
async fn countries_are_sorted_and_reshaped() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/countries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"name": "Antarctica", "code": "AQ"},
            {"name": "France", "code": "FR"},
            {"name": "United Kingdom", "code": "GB"}
        ])
    );
}

#[tokio::test]
async fn geocode_resolves_country() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/geocode?lat=51.5&lon=-0.12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"country": "United Kingdom", "countryCode": "GB"}));

    let (status, body) = h.get("/api/geocode?lat=51.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Latitude and longitude are required");

    let (status, body) = h.get("/api/geocode?lat=0&lon=0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Location not found");
}

#[tokio::test]
async fn geocode_rejects_impossible_positions() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/geocode?lat=NaN&lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Latitude and longitude must be numbers"}));

    let (status, body) = h.get("/api/geocode?lat=200&lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Latitude and longitude are out of range"}));
}

#[tokio::test]
async fn weather_requires_city_and_passes_through() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/weather").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "City parameter is required"}));

    let (status, body) = h.get("/api/weather?city=London").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"]["name"], "London");
    assert_eq!(body["list"][0]["main"]["temp"], 11.2);
}

#[tokio::test]
async fn upstream_failure_is_a_500_with_message() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/weather?city=Nowhere").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch weather data"}));
}

#[tokio::test]
async fn country_list_fails_when_provider_is_down() {
    let h = Harness::with(Setup {
        countries_down: true,
        ..Setup::default()
    })
    .await;
    let (status, body) = h.get("/api/countries").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch countries"}));
}

#[tokio::test]
async fn non_json_upstream_body_is_a_500() {
    let h = Harness::with(Setup {
        countries_down: true,
        ..Setup::default()
    })
    .await;
    let (status, body) = h.get("/api/country-info/GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch country information"}));
}

#[tokio::test]
async fn wikipedia_extract_and_not_found() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/wikipedia?country=United%20Kingdom").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"extract": "An island country."}));

    let (status, body) = h.get("/api/wikipedia?country=Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No Wikipedia extract found");

    let (status, body) = h.get("/api/wikipedia").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Country parameter is required");
}

#[tokio::test]
async fn news_passes_through() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/news?country=GB").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "gb");
    assert_eq!(body["articles"].as_array().map(Vec::len), Some(1));

    let (status, _) = h.get("/api/news").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn convert_validates_and_passes_through() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/convert?from=USD&to=GBP").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "From, to and amount parameters are required");

    let (status, _) = h.get("/api/convert?from=USD&to=GBP&amount=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h.get("/api/convert?from=usd&to=gbp&amount=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["base_code"], "USD");
    assert_eq!(body["target_code"], "GBP");
}

#[tokio::test]
async fn country_currency_chains_two_calls() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/currency?country=gb&amount=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], json!({"code": "GBP", "name": "British pound", "symbol": "£"}));
    assert_eq!(body["base"], "USD");
    let converted = body["converted"].as_f64().unwrap();
    assert!((converted - 7.9).abs() < 1e-9);

    let (status, body) = h.get("/api/currency?country=AQ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No currency information found for this country");

    let (status, body) = h.get("/api/currency?country=FR").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No exchange rate found for EUR");
}

#[tokio::test]
async fn country_currency_fails_when_country_lookup_fails() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/currency?country=ER").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch country data"}));
}

#[tokio::test]
async fn country_currency_fails_when_rates_fail() {
    let h = Harness::with(Setup {
        exchange_key: "down-key",
        ..Setup::default()
    })
    .await;
    let (status, body) = h.get("/api/currency?country=GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch exchange rate"}));

    let h = Harness::with(Setup {
        exchange_key: "garbled-key",
        ..Setup::default()
    })
    .await;
    let (status, body) = h.get("/api/currency?country=GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch exchange rate"}));
}

#[tokio::test]
async fn country_info_is_remapped() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/country-info/gb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "United Kingdom");
    assert_eq!(body["capital"], "London");
    assert_eq!(body["currency"], "British pound");
    assert_eq!(body["currencyCode"], "GBP");
    assert_eq!(body["languages"], "English");

    let (status, body) = h.get("/api/country-info/GBR").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid country code");

    let (status, body) = h.get("/api/country-info/ZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn boundary_comes_from_local_dataset() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/country-boundary/gb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Feature");
    assert_eq!(body["properties"]["ISO_A2"], "GB");
    assert_eq!(body["geometry"]["type"], "Polygon");

    let (status, body) = h.get("/api/country-boundary/France").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"]["ISO_A2"], "FR");

    let (status, body) = h.get("/api/country-boundary/DE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn airports_and_cities_for_country() {
    let h = Harness::start(true).await;
    let (status, body) = h.get("/api/airports/GB").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["iata"], "LHR");
    assert_eq!(features[0]["geometry"]["coordinates"], json!([-0.461941, 51.4706]));

    let (status, body) = h.get("/api/cities/gb").await;
    assert_eq!(status, StatusCode::OK);
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"], json!({"name": "London", "population": 11262000, "capital": true}));
    assert_eq!(features[1]["properties"]["capital"], false);

    let (status, body) = h.get("/api/airports/ZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn missing_datasets_are_500s() {
    let h = Harness::start(false).await;
    let (status, body) = h.get("/api/airports/GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Airport data not available");

    let (status, body) = h.get("/api/cities/GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "City data file not found.");

    let (status, body) = h.get("/api/country-boundary/GB").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Country boundary data not available");
}
