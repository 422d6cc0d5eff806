//! Selection orchestration
//!
//! [`MapApp`] is driven from a single event loop: user actions call the
//! `select_*`/`request_*`/`set_*` methods, which spawn fetch tasks and return
//! immediately; the loop then feeds each [`Completion`] from
//! [`MapApp::next_completion`] back into [`MapApp::apply`]. Completions may
//! arrive in any order. Only `apply` mutates state from network results, and
//! it drops anything issued for an older selection.

use crate::proxy::{
    CountryEntry, CountryFacts, CurrencyQuote, GazetteerApi, GeocodeResult, NewsHeadline,
    WeatherReport, WikiSummary,
};
use crate::state::{AppState, Selection, SelectionToken, Severity};
use crate::{ClientError, Result};
use geojson::{Feature, FeatureCollection};
use marker_cluster::{plan, Dataset, GeoBounds, OverlayKind, OverlayPolicy, RenderPlan, ViewportState};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Highest zoom used when fitting the map to a country.
pub const MAX_FIT_ZOOM: u8 = 18;

#[derive(Debug)]
pub enum CompletionKind {
    Countries(Result<Vec<CountryEntry>>),
    Located(Result<GeocodeResult>),
    Boundary { code: String, result: Result<Feature> },
    Facts { code: String, result: Result<CountryFacts> },
    Weather { code: String, result: Result<WeatherReport> },
    Wikipedia { code: String, result: Result<WikiSummary> },
    News { code: String, result: Result<Vec<NewsHeadline>> },
    Currency { code: String, result: Result<CurrencyQuote> },
    Overlay {
        code: String,
        kind: OverlayKind,
        result: Result<FeatureCollection>,
    },
}

impl CompletionKind {
    /// Country the fetch was issued for, if it was country-scoped.
    pub fn country_code(&self) -> Option<&str> {
        match self {
            CompletionKind::Countries(_) | CompletionKind::Located(_) => None,
            CompletionKind::Boundary { code, .. }
            | CompletionKind::Facts { code, .. }
            | CompletionKind::Weather { code, .. }
            | CompletionKind::Wikipedia { code, .. }
            | CompletionKind::News { code, .. }
            | CompletionKind::Currency { code, .. }
            | CompletionKind::Overlay { code, .. } => Some(code),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CompletionKind::Countries(_) => "countries",
            CompletionKind::Located(_) => "geocode",
            CompletionKind::Boundary { .. } => "boundary",
            CompletionKind::Facts { .. } => "country info",
            CompletionKind::Weather { .. } => "weather",
            CompletionKind::Wikipedia { .. } => "wikipedia",
            CompletionKind::News { .. } => "news",
            CompletionKind::Currency { .. } => "currency",
            CompletionKind::Overlay { kind, .. } => kind.as_str(),
        }
    }
}

/// Result of one fetch, tagged with the selection it was issued under.
#[derive(Debug)]
pub struct Completion {
    pub token: SelectionToken,
    pub kind: CompletionKind,
}

pub struct MapApp<A: GazetteerApi> {
    api: Arc<A>,
    state: AppState,
    airport_policy: OverlayPolicy,
    city_policy: OverlayPolicy,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
}

impl<A: GazetteerApi> MapApp<A> {
    pub fn new(api: A, viewport: ViewportState) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            api: Arc::new(api),
            state: AppState::new(viewport),
            airport_policy: OverlayPolicy::airports(),
            city_policy: OverlayPolicy::cities(),
            tx,
            rx,
        }
    }

    pub fn with_policy(mut self, policy: OverlayPolicy) -> Self {
        match policy.kind {
            OverlayKind::Airports => self.airport_policy = policy,
            OverlayKind::Cities => self.city_policy = policy,
        }
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn policy(&self, kind: OverlayKind) -> &OverlayPolicy {
        match kind {
            OverlayKind::Airports => &self.airport_policy,
            OverlayKind::Cities => &self.city_policy,
        }
    }

    /// Run `fetch` on its own task and post its output back as a completion.
    fn spawn<F, T>(&self, fetch: F, wrap: impl FnOnce(T) -> CompletionKind + Send + 'static)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let tx = self.tx.clone();
        let token = self.state.token;
        tokio::spawn(async move {
            let kind = wrap(fetch.await);
            // Receiver only goes away with the app itself.
            let _ = tx.send(Completion { token, kind });
        });
    }

    pub fn load_countries(&mut self) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { api.countries().await }, CompletionKind::Countries);
    }

    /// Select a country by ISO code. Everything still in flight for the
    /// previous selection becomes stale.
    pub fn select_country(&mut self, code: &str) -> SelectionToken {
        let code = code.trim().to_uppercase();
        let token = self.state.token.next();
        self.state.token = token;
        let name = self.state.country_name(&code).map(str::to_string);
        info!("Selecting {} ({:?}), token {}", code, name, token.value());

        self.state.selection = Some(Selection {
            token,
            code: code.clone(),
            name,
        });
        self.state.boundary = None;
        self.state.boundary_bounds = None;
        self.state.facts.reset_loading();
        self.state.weather.reset_loading();
        self.state.wikipedia.clear();
        self.state.news.clear();
        self.state.currency.clear();

        let api = Arc::clone(&self.api);
        let c = code.clone();
        self.spawn(async move { api.boundary(&c).await }, {
            let code = code.clone();
            move |result| CompletionKind::Boundary { code, result }
        });

        let api = Arc::clone(&self.api);
        let c = code.clone();
        self.spawn(async move { api.country_info(&c).await }, {
            let code = code.clone();
            move |result| CompletionKind::Facts { code, result }
        });

        for kind in OverlayKind::ALL {
            let layer = self.state.layer_mut(kind);
            layer.dataset = None;
            layer.loading = false;
            if layer.visible {
                self.fetch_overlay(kind, &code);
            }
        }

        token
    }

    /// Resolve the user's position to a country and select it, unless the
    /// user picks a country before the answer arrives.
    pub fn locate(&mut self, lat: f64, lon: f64) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { api.geocode(lat, lon).await }, CompletionKind::Located);
    }

    fn fetch_overlay(&mut self, kind: OverlayKind, code: &str) {
        self.state.layer_mut(kind).loading = true;
        let api = Arc::clone(&self.api);
        let c = code.to_string();
        let code = code.to_string();
        self.spawn(async move { api.overlay(kind, &c).await }, move |result| {
            CompletionKind::Overlay { code, kind, result }
        });
    }

    fn fetch_weather(&mut self, code: &str, city: &str) {
        self.state.weather.begin();
        let api = Arc::clone(&self.api);
        let city = city.to_string();
        let code = code.to_string();
        self.spawn(async move { api.weather(&city).await }, move |result| {
            CompletionKind::Weather { code, result }
        });
    }

    /// Show or hide an overlay. Showing it for a country whose dataset is
    /// not loaded yet starts the fetch.
    pub fn set_overlay_visible(&mut self, kind: OverlayKind, visible: bool) {
        self.state.layer_mut(kind).visible = visible;
        if !visible {
            return;
        }
        let Some(code) = self.state.selected_code().map(str::to_string) else {
            return;
        };
        let layer = self.state.layer(kind);
        if !layer.loading && !layer.has_dataset_for(&code) {
            self.fetch_overlay(kind, &code);
        }
    }

    pub fn set_viewport(&mut self, viewport: ViewportState) {
        self.state.viewport = viewport;
    }

    fn current_selection(&self) -> Result<String> {
        self.state
            .selected_code()
            .map(str::to_string)
            .ok_or(ClientError::NoSelection)
    }

    /// Articles are looked up by name; refused until the country list or
    /// the facts have supplied one.
    pub fn request_wikipedia(&mut self) -> Result<()> {
        let code = self.current_selection()?;
        let name = self
            .state
            .selection
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .or_else(|| self.state.country_name(&code))
            .map(str::to_string)
            .ok_or_else(|| ClientError::NameUnknown(code.clone()))?;
        self.state.wikipedia.begin();
        let api = Arc::clone(&self.api);
        self.spawn(async move { api.wikipedia(&name).await }, move |result| {
            CompletionKind::Wikipedia { code, result }
        });
        Ok(())
    }

    pub fn request_news(&mut self) -> Result<()> {
        let code = self.current_selection()?;
        self.state.news.begin();
        let api = Arc::clone(&self.api);
        let c = code.clone();
        self.spawn(async move { api.news(&c).await }, move |result| {
            CompletionKind::News { code, result }
        });
        Ok(())
    }

    /// Convert `amount` USD into the selected country's currency.
    pub fn request_currency(&mut self, amount: f64) -> Result<()> {
        let code = self.current_selection()?;
        self.state.currency.begin();
        let api = Arc::clone(&self.api);
        let c = code.clone();
        self.spawn(async move { api.currency(&c, amount).await }, move |result| {
            CompletionKind::Currency { code, result }
        });
        Ok(())
    }

    /// Wait for the next completion. Never returns `None` while the app
    /// is alive because it holds a sender itself.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Apply a completion unless it is stale. Returns whether state changed.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let Completion { token, kind } = completion;

        let fresh = match kind.country_code() {
            Some(code) => self.state.is_current(token, code),
            // Geolocation is superseded by any selection made after it.
            None if matches!(kind, CompletionKind::Located(_)) => token == self.state.token,
            None => true,
        };
        if !fresh {
            debug!(
                "Discarding stale {} completion (token {}, current {})",
                kind.label(),
                token.value(),
                self.state.token.value()
            );
            return false;
        }

        match kind {
            CompletionKind::Countries(Ok(countries)) => {
                info!("Loaded {} countries", countries.len());
                self.state.countries = countries;
                if let Some(selection) = self.state.selection.as_mut() {
                    if selection.name.is_none() {
                        selection.name = self
                            .state
                            .countries
                            .iter()
                            .find(|c| c.code.eq_ignore_ascii_case(&selection.code))
                            .map(|c| c.name.clone());
                    }
                }
            }
            CompletionKind::Countries(Err(e)) => {
                self.fail(Severity::Alert, "Failed to load the country list", &e);
            }
            CompletionKind::Located(Ok(found)) => {
                info!("Located user in {} ({})", found.country, found.country_code);
                self.select_country(&found.country_code);
            }
            CompletionKind::Located(Err(e)) => {
                self.fail(Severity::Toast, "Unable to determine your country", &e);
            }
            CompletionKind::Boundary { result: Ok(feature), .. } => {
                let bounds = feature.geometry.as_ref().and_then(GeoBounds::from_geometry);
                if let Some(bounds) = bounds {
                    let vp = self.state.viewport;
                    self.state.viewport =
                        ViewportState::fit_bounds(&bounds, vp.width_px, vp.height_px, MAX_FIT_ZOOM);
                }
                self.state.boundary_bounds = bounds;
                self.state.boundary = Some(feature);
            }
            CompletionKind::Boundary { result: Err(e), .. } => {
                self.fail(Severity::Alert, "Failed to load the country boundary", &e);
            }
            CompletionKind::Facts { code, result: Ok(facts) } => {
                if let Some(selection) = self.state.selection.as_mut() {
                    selection.name = Some(facts.name.clone());
                }
                match facts.weather_city().map(str::to_string) {
                    Some(city) => self.fetch_weather(&code, &city),
                    None => self.state.weather.fail(),
                }
                self.state.facts.fill(facts);
            }
            CompletionKind::Facts { result: Err(e), .. } => {
                self.state.facts.fail();
                self.state.weather.fail();
                self.fail(Severity::Toast, "Failed to load country information", &e);
            }
            CompletionKind::Weather { result, .. } => match result {
                Ok(report) => self.state.weather.fill(report),
                Err(e) => {
                    self.state.weather.fail();
                    self.fail(Severity::Toast, "Failed to load weather data", &e);
                }
            },
            CompletionKind::Wikipedia { result, .. } => match result {
                Ok(summary) => self.state.wikipedia.fill(summary),
                Err(e) => {
                    self.state.wikipedia.fail();
                    self.fail(Severity::Toast, "No Wikipedia information found", &e);
                }
            },
            CompletionKind::News { result, .. } => match result {
                Ok(headlines) => self.state.news.fill(headlines),
                Err(e) => {
                    self.state.news.fail();
                    self.fail(Severity::Toast, "Failed to load news", &e);
                }
            },
            CompletionKind::Currency { result, .. } => match result {
                Ok(quote) => self.state.currency.fill(quote),
                Err(e) => {
                    self.state.currency.fail();
                    self.fail(Severity::Toast, "Failed to load currency data", &e);
                }
            },
            CompletionKind::Overlay { code, kind, result } => {
                let layer = self.state.layer_mut(kind);
                layer.loading = false;
                match result {
                    Ok(collection) => {
                        let dataset = Dataset::from_feature_collection(&code, &collection);
                        info!("Loaded {} {} for {}", dataset.len(), kind, code);
                        layer.dataset = Some(dataset);
                    }
                    Err(e) => {
                        let context = format!("Error retrieving {} data", kind);
                        self.fail(Severity::Toast, &context, &e);
                    }
                }
            }
        }
        true
    }

    fn fail(&mut self, severity: Severity, context: &str, error: &ClientError) {
        warn!("{}: {}", context, error);
        self.state
            .notify(severity, format!("{}: {}", context, error.user_message()));
    }

    /// Wait for one completion and apply it.
    pub async fn pump(&mut self) -> bool {
        match self.next_completion().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Render plan for a visible, loaded overlay, recomputed from the
    /// current dataset and viewport.
    pub fn render_plan(&self, kind: OverlayKind) -> Option<RenderPlan<'_>> {
        let layer = self.state.layer(kind);
        if !layer.visible {
            return None;
        }
        let dataset = layer.dataset.as_ref()?;
        Some(plan(dataset, &self.state.viewport, self.policy(kind)))
    }
}
