//! Application state owned by the map

use crate::proxy::{CountryEntry, CountryFacts, CurrencyQuote, NewsHeadline, WeatherReport, WikiSummary};
use chrono::{DateTime, Utc};
use geojson::Feature;
use marker_cluster::{Dataset, GeoBounds, OverlayKind, ViewportState};
use serde::Serialize;

/// Identifies one country selection. Strictly increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub token: SelectionToken,
    /// Upper-case ISO alpha-2.
    pub code: String,
    /// Best known display name; refined once country facts arrive.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Core feature blocked (country list, boundary).
    Alert,
    /// Auxiliary panel failed; the rest of the map is unaffected.
    Toast,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// One info panel (facts, weather, news...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel<T> {
    value: Option<T>,
    loading: bool,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
        }
    }
}

impl<T> Panel<T> {
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// New selection: drop the previous country's content and wait.
    pub fn reset_loading(&mut self) {
        self.value = None;
        self.loading = true;
    }

    /// Refresh within the same selection; current content stays visible.
    pub fn begin(&mut self) {
        self.loading = true;
    }

    pub fn fill(&mut self, value: T) {
        self.value = Some(value);
        self.loading = false;
    }

    /// Failed fetch: stop loading, keep whatever was there.
    pub fn fail(&mut self) {
        self.loading = false;
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.loading = false;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayer {
    pub kind: OverlayKind,
    pub visible: bool,
    pub loading: bool,
    pub dataset: Option<Dataset>,
}

impl OverlayLayer {
    pub fn new(kind: OverlayKind, visible: bool) -> Self {
        Self {
            kind,
            visible,
            loading: false,
            dataset: None,
        }
    }

    pub fn has_dataset_for(&self, code: &str) -> bool {
        self.dataset
            .as_ref()
            .is_some_and(|d| d.country_code.eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub countries: Vec<CountryEntry>,
    /// Last token handed out, whether or not a selection is active.
    pub token: SelectionToken,
    pub selection: Option<Selection>,
    pub viewport: ViewportState,
    pub boundary: Option<Feature>,
    pub boundary_bounds: Option<GeoBounds>,
    pub facts: Panel<CountryFacts>,
    pub weather: Panel<WeatherReport>,
    pub wikipedia: Panel<WikiSummary>,
    pub news: Panel<Vec<NewsHeadline>>,
    pub currency: Panel<CurrencyQuote>,
    pub airports: OverlayLayer,
    pub cities: OverlayLayer,
    pub notifications: Vec<Notification>,
}

impl AppState {
    pub fn new(viewport: ViewportState) -> Self {
        Self {
            countries: Vec::new(),
            token: SelectionToken::default(),
            selection: None,
            viewport,
            boundary: None,
            boundary_bounds: None,
            facts: Panel::default(),
            weather: Panel::default(),
            wikipedia: Panel::default(),
            news: Panel::default(),
            currency: Panel::default(),
            airports: OverlayLayer::new(OverlayKind::Airports, false),
            cities: OverlayLayer::new(OverlayKind::Cities, false),
            notifications: Vec::new(),
        }
    }

    pub fn layer(&self, kind: OverlayKind) -> &OverlayLayer {
        match kind {
            OverlayKind::Airports => &self.airports,
            OverlayKind::Cities => &self.cities,
        }
    }

    pub fn layer_mut(&mut self, kind: OverlayKind) -> &mut OverlayLayer {
        match kind {
            OverlayKind::Airports => &mut self.airports,
            OverlayKind::Cities => &mut self.cities,
        }
    }

    pub fn selected_code(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.code.as_str())
    }

    /// True if a completion issued under `token` for `code` still belongs
    /// to the active selection.
    pub fn is_current(&self, token: SelectionToken, code: &str) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.token == token && s.code.eq_ignore_ascii_case(code))
    }

    pub fn country_name(&self, code: &str) -> Option<&str> {
        self.countries
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .map(|c| c.name.as_str())
    }

    pub fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notifications.push(Notification {
            severity,
            message: message.into(),
            at: Utc::now(),
        });
    }

    /// Take pending notifications for display.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
