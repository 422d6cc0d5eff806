//! Map Client Library
//!
//! Client-side half of the gazetteer. [`MapApp`] owns an explicit
//! [`AppState`] (selection, viewport, overlay datasets, info panels) and
//! talks to the proxy through the [`GazetteerApi`] trait.
//!
//! Every fetch runs as its own task and reports back over a channel as a
//! [`Completion`]. Completions are tagged with the [`SelectionToken`] that
//! was current when they were issued; anything older than the current
//! selection is dropped before it can touch state.

use thiserror::Error;

pub mod app;
pub mod proxy;
pub mod state;

pub use app::{Completion, CompletionKind, MapApp};
pub use proxy::{
    ClientConfig, CountryEntry, CountryFacts, CurrencyInfo, CurrencyQuote, ForecastSlot,
    GazetteerApi, GeocodeResult, NewsHeadline, ProxyClient, WeatherReport, WikiSummary,
};
pub use state::{AppState, Notification, OverlayLayer, Panel, Selection, SelectionToken, Severity};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("No country selected")]
    NoSelection,
    #[error("Country name for {0} is not known yet")]
    NameUnknown(String),
}

impl ClientError {
    /// Message fit for a notification: the proxy's own `{error}` text when
    /// there is one.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
