//! API error taxonomy and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use country_datasets::DatasetError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::upstream::UpstreamError;

/// Every handler fails with one of these. Only the message reaches the
/// client; causes are logged here.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<UpstreamError>,
    },
    #[error("{message}")]
    DatasetMissing {
        message: String,
        #[source]
        source: Option<DatasetError>,
    },
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Upstream failure with a caller-facing `message`.
    pub fn upstream(message: impl Into<String>) -> impl FnOnce(UpstreamError) -> Self {
        let message = message.into();
        move |source| Self::Upstream {
            message,
            source: Some(source),
        }
    }

    /// Local dataset failure with a caller-facing `message`.
    pub fn dataset(message: impl Into<String>) -> impl FnOnce(DatasetError) -> Self {
        let message = message.into();
        move |source| Self::DatasetMissing {
            message,
            source: Some(source),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::DatasetMissing { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Upstream {
                message,
                source: Some(source),
            } => error!("{}: {}", message, source),
            ApiError::DatasetMissing {
                message,
                source: Some(source),
            } => error!("{}: {}", message, source),
            other if status.is_server_error() => error!("{}", other),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        let upstream = ApiError::upstream("Failed to fetch news data")(UpstreamError::Status {
            provider: "news",
            status: 502,
        });
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.to_string(), "Failed to fetch news data");

        let missing = ApiError::dataset("Airport data not available")(DatasetError::Missing(
            PathBuf::from("data/airports.dat"),
        ));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.to_string(), "Airport data not available");
    }
}
