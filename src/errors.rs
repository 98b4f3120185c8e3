use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;

/// Every failure a forecast run can surface to its caller.
///
/// A run never returns partial results: the first error aborts the run and
/// names the source (or generator) responsible for it.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("end date {end} is earlier than start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{source_name} request failed: {message}")]
    DataSource { source_name: String, message: String },

    #[error("timezone could not be resolved: {0}")]
    TimezoneResolution(String),

    #[error("elevation could not be resolved: {0}")]
    ElevationResolution(String),

    #[error("generator '{name}': {source}")]
    Generator {
        name: String,
        #[source]
        source: Box<ForecastError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ForecastError {
    pub fn data_source(source_name: &str, err: impl std::fmt::Display) -> Self {
        ForecastError::DataSource {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }

    pub fn for_generator(self, name: &str) -> Self {
        ForecastError::Generator {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Short machine-readable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InvalidRange { .. } => "invalid_range",
            ForecastError::DataUnavailable(_) => "data_unavailable",
            ForecastError::Configuration(_) => "configuration",
            ForecastError::DataSource { .. } => "data_source",
            ForecastError::TimezoneResolution(_) => "timezone_resolution",
            ForecastError::ElevationResolution(_) => "elevation_resolution",
            ForecastError::Generator { source, .. } => source.kind(),
            ForecastError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ForecastError::InvalidRange { .. } | ForecastError::Configuration(_) => {
                StatusCode::BAD_REQUEST
            }
            ForecastError::DataUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ForecastError::DataSource { .. }
            | ForecastError::TimezoneResolution(_)
            | ForecastError::ElevationResolution(_) => StatusCode::BAD_GATEWAY,
            ForecastError::Generator { source, .. } => source.status_code(),
            ForecastError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), "forecast request failed: {}", self);
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
