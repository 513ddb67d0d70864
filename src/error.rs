//! Error types for pingpong

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for simulator operations
pub type SimulatorResult<T> = Result<T, SimulationError>;

/// Errors raised while parsing an encoded weighted distribution.
///
/// All of these are construction-time failures: a distribution that fails to
/// parse never produces a decider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("invalid input {input:?}: entry {entry:?} must have the form <probability>%<value>")]
    MalformedEntry { input: String, entry: String },

    #[error("parse probability {value:?} as float: {reason}")]
    InvalidProbability { value: String, reason: String },

    #[error("parse value {value:?}: {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("overall probability has to equal 100. Parsed input equals to {sum}")]
    ProbabilitySumMismatch { sum: f64 },
}

/// Main error type for simulator operations
#[derive(Error, Debug, Clone)]
pub enum SimulationError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        param: Option<String>,
    },

    #[error("Invalid distribution for {name}: {source}")]
    Distribution {
        name: String,
        #[source]
        source: DistributionError,
    },

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimulationError {
    /// Wrap a distribution parse failure with the name of the setting it came from.
    pub fn distribution(name: impl Into<String>, source: DistributionError) -> Self {
        Self::Distribution {
            name: name.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Distribution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &str {
        match self {
            Self::Config(_) | Self::Distribution { .. } => "configuration_error",
            Self::Validation { .. } => "invalid_request_error",
            Self::Http(_) => "upstream_error",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let mut response = ErrorResponse::new(self.error_type(), &self.to_string());

        if let Self::Validation { param: Some(p), .. } = self {
            response = response.with_param(p);
        }

        response
    }
}

/// JSON error body returned by the HTTP surface
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: ErrorDetail {
                message: message.to_string(),
                error_type: error_type.to_string(),
                param: None,
            },
        }
    }

    pub fn with_param(mut self, param: &str) -> Self {
        self.error.param = Some(param.to_string());
        self
    }
}

impl IntoResponse for SimulationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_response())).into_response()
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for SimulationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
