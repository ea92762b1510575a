// Normalized error model shared by every provider integration.
// Provider failures, local store failures and mapping problems all cross the
// crate boundary as a single `NormalizedError` value.

use chrono::Local;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// External providers the core talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    // Flight/hotel distribution API, bearer-token OAuth
    Amadeus,
    // Hotel content and availability API, per-request signature
    Hotelbeds,
    // Airport lookup API, static API key
    Iata,
}

impl Provider {
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Amadeus => "Amadeus",
            Provider::Hotelbeds => "HotelBeds",
            Provider::Iata => "API Ninjas",
        }
    }

    pub fn error_source(&self) -> ErrorSource {
        match self {
            Provider::Amadeus => ErrorSource::Amadeus,
            Provider::Hotelbeds => ErrorSource::Hotelbeds,
            Provider::Iata => ErrorSource::ExternalApi,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// Where a failure originated, as rendered to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSource {
    Amadeus,
    Hotelbeds,
    ExternalApi,
    Backend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Token issuance or refresh failed, or a provider rejected our credentials
    AuthFailure,
    // Connect/read timeout, connection reset; safe to retry
    TransientNetworkFailure,
    // 4xx semantic rejection, not retryable as-is
    ProviderValidationFailure,
    // 5xx upstream fault, retryable with backoff
    ProviderServerFailure,
    // Local store write or read failed
    PersistenceFailure,
    // Provider payload did not have the expected shape
    MappingFailure,
    // Local lookup miss
    NotFound,
}

impl ErrorKind {
    /// Classifies a provider HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::AuthFailure,
            408 | 429 => ErrorKind::TransientNetworkFailure,
            400..=499 => ErrorKind::ProviderValidationFailure,
            _ => ErrorKind::ProviderServerFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::TransientNetworkFailure | ErrorKind::ProviderServerFailure
        )
    }
}

/// The one error value every failed exchange is reduced to.
///
/// `origin` is the provider (or the backend itself) the failure is attributed to;
/// `provider_code` keeps the upstream error code when the envelope carried one.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind:?} ({http_status}) from {origin:?}: {message}")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub http_status: u16,
    pub provider_code: Option<String>,
    pub message: String,
    pub origin: ErrorSource,
}

pub type Result<T> = std::result::Result<T, NormalizedError>;

impl NormalizedError {
    pub fn new(
        kind: ErrorKind,
        http_status: u16,
        message: impl Into<String>,
        origin: ErrorSource,
    ) -> Self {
        Self {
            kind,
            http_status,
            provider_code: None,
            message: message.into(),
            origin,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn auth(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::AuthFailure,
            401,
            message,
            provider.error_source(),
        )
    }

    /// A request that never produced an HTTP response (timeout, refused, reset).
    pub fn transport(provider: Provider, err: &reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "transport error"
        };
        Self::new(
            ErrorKind::TransientNetworkFailure,
            503,
            format!("Could not reach {}: {} ({})", provider, reason, err),
            provider.error_source(),
        )
    }

    pub fn mapping(origin: ErrorSource, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MappingFailure, 502, message, origin)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::PersistenceFailure,
            500,
            message,
            ErrorSource::Backend,
        )
    }

    pub fn not_found(origin: ErrorSource, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, 404, message, origin)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ProviderValidationFailure,
            400,
            message,
            ErrorSource::Backend,
        )
    }

    /// Re-labels a failure as an authentication failure, keeping status and origin.
    pub fn into_auth_failure(self) -> Self {
        Self {
            kind: ErrorKind::AuthFailure,
            message: format!("Token request failed: {}", self.message),
            ..self
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// The `{status, error, message, source}` envelope the adapter layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub source: ErrorSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_error_api: Option<String>,
}

pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
}

impl From<&NormalizedError> for ErrorBody {
    fn from(err: &NormalizedError) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            status: err.http_status,
            error: reason_phrase(err.http_status).to_string(),
            message: err.message.clone(),
            source: err.origin,
            code_error_api: err.provider_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(400, ErrorKind::ProviderValidationFailure; "bad request")]
    #[test_case(401, ErrorKind::AuthFailure; "unauthorized")]
    #[test_case(403, ErrorKind::ProviderValidationFailure; "forbidden")]
    #[test_case(408, ErrorKind::TransientNetworkFailure; "request timeout")]
    #[test_case(429, ErrorKind::TransientNetworkFailure; "too many requests")]
    #[test_case(500, ErrorKind::ProviderServerFailure; "internal error")]
    #[test_case(503, ErrorKind::ProviderServerFailure; "unavailable")]
    fn test_kind_from_status(status: u16, expected: ErrorKind) {
        assert_eq!(ErrorKind::from_status(status), expected);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::TransientNetworkFailure.is_retryable());
        assert!(ErrorKind::ProviderServerFailure.is_retryable());
        assert!(!ErrorKind::ProviderValidationFailure.is_retryable());
        assert!(!ErrorKind::AuthFailure.is_retryable());
        assert!(!ErrorKind::MappingFailure.is_retryable());
    }

    #[test]
    fn test_error_body_envelope() {
        let err = NormalizedError::new(
            ErrorKind::ProviderValidationFailure,
            400,
            "INVALID_DATA - bad dates",
            ErrorSource::Hotelbeds,
        )
        .with_provider_code("INVALID_DATA");

        let body = ErrorBody::from(&err);
        assert_eq!(body.status, 400);
        assert_eq!(body.error, "Bad Request");
        assert_eq!(body.source, ErrorSource::Hotelbeds);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["source"], "HOTELBEDS");
        assert_eq!(json["codeErrorApi"], "INVALID_DATA");
        assert_eq!(json["message"], "INVALID_DATA - bad dates");
    }

    #[test]
    fn test_error_body_omits_missing_code() {
        let err = NormalizedError::persistence("disk full");
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(json["source"], "BACKEND");
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json.get("codeErrorApi").is_none());
    }

    #[test]
    fn test_into_auth_failure_keeps_status() {
        let err = NormalizedError::new(
            ErrorKind::ProviderServerFailure,
            500,
            "upstream down",
            ErrorSource::Amadeus,
        )
        .into_auth_failure();
        assert_eq!(err.kind, ErrorKind::AuthFailure);
        assert_eq!(err.http_status, 500);
        assert!(err.message.contains("upstream down"));
    }
}
