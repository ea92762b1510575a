// Error normalization for provider HTTP failures.
// The providers disagree on the error envelope and on whether the status in the
// body is authoritative, so every failed exchange is funnelled through here.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{reason_phrase, ErrorKind, NormalizedError, Provider};

const LOG_BODY_LIMIT: usize = 512;

/// One element of a `{"errors": [...]}` envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl Problem {
    fn from_value(value: &Value) -> Self {
        Self {
            status: value
                .get("status")
                .and_then(scalar_text)
                .and_then(|s| s.parse().ok()),
            // Code 0 means no code
            code: value
                .get("code")
                .and_then(scalar_text)
                .filter(|code| code != "0"),
            title: value.get("title").and_then(scalar_text),
            detail: value.get("detail").and_then(scalar_text),
        }
    }

    // "Error <code> - <title>: <detail>"
    fn message(&self) -> String {
        let detail = self.detail.as_deref().unwrap_or("Unknown error");
        let message = match self.title.as_deref() {
            Some(title) => format!("{}: {}", title, detail),
            None => detail.to_string(),
        };
        match self.code.as_deref() {
            Some(code) => format!("Error {} - {}", code, message),
            None => message,
        }
    }
}

// The error envelope shapes the upstream providers are known to send
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorEnvelope {
    // {"errors": [{"status", "code", "title", "detail"}]}
    ProblemList(Vec<Problem>),
    // {"error": {"code": "...", "message": "..."}}
    Coded { code: String, message: String },
    // {"error": "plain text"}
    Plain(String),
    // Empty, not JSON, or JSON of an unknown shape
    Unrecognized,
}

impl ErrorEnvelope {
    /// Detects the envelope by its structure, independent of which provider sent it.
    pub fn detect(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return ErrorEnvelope::Unrecognized;
        }

        let root: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => return ErrorEnvelope::Unrecognized,
        };

        if let Some(Value::Array(items)) = root.get("errors") {
            let problems: Vec<Problem> = items
                .iter()
                .filter(|item| item.is_object())
                .map(Problem::from_value)
                .collect();
            if !problems.is_empty() {
                return ErrorEnvelope::ProblemList(problems);
            }
        }

        match root.get("error") {
            Some(Value::Object(error)) => {
                let code = error.get("code").and_then(scalar_text);
                let message = error.get("message").and_then(scalar_text);
                match (code, message) {
                    (Some(code), Some(message)) => ErrorEnvelope::Coded { code, message },
                    _ => ErrorEnvelope::Unrecognized,
                }
            }
            Some(Value::String(text)) if !text.trim().is_empty() => {
                ErrorEnvelope::Plain(text.trim().to_string())
            }
            _ => ErrorEnvelope::Unrecognized,
        }
    }
}

pub struct ErrorNormalizer;

impl ErrorNormalizer {
    /// Reduces a failed provider exchange to a `NormalizedError`. Never fails.
    pub fn normalize(provider: Provider, http_status: u16, body: &str) -> NormalizedError {
        let origin = provider.error_source();

        match ErrorEnvelope::detect(body) {
            ErrorEnvelope::ProblemList(problems) => {
                // detect() never yields an empty list
                let first = problems.into_iter().next().unwrap_or_default();
                let status = first.status.unwrap_or(http_status);
                let mut err = NormalizedError::new(
                    ErrorKind::from_status(status),
                    status,
                    first.message(),
                    origin,
                );
                if let Some(code) = first.code {
                    err = err.with_provider_code(code);
                }
                debug!(provider = %provider, status, "normalized problem-list error");
                err
            }
            ErrorEnvelope::Coded { code, message } => NormalizedError::new(
                ErrorKind::from_status(http_status),
                http_status,
                format!("{} - {}", code, message),
                origin,
            )
            .with_provider_code(code),
            ErrorEnvelope::Plain(message) => NormalizedError::new(
                ErrorKind::from_status(http_status),
                http_status,
                message,
                origin,
            ),
            ErrorEnvelope::Unrecognized => {
                warn!(
                    provider = %provider,
                    status = http_status,
                    body = %truncate_for_log(body, LOG_BODY_LIMIT),
                    "unrecognized provider error body"
                );
                NormalizedError::new(
                    ErrorKind::from_status(http_status),
                    http_status,
                    format!(
                        "{} {} - Error communicating with {}",
                        http_status,
                        reason_phrase(http_status).to_uppercase(),
                        provider
                    ),
                    origin,
                )
            }
        }
    }
}

// Strings and numbers both show up for codes and statuses
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn truncate_for_log(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }
    let mut end = max_len;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSource;
    use test_case::test_case;

    #[test_case(
        r#"{"errors":[{"status":400,"code":477,"title":"INVALID FORMAT","detail":"invalid query parameter format"}]}"#,
        401,
        "Error 477 - INVALID FORMAT: invalid query parameter format",
        400;
        "status from body wins"
    )]
    #[test_case(
        r#"{"errors":[{"code":38189,"title":"Internal error","detail":"An internal error occurred"}]}"#,
        500,
        "Error 38189 - Internal error: An internal error occurred",
        500;
        "status falls back to transport"
    )]
    #[test_case(
        r#"{"errors":[{"status":"404","code":"1797","detail":"Resource not found"}]}"#,
        500,
        "Error 1797 - Resource not found",
        404;
        "no title and string status"
    )]
    #[test_case(
        r#"{"errors":[{"status":400,"title":"MANDATORY DATA MISSING","detail":"adults is required"},{"status":400,"detail":"second"}]}"#,
        400,
        "MANDATORY DATA MISSING: adults is required",
        400;
        "first element only, no code"
    )]
    #[test_case(
        r#"{"errors":[{"status":400,"code":0,"title":"INVALID DATA","detail":"checkInDate is in the past"}]}"#,
        400,
        "INVALID DATA: checkInDate is in the past",
        400;
        "zero code is no code"
    )]
    fn test_problem_list_shape(body: &str, transport: u16, message: &str, status: u16) {
        let err = ErrorNormalizer::normalize(Provider::Amadeus, transport, body);
        assert_eq!(err.message, message);
        assert_eq!(err.http_status, status);
        assert_eq!(err.origin, ErrorSource::Amadeus);
    }

    #[test]
    fn test_zero_problem_code_is_not_kept() {
        let body = r#"{"errors":[{"status":400,"code":"0","detail":"Bad request"}]}"#;
        let err = ErrorNormalizer::normalize(Provider::Amadeus, 400, body);
        assert_eq!(err.message, "Bad request");
        assert!(err.provider_code.is_none());
    }

    #[test]
    fn test_problem_list_keeps_provider_code() {
        let body = r#"{"errors":[{"status":401,"code":38190,"title":"Invalid access token","detail":"The access token provided in the Authorization header is invalid"}]}"#;
        let err = ErrorNormalizer::normalize(Provider::Amadeus, 401, body);
        assert_eq!(err.kind, ErrorKind::AuthFailure);
        assert_eq!(err.provider_code.as_deref(), Some("38190"));
    }

    #[test]
    fn test_coded_shape_uses_transport_status() {
        let body = r#"{"error":{"code":"INVALID_DATA","message":"The check-in date cannot be in the past","status":418}}"#;
        let err = ErrorNormalizer::normalize(Provider::Hotelbeds, 400, body);
        assert_eq!(err.message, "INVALID_DATA - The check-in date cannot be in the past");
        assert_eq!(err.http_status, 400);
        assert_eq!(err.kind, ErrorKind::ProviderValidationFailure);
        assert_eq!(err.provider_code.as_deref(), Some("INVALID_DATA"));
        assert_eq!(err.origin, ErrorSource::Hotelbeds);
    }

    #[test]
    fn test_plain_shape() {
        let body = r#"{"error":"Access to this API has been disallowed"}"#;
        let err = ErrorNormalizer::normalize(Provider::Hotelbeds, 403, body);
        assert_eq!(err.message, "Access to this API has been disallowed");
        assert_eq!(err.http_status, 403);
        assert!(err.provider_code.is_none());
    }

    #[test_case(""; "empty body")]
    #[test_case("   \n"; "whitespace body")]
    #[test_case("<html><body>Bad Gateway</body></html>"; "html body")]
    #[test_case(r#"{"message":"something else"}"#; "unknown json")]
    #[test_case(r#"{"errors":[]}"#; "empty problem list")]
    #[test_case(r#"{"error":{"code":"ONLY_CODE"}}"#; "coded without message")]
    #[test_case(r#"{"error":42}"#; "numeric error")]
    #[test_case(r#"[1,2,3]"#; "json array")]
    fn test_unrecognized_body_falls_back(body: &str) {
        let err = ErrorNormalizer::normalize(Provider::Hotelbeds, 502, body);
        assert_eq!(err.http_status, 502);
        assert_eq!(err.kind, ErrorKind::ProviderServerFailure);
        assert_eq!(
            err.message,
            "502 BAD GATEWAY - Error communicating with HotelBeds"
        );
    }

    #[test]
    fn test_lookup_provider_fallback_source() {
        let err = ErrorNormalizer::normalize(Provider::Iata, 500, "oops");
        assert_eq!(err.origin, ErrorSource::ExternalApi);
        assert!(err.message.contains("API Ninjas"));
    }

    #[test]
    fn test_detect_shapes() {
        assert!(matches!(
            ErrorEnvelope::detect(r#"{"errors":[{"detail":"x"}]}"#),
            ErrorEnvelope::ProblemList(_)
        ));
        assert_eq!(
            ErrorEnvelope::detect(r#"{"error":{"code":"C","message":"M"}}"#),
            ErrorEnvelope::Coded {
                code: "C".to_string(),
                message: "M".to_string()
            }
        );
        assert_eq!(
            ErrorEnvelope::detect(r#"{"error":"nope"}"#),
            ErrorEnvelope::Plain("nope".to_string())
        );
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let body = "ñ".repeat(10);
        let out = truncate_for_log(&body, 5);
        assert!(out.ends_with('…'));
        assert!(out.len() <= 5 + '…'.len_utf8());
    }
}
