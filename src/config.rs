// Provider configuration.
// Everything comes from the environment; secrets never show up in Debug output.

use chrono::Duration as ChronoDuration;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

// Shared HTTP client timeouts
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            read_timeout_ms: 10000,
            user_agent: concat!("travel_provider_core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// Bearer-token provider
#[derive(Clone, PartialEq)]
pub struct AmadeusConfig {
    pub base_url: String,
    pub token_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub token_duration_secs: i64,
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://test.api.amadeus.com".to_string(),
            token_url: "/v1/security/oauth2/token".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            token_duration_secs: 1800,
        }
    }
}

impl AmadeusConfig {
    /// Absolute token endpoint; `token_url` may be relative to `base_url`.
    pub fn token_endpoint(&self) -> String {
        if self.token_url.starts_with("http://") || self.token_url.starts_with("https://") {
            self.token_url.clone()
        } else {
            join_url(&self.base_url, &self.token_url)
        }
    }

    pub fn default_token_lifetime(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.token_duration_secs)
    }
}

impl fmt::Debug for AmadeusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmadeusConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"<redacted>")
            .field("token_duration_secs", &self.token_duration_secs)
            .finish()
    }
}

// Signature provider (content feed + availability)
#[derive(Clone, PartialEq)]
pub struct HotelbedsConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Default for HotelbedsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.test.hotelbeds.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl fmt::Debug for HotelbedsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotelbedsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// Static API-key airport lookup
#[derive(Clone, PartialEq)]
pub struct IataConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for IataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.api-ninjas.com".to_string(),
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for IataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IataConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSettings {
    pub amadeus: AmadeusConfig,
    pub hotelbeds: HotelbedsConfig,
    pub iata: IataConfig,
    pub http: HttpConfig,
}

impl ProviderSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable lookup. Credentials are required;
    /// URLs, token lifetime and timeouts fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        let defaults = Self::default();

        let amadeus = AmadeusConfig {
            base_url: get("AMADEUS_BASE_URL").unwrap_or(defaults.amadeus.base_url),
            token_url: get("AMADEUS_TOKEN_URL").unwrap_or(defaults.amadeus.token_url),
            api_key: require("AMADEUS_API_KEY")?,
            api_secret: require("AMADEUS_API_SECRET")?,
            token_duration_secs: parse_or(
                "AMADEUS_TOKEN_DURATION",
                get("AMADEUS_TOKEN_DURATION"),
                defaults.amadeus.token_duration_secs,
            )?,
        };
        if amadeus.token_duration_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                name: "AMADEUS_TOKEN_DURATION".to_string(),
                value: amadeus.token_duration_secs.to_string(),
            });
        }

        let hotelbeds = HotelbedsConfig {
            base_url: get("HOTELBEDS_BASE_URL").unwrap_or(defaults.hotelbeds.base_url),
            api_key: require("HOTELBEDS_API_KEY")?,
            api_secret: require("HOTELBEDS_API_SECRET")?,
        };

        let iata = IataConfig {
            base_url: get("IATA_BASE_URL").unwrap_or(defaults.iata.base_url),
            api_key: require("IATA_API_KEY")?,
        };

        let http = HttpConfig {
            connect_timeout_ms: parse_or(
                "HTTP_CONNECT_TIMEOUT_MS",
                get("HTTP_CONNECT_TIMEOUT_MS"),
                defaults.http.connect_timeout_ms,
            )?,
            read_timeout_ms: parse_or(
                "HTTP_READ_TIMEOUT_MS",
                get("HTTP_READ_TIMEOUT_MS"),
                defaults.http.read_timeout_ms,
            )?,
            user_agent: defaults.http.user_agent,
        };

        Ok(Self {
            amadeus,
            hotelbeds,
            iata,
            http,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// Keeps the first four characters of a key for log correlation
fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "<redacted>".to_string()
    } else {
        format!("{}…", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AMADEUS_API_KEY", "amadeus-key"),
            ("AMADEUS_API_SECRET", "amadeus-secret"),
            ("HOTELBEDS_API_KEY", "hb-key-123"),
            ("HOTELBEDS_API_SECRET", "hb-secret"),
            ("IATA_API_KEY", "ninja-key"),
        ])
    }

    fn settings_from(
        vars: HashMap<&'static str, &'static str>,
    ) -> Result<ProviderSettings, ConfigError> {
        ProviderSettings::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_apply_when_optional_vars_missing() {
        let settings = settings_from(required_vars()).unwrap();
        assert_eq!(settings.amadeus.base_url, "https://test.api.amadeus.com");
        assert_eq!(
            settings.amadeus.token_endpoint(),
            "https://test.api.amadeus.com/v1/security/oauth2/token"
        );
        assert_eq!(settings.amadeus.token_duration_secs, 1800);
        assert_eq!(settings.hotelbeds.api_key, "hb-key-123");
        assert_eq!(settings.http.connect_timeout_ms, 5000);
        assert_eq!(settings.http.read_timeout_ms, 10000);
    }

    #[test_case("AMADEUS_API_KEY"; "amadeus key")]
    #[test_case("HOTELBEDS_API_SECRET"; "hotelbeds secret")]
    #[test_case("IATA_API_KEY"; "iata key")]
    fn test_missing_credentials_rejected(name: &'static str) {
        let mut vars = required_vars();
        vars.remove(name);
        assert_eq!(
            settings_from(vars).unwrap_err(),
            ConfigError::MissingVar(name.to_string())
        );
    }

    #[test_case("AMADEUS_TOKEN_DURATION", "soon"; "non numeric duration")]
    #[test_case("AMADEUS_TOKEN_DURATION", "0"; "zero duration")]
    #[test_case("HTTP_READ_TIMEOUT_MS", "-5"; "negative timeout")]
    fn test_invalid_values_rejected(name: &'static str, value: &'static str) {
        let mut vars = required_vars();
        vars.insert(name, value);
        assert!(matches!(
            settings_from(vars),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_absolute_token_url_is_used_as_is() {
        let mut vars = required_vars();
        vars.insert("AMADEUS_TOKEN_URL", "https://auth.example.com/oauth/token");
        vars.insert("AMADEUS_BASE_URL", "https://api.amadeus.com/");
        let settings = settings_from(vars).unwrap();
        assert_eq!(
            settings.amadeus.token_endpoint(),
            "https://auth.example.com/oauth/token"
        );
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let settings = settings_from(required_vars()).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("amadeus-secret"));
        assert!(!rendered.contains("hb-secret"));
        assert!(!rendered.contains("ninja-key"));
        assert!(rendered.contains("hb-k…"));
    }

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(join_url("https://a.com/", "/v1/x"), "https://a.com/v1/x");
        assert_eq!(join_url("https://a.com", "v1/x"), "https://a.com/v1/x");
    }
}
