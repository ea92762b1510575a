// Signature provider: bulk content feed plus the live availability endpoints.
// No bearer token here; every request is signed with sha256(key + secret + unix seconds).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{join_url, HotelbedsConfig};
use crate::error::{Provider, Result};
use crate::http::ProviderHttp;
use crate::sync::{ContentCategory, ContentFeed, PageRequest};
use crate::token::{Clock, SystemClock};

const CONTENT_ROOT: &str = "/hotel-content-api/1.0";
const AVAILABILITY_PATH: &str = "/hotel-api/1.0/hotels";
const CHECK_RATES_PATH: &str = "/hotel-api/1.0/checkrates";

/// Lowercase hex SHA-256 of `api_key + api_secret + timestamp`.
pub fn signature(api_key: &str, api_secret: &str, unix_seconds: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher.update(unix_seconds.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

pub struct HotelbedsClient {
    http: ProviderHttp,
    config: HotelbedsConfig,
    clock: Arc<dyn Clock>,
}

impl HotelbedsClient {
    pub fn new(client: Client, config: HotelbedsConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Client, config: HotelbedsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            http: ProviderHttp::new(client, Provider::Hotelbeds),
            config,
            clock,
        }
    }

    // Fresh signature per request
    fn signed(&self, builder: RequestBuilder) -> RequestBuilder {
        let timestamp = self.clock.now().timestamp();
        builder
            .header("Api-key", &self.config.api_key)
            .header(
                "X-Signature",
                signature(&self.config.api_key, &self.config.api_secret, timestamp),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_ENCODING, "gzip")
    }

    pub fn content_url(&self, category: ContentCategory) -> String {
        join_url(
            &self.config.base_url,
            &format!("{}/{}", CONTENT_ROOT, category.path()),
        )
    }

    /// Availability search; request and response are passed through untouched.
    pub async fn availability(&self, body: &Value) -> Result<Value> {
        info!(provider = %Provider::Hotelbeds, "searching hotel availability");
        let builder = self
            .http
            .client()
            .post(join_url(&self.config.base_url, AVAILABILITY_PATH))
            .json(body);
        self.http
            .send_json(self.signed(builder), "availability")
            .await
    }

    /// Re-prices the rate keys in `body`.
    pub async fn check_rates(&self, body: &Value) -> Result<Value> {
        let builder = self
            .http
            .client()
            .post(join_url(&self.config.base_url, CHECK_RATES_PATH))
            .json(body);
        self.http.send_json(self.signed(builder), "check_rates").await
    }
}

#[async_trait]
impl ContentFeed for HotelbedsClient {
    async fn fetch_page(&self, category: ContentCategory, request: &PageRequest) -> Result<Value> {
        let url = self.content_url(category);
        debug!(
            category = %category,
            url = %url,
            from = request.from,
            to = request.to,
            "fetching content page"
        );
        let builder = self.http.client().get(url).query(&request.query());
        self.http
            .send_json(self.signed(builder), category.as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ManualClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_signature_matches_direct_digest() {
        let expected = hex::encode(Sha256::digest(b"key123secret4561700000000"));
        assert_eq!(signature("key123", "secret456", 1_700_000_000), expected);
    }

    #[test]
    fn test_signature_shape() {
        let sig = signature("key", "secret", 1_700_000_000);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_signature_changes_every_second() {
        assert_ne!(
            signature("key", "secret", 1_700_000_000),
            signature("key", "secret", 1_700_000_001)
        );
    }

    #[test]
    fn test_signed_request_headers() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let config = HotelbedsConfig {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..HotelbedsConfig::default()
        };
        let client = HotelbedsClient::with_clock(Client::new(), config, clock);

        let request = client
            .signed(client.http.client().get(client.content_url(ContentCategory::Hotels)))
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers["Api-key"], "key");
        assert_eq!(
            headers["X-Signature"].to_str().unwrap(),
            signature("key", "secret", 1_700_000_000)
        );
        assert_eq!(headers["Accept"], "application/json");
        assert_eq!(
            request.url().as_str(),
            "https://api.test.hotelbeds.com/hotel-content-api/1.0/hotels"
        );
    }

    #[test]
    fn test_content_urls() {
        let client = HotelbedsClient::new(Client::new(), HotelbedsConfig::default());
        assert!(client
            .content_url(ContentCategory::FacilityGroups)
            .ends_with("/hotel-content-api/1.0/types/facilitygroups"));
        assert!(client
            .content_url(ContentCategory::Countries)
            .ends_with("/hotel-content-api/1.0/locations/countries"));
    }
}
