// Airport lookup by IATA code, authenticated with a static API key.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{join_url, IataConfig};
use crate::error::{ErrorSource, NormalizedError, Provider, Result};
use crate::http::ProviderHttp;

const AIRPORTS_PATH: &str = "/v1/airports";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub iata: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Three ASCII letters, upper-cased.
pub fn normalize_iata_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(NormalizedError::invalid_request(format!(
            "Invalid IATA code: {:?}",
            code
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub struct IataClient {
    http: ProviderHttp,
    config: IataConfig,
}

impl IataClient {
    pub fn new(client: Client, config: IataConfig) -> Self {
        Self {
            http: ProviderHttp::new(client, Provider::Iata),
            config,
        }
    }

    pub async fn airport_by_iata(&self, code: &str) -> Result<Airport> {
        let code = normalize_iata_code(code)?;
        info!(provider = %Provider::Iata, code = %code, "looking up airport");

        let request = self
            .http
            .client()
            .get(join_url(&self.config.base_url, AIRPORTS_PATH))
            .query(&[("iata", code.as_str())])
            .header("X-Api-Key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        let airports: Vec<Airport> = self.http.send_json(request, "airport_lookup").await?;
        first_airport(airports, &code)
    }
}

fn first_airport(airports: Vec<Airport>, code: &str) -> Result<Airport> {
    airports.into_iter().next().ok_or_else(|| {
        NormalizedError::not_found(
            ErrorSource::ExternalApi,
            format!("No airport found for IATA code {}", code),
        )
    })
}
