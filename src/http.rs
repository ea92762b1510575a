// Shared request plumbing for the provider clients.
// Every response goes through `send_json`, so a raw transport or HTTP failure never
// leaves this module without first becoming a `NormalizedError`.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{ErrorKind, ErrorSource, NormalizedError, Provider, Result};
use crate::normalizer::{truncate_for_log, ErrorNormalizer};

pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.read_timeout())
        .user_agent(config.user_agent.clone())
        .gzip(true)
        .build()
        .map_err(|e| {
            NormalizedError::new(
                ErrorKind::ProviderServerFailure,
                500,
                format!("Could not build HTTP client: {}", e),
                ErrorSource::Backend,
            )
        })
}

#[derive(Debug, Clone)]
pub struct ProviderHttp {
    client: Client,
    provider: Provider,
}

impl ProviderHttp {
    pub fn new(client: Client, provider: Provider) -> Self {
        Self { client, provider }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Sends the request and decodes a JSON body of type `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let body = self.send(request, operation).await?;
        decode(self.provider, operation, &body)
    }

    /// Sends the request and returns the raw success body.
    pub async fn send(&self, request: RequestBuilder, operation: &str) -> Result<String> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(
                provider = %self.provider,
                operation,
                error = %e,
                "provider request failed in transport"
            );
            NormalizedError::transport(self.provider, &e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NormalizedError::transport(self.provider, &e))?;

        debug!(
            provider = %self.provider,
            operation,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "provider response"
        );

        if !status.is_success() {
            let err = ErrorNormalizer::normalize(self.provider, status.as_u16(), &body);
            warn!(
                provider = %self.provider,
                operation,
                status = err.http_status,
                kind = ?err.kind,
                message = %err.message,
                "provider returned an error"
            );
            return Err(err);
        }

        Ok(body)
    }
}

/// Decodes a success body; a shape mismatch is a `MappingFailure`.
pub fn decode<T: DeserializeOwned>(provider: Provider, operation: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        warn!(
            provider = %provider,
            operation,
            error = %e,
            body = %truncate_for_log(body, 256),
            "could not decode provider response"
        );
        NormalizedError::mapping(
            provider.error_source(),
            format!("Unexpected {} response for {}: {}", provider, operation, e),
        )
    })
}
