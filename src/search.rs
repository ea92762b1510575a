// Consumer-facing search contract and the hotel-details read model.
// Search payloads pass through untouched; only the city list is reshaped.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::amadeus::{AmadeusClient, FlightSearchRequest, HotelOffersRequest};
use crate::error::{ErrorKind, ErrorSource, NormalizedError, Result};
use crate::model::{Country, Destination, Hotel};
use crate::store::ReferenceStores;
use crate::token::TokenLifecycleManager;

/// Bearer-token searches against the flight and hotel-offer provider.
pub struct SearchOrchestrator {
    tokens: TokenLifecycleManager,
    amadeus: AmadeusClient,
}

impl SearchOrchestrator {
    pub fn new(tokens: TokenLifecycleManager, amadeus: AmadeusClient) -> Self {
        Self { tokens, amadeus }
    }

    pub fn tokens(&self) -> &TokenLifecycleManager {
        &self.tokens
    }

    /// Runs `call` with a valid token. A provider 401 drops the cached token
    /// and the call is repeated once with a freshly issued one.
    pub async fn authorized<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.tokens.get_token().await?;
        match call(token).await {
            Err(err) if is_rejected_token(&err, self.tokens.provider().error_source()) => {
                warn!(
                    operation,
                    provider = %self.tokens.provider(),
                    "token rejected, refreshing once"
                );
                self.tokens.invalidate();
                let token = self.tokens.get_token().await?;
                call(token).await
            }
            outcome => outcome,
        }
    }

    pub async fn search_flights(&self, request: &FlightSearchRequest) -> Result<Value> {
        let amadeus = &self.amadeus;
        self.authorized("flight_offers", move |token| async move {
            amadeus.search_flight_offers(request, &token).await
        })
        .await
    }

    pub async fn upsell_flights(&self, body: &Value) -> Result<Value> {
        let amadeus = &self.amadeus;
        self.authorized("flight_upselling", move |token| async move {
            amadeus.upsell_flight_offers(body, &token).await
        })
        .await
    }

    pub async fn price_flight(&self, body: &Value) -> Result<Value> {
        let amadeus = &self.amadeus;
        self.authorized("flight_pricing", move |token| async move {
            amadeus.price_flight_offer(body, &token).await
        })
        .await
    }

    pub async fn search_cities(&self, keyword: &str) -> Result<Vec<City>> {
        let amadeus = &self.amadeus;
        let response = self
            .authorized("city_search", move |token| async move {
                amadeus.search_cities(keyword, &token).await
            })
            .await?;
        let cities = cities_from_response(&response);
        debug!(keyword, found = cities.len(), "city search mapped");
        Ok(cities)
    }

    pub async fn hotel_offers(&self, request: &HotelOffersRequest) -> Result<Value> {
        let amadeus = &self.amadeus;
        self.authorized("hotel_offers", move |token| async move {
            amadeus.hotel_offers(request, &token).await
        })
        .await
    }

    pub async fn hotel_offer_details(&self, offer_id: &str) -> Result<Value> {
        let amadeus = &self.amadeus;
        self.authorized("hotel_offer_details", move |token| async move {
            amadeus.hotel_offer_details(offer_id, &token).await
        })
        .await
    }
}

// Only a 401 from the provider itself; a failed token fetch is not retried here
fn is_rejected_token(err: &NormalizedError, provider: ErrorSource) -> bool {
    err.kind == ErrorKind::AuthFailure && err.http_status == 401 && err.origin == provider
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub name: Option<String>,
    pub iata_code: String,
    pub country_code: Option<String>,
}

/// Reduces a city search response to the entries that carry an IATA code.
pub fn cities_from_response(response: &Value) -> Vec<City> {
    let Some(data) = response.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    data.iter()
        .filter_map(|city| {
            let iata_code = city.get("iataCode").and_then(Value::as_str)?;
            Some(City {
                name: city.get("name").and_then(Value::as_str).map(str::to_string),
                iata_code: iata_code.to_string(),
                country_code: city
                    .pointer("/address/countryCode")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDetail {
    pub code: i64,
    pub group_code: i64,
    pub description: Option<String>,
    pub group_description: Option<String>,
}

/// A mirrored hotel with its reference codes resolved to descriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetails {
    pub hotel: Hotel,
    pub country: Option<Country>,
    pub destination: Option<Destination>,
    pub category_description: Option<String>,
    pub chain_description: Option<String>,
    pub accommodation_description: Option<String>,
    pub facilities: Vec<FacilityDetail>,
}

/// Read side of the local mirror.
pub struct HotelDirectory {
    stores: ReferenceStores,
}

impl HotelDirectory {
    pub fn new(stores: ReferenceStores) -> Self {
        Self { stores }
    }

    pub async fn hotel_details(&self, code: &str) -> Result<HotelDetails> {
        let hotel = self
            .stores
            .hotels
            .find(&code.to_string())
            .await?
            .ok_or_else(|| {
                NormalizedError::not_found(
                    ErrorSource::Backend,
                    format!("No hotel found with code {}", code),
                )
            })?;

        // Dangling codes resolve to None
        let country = match &hotel.country_code {
            Some(c) => self.stores.countries.find(c).await?,
            None => None,
        };
        let destination = match &hotel.destination_code {
            Some(d) => self.stores.destinations.find(d).await?,
            None => None,
        };
        let category_description = match &hotel.category_code {
            Some(c) => self.stores.categories.find(c).await?.and_then(|c| c.description),
            None => None,
        };
        let chain_description = match &hotel.chain_code {
            Some(c) => self.stores.chains.find(c).await?.and_then(|c| c.description),
            None => None,
        };
        let accommodation_description = match &hotel.accommodation_type_code {
            Some(c) => self
                .stores
                .accommodations
                .find(c)
                .await?
                .and_then(|a| a.type_description),
            None => None,
        };

        let mut facilities = Vec::new();
        for (facility_code, group_code) in facility_refs(hotel.facilities.as_ref()) {
            let description = self
                .stores
                .facilities
                .find(&(facility_code, group_code))
                .await?
                .and_then(|f| f.description);
            let group_description = self
                .stores
                .facility_groups
                .find(&group_code)
                .await?
                .and_then(|g| g.description);
            facilities.push(FacilityDetail {
                code: facility_code,
                group_code,
                description,
                group_description,
            });
        }

        info!(hotel = %hotel.code, facilities = facilities.len(), "hotel details resolved");
        Ok(HotelDetails {
            hotel,
            country,
            destination,
            category_description,
            chain_description,
            accommodation_description,
            facilities,
        })
    }
}

// (facilityCode, facilityGroupCode) pairs from the hotel's facilities blob
fn facility_refs(blob: Option<&Value>) -> Vec<(i64, i64)> {
    let Some(entries) = blob.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|f| {
            let code = int_field(f, "facilityCode")?;
            let group = int_field(f, "facilityGroupCode")?;
            Some((code, group))
        })
        .collect()
}

fn int_field(value: &Value, name: &str) -> Option<i64> {
    match value.get(name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
