// Bearer-token provider: OAuth token endpoint plus the flight and hotel-offer search endpoints.
// Search payloads are opaque JSON; only the query strings are built here.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use std::sync::Arc;
use serde_json::Value;
use tracing::info;

use crate::config::{join_url, AmadeusConfig};
use crate::error::{NormalizedError, Provider, Result};
use crate::http::ProviderHttp;
use crate::token::{TokenLifecycleManager, TokenResponse, TokenSource};

const FLIGHT_OFFERS_V2: &str = "/v2/shopping/flight-offers";
const FLIGHT_OFFERS_V1: &str = "/v1/shopping/flight-offers";
const CITIES_PATH: &str = "/v1/reference-data/locations/cities";
const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";

// Client-credentials grant against the token endpoint
pub struct AmadeusAuthClient {
    http: ProviderHttp,
    config: AmadeusConfig,
}

impl AmadeusAuthClient {
    pub fn new(client: Client, config: AmadeusConfig) -> Self {
        Self {
            http: ProviderHttp::new(client, Provider::Amadeus),
            config,
        }
    }

    /// Shared token manager for this provider, falling back to the configured
    /// lifetime when the endpoint omits `expires_in`.
    pub fn token_manager(client: Client, config: AmadeusConfig) -> TokenLifecycleManager {
        let lifetime = config.default_token_lifetime();
        TokenLifecycleManager::new(Arc::new(Self::new(client, config)), lifetime)
    }
}

#[async_trait]
impl TokenSource for AmadeusAuthClient {
    fn provider(&self) -> Provider {
        Provider::Amadeus
    }

    async fn fetch_token(&self) -> Result<TokenResponse> {
        info!(provider = %Provider::Amadeus, "requesting access token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.api_key.as_str()),
            ("client_secret", self.config.api_secret.as_str()),
        ];
        let request = self
            .http
            .client()
            .post(self.config.token_endpoint())
            .form(&form);
        self.http.send_json(request, "token").await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl TravelClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::PremiumEconomy => "PREMIUM_ECONOMY",
            TravelClass::Business => "BUSINESS",
            TravelClass::First => "FIRST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    pub children: Option<u32>,
    pub infants: Option<u32>,
    pub travel_class: Option<TravelClass>,
    pub max_results: Option<u32>,
    pub currency: Option<String>,
    pub non_stop: Option<bool>,
}

impl FlightSearchRequest {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        adults: u32,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date,
            return_date: None,
            adults,
            children: None,
            infants: None,
            travel_class: None,
            max_results: None,
            currency: None,
            non_stop: None,
        }
    }

    /// Query parameters in the order the endpoint documents them; absent options are omitted.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("originLocationCode", self.origin.clone()),
            ("destinationLocationCode", self.destination.clone()),
            ("departureDate", self.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", self.adults.to_string()),
        ];
        if let Some(date) = self.return_date {
            query.push(("returnDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(children) = self.children {
            query.push(("children", children.to_string()));
        }
        if let Some(infants) = self.infants {
            query.push(("infants", infants.to_string()));
        }
        if let Some(class) = self.travel_class {
            query.push(("travelClass", class.as_str().to_string()));
        }
        if let Some(currency) = &self.currency {
            query.push(("currencyCode", currency.clone()));
        }
        if let Some(max) = self.max_results {
            query.push(("max", max.to_string()));
        }
        if let Some(non_stop) = self.non_stop {
            query.push(("nonStop", non_stop.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotelOffersRequest {
    pub hotel_ids: Vec<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub adults: Option<u32>,
    pub room_quantity: Option<u32>,
    pub currency: Option<String>,
    pub price_range: Option<String>,
    pub board_type: Option<String>,
}

impl HotelOffersRequest {
    pub fn for_hotels<I, S>(hotel_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hotel_ids: hotel_ids.into_iter().map(Into::into).collect(),
            check_in_date: None,
            check_out_date: None,
            adults: None,
            room_quantity: None,
            currency: None,
            price_range: None,
            board_type: None,
        }
    }

    pub fn query(&self) -> Result<Vec<(&'static str, String)>> {
        if self.hotel_ids.is_empty() {
            return Err(NormalizedError::invalid_request(
                "At least one hotel id is required",
            ));
        }

        let mut query = vec![("hotelIds", self.hotel_ids.join(","))];
        if let Some(date) = self.check_in_date {
            query.push(("checkInDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.check_out_date {
            query.push(("checkOutDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(adults) = self.adults {
            query.push(("adults", adults.to_string()));
        }
        if let Some(rooms) = self.room_quantity {
            query.push(("roomQuantity", rooms.to_string()));
        }
        if let Some(currency) = &self.currency {
            query.push(("currency", currency.clone()));
        }
        if let Some(range) = &self.price_range {
            query.push(("priceRange", range.clone()));
        }
        if let Some(board) = &self.board_type {
            query.push(("boardType", board.clone()));
        }
        Ok(query)
    }
}

/// Search endpoints. Every call takes the bearer token from the caller.
#[derive(Debug, Clone)]
pub struct AmadeusClient {
    http: ProviderHttp,
    base_url: String,
}

impl AmadeusClient {
    pub fn new(client: Client, config: &AmadeusConfig) -> Self {
        Self {
            http: ProviderHttp::new(client, Provider::Amadeus),
            base_url: config.base_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    // The id is one percent-encoded path segment
    fn offer_url(&self, offer_id: &str) -> Result<Url> {
        let offer_id = offer_id.trim();
        if offer_id.is_empty() {
            return Err(NormalizedError::invalid_request("Offer id must not be empty"));
        }
        let mut url = Url::parse(&self.url(HOTEL_OFFERS_PATH)).map_err(|e| {
            NormalizedError::invalid_request(format!("Invalid hotel offers URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| NormalizedError::invalid_request("Base URL cannot take a path"))?
            .push(offer_id);
        Ok(url)
    }

    pub async fn search_flight_offers(
        &self,
        request: &FlightSearchRequest,
        token: &str,
    ) -> Result<Value> {
        info!(
            origin = %request.origin,
            destination = %request.destination,
            departure = %request.departure_date,
            "searching flight offers"
        );
        let builder = self
            .http
            .client()
            .get(self.url(FLIGHT_OFFERS_V2))
            .bearer_auth(token)
            .query(&request.query());
        self.http.send_json(builder, "flight_offers").await
    }

    pub async fn upsell_flight_offers(&self, body: &Value, token: &str) -> Result<Value> {
        let builder = self
            .http
            .client()
            .post(self.url(&format!("{}/upselling", FLIGHT_OFFERS_V1)))
            .bearer_auth(token)
            .json(body);
        self.http.send_json(builder, "flight_upselling").await
    }

    pub async fn price_flight_offer(&self, body: &Value, token: &str) -> Result<Value> {
        let builder = self
            .http
            .client()
            .post(self.url(&format!("{}/pricing", FLIGHT_OFFERS_V1)))
            .bearer_auth(token)
            .json(body);
        self.http.send_json(builder, "flight_pricing").await
    }

    pub async fn search_cities(&self, keyword: &str, token: &str) -> Result<Value> {
        let builder = self
            .http
            .client()
            .get(self.url(CITIES_PATH))
            .bearer_auth(token)
            .query(&[("keyword", keyword)]);
        self.http.send_json(builder, "city_search").await
    }

    pub async fn hotel_offers(&self, request: &HotelOffersRequest, token: &str) -> Result<Value> {
        let query = request.query()?;
        info!(hotels = request.hotel_ids.len(), "searching hotel offers");
        let builder = self
            .http
            .client()
            .get(self.url(HOTEL_OFFERS_PATH))
            .bearer_auth(token)
            .query(&query);
        self.http.send_json(builder, "hotel_offers").await
    }

    pub async fn hotel_offer_details(&self, offer_id: &str, token: &str) -> Result<Value> {
        let url = self.offer_url(offer_id)?;
        let builder = self.http.client().get(url).bearer_auth(token);
        self.http.send_json(builder, "hotel_offer_details").await
    }
}
