// Local mirror of the provider's reference content.
// Every entity is keyed by the provider's own code (or a composite of codes) and carries
// the time it was last written by a sync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::store::Entity;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub code: String,
    pub iso_code: Option<String>,
    pub description: String,
    // States exactly as the feed sent them, alongside the State rows
    pub raw_states: Option<Value>,
    pub synced_at: DateTime<Utc>,
}

// Keyed by (country_code, code); `id` is a local surrogate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    pub id: Option<u64>,
    pub country_code: String,
    pub code: String,
    pub name: String,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Destination {
    pub code: String,
    pub name: String,
    // Set only when the country was already mirrored
    pub country_code: Option<String>,
    pub iso_code: Option<String>,
    pub synced_at: DateTime<Utc>,
}

// Keyed by (zone_code, destination_code); `id` is a local surrogate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: Option<u64>,
    pub zone_code: i64,
    pub destination_code: String,
    pub name: String,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accommodation {
    pub code: String,
    pub type_description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub code: String,
    pub description: Option<String>,
    pub multi_lingual_code: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub code: String,
    pub simple_code: Option<i64>,
    pub accommodation_type: Option<String>,
    pub group: Option<String>,
    pub description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    pub code: String,
    pub description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityGroup {
    pub code: i64,
    pub description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub code: i64,
    pub facility_group_code: i64,
    pub facility_typology_code: Option<i64>,
    pub description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub code: i64,
    pub description: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Terminal {
    pub code: String,
    pub terminal_type: Option<String>,
    pub country: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub language_code: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A hotel as mirrored from the bulk content feed.
///
/// Foreign codes other than `country_code` are kept as the feed sent them and may point
/// at rows that are not mirrored yet. The nested sub-objects are stored as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotel {
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub country_code: Option<String>,
    pub state_code: Option<String>,
    pub destination_code: Option<String>,
    pub zone_code: Option<i64>,
    pub coordinates: Option<Coordinates>,
    pub category_code: Option<String>,
    pub category_group_code: Option<String>,
    pub chain_code: Option<String>,
    pub accommodation_type_code: Option<String>,
    pub board_codes: Vec<String>,
    pub segment_codes: Vec<i64>,
    pub address: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub web: Option<String>,
    pub license: Option<String>,
    pub giata_code: Option<i64>,
    pub s2c: Option<String>,
    pub ranking: Option<i64>,
    pub phones: Option<Value>,
    pub rooms: Option<Value>,
    pub facilities: Option<Value>,
    pub images: Option<Value>,
    pub terminals: Option<Value>,
    pub interest_points: Option<Value>,
    pub wildcards: Option<Value>,
    pub issues: Option<Value>,
    pub last_provider_update: Option<String>,
    pub synced_at: DateTime<Utc>,
}

impl Entity for Country {
    type Key = String;
    const KIND: &'static str = "country";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for State {
    type Key = (String, String);
    const KIND: &'static str = "state";

    fn key(&self) -> (String, String) {
        (self.country_code.clone(), self.code.clone())
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl Entity for Destination {
    type Key = String;
    const KIND: &'static str = "destination";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Zone {
    type Key = (i64, String);
    const KIND: &'static str = "zone";

    fn key(&self) -> (i64, String) {
        (self.zone_code, self.destination_code.clone())
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl Entity for Accommodation {
    type Key = String;
    const KIND: &'static str = "accommodation";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Board {
    type Key = String;
    const KIND: &'static str = "board";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Category {
    type Key = String;
    const KIND: &'static str = "category";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Chain {
    type Key = String;
    const KIND: &'static str = "chain";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for FacilityGroup {
    type Key = i64;
    const KIND: &'static str = "facility_group";

    fn key(&self) -> i64 {
        self.code
    }
}

impl Entity for Facility {
    type Key = (i64, i64);
    const KIND: &'static str = "facility";

    fn key(&self) -> (i64, i64) {
        (self.code, self.facility_group_code)
    }
}

impl Entity for Segment {
    type Key = i64;
    const KIND: &'static str = "segment";

    fn key(&self) -> i64 {
        self.code
    }
}

impl Entity for Terminal {
    type Key = String;
    const KIND: &'static str = "terminal";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Hotel {
    type Key = String;
    const KIND: &'static str = "hotel";

    fn key(&self) -> String {
        self.code.clone()
    }
}
