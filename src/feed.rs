// Raw record shapes of the signature provider's bulk content feed.
// Records are decoded one at a time so a malformed record fails alone.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorSource, NormalizedError, Result};
use crate::model::{
    Accommodation, Board, Category, Chain, Coordinates, Country, Destination, Facility,
    FacilityGroup, Hotel, Segment, Terminal,
};
use crate::sync::ContentCategory;

// Names and descriptions arrive either localized or as a bare string
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Content {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, rename = "languageCode")]
        language_code: Option<String>,
    },
}

impl LocalizedText {
    pub fn text(&self) -> Option<String> {
        let raw = match self {
            LocalizedText::Plain(s) => Some(s.as_str()),
            LocalizedText::Content { content, .. } => content.as_deref(),
        };
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn language_code(&self) -> Option<String> {
        match self {
            LocalizedText::Plain(_) => None,
            LocalizedText::Content { language_code, .. } => language_code.clone(),
        }
    }
}

fn text_of(value: &Option<LocalizedText>) -> Option<String> {
    value.as_ref().and_then(LocalizedText::text)
}

// Codes that are sometimes numbers and sometimes numeric strings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_code(&self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn mapping(message: impl Into<String>) -> NormalizedError {
    NormalizedError::mapping(ErrorSource::Hotelbeds, message)
}

// Trimmed, non-empty natural key
fn required_code(kind: &str, code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(mapping(format!("{} code is empty", kind)));
    }
    Ok(code.to_string())
}

fn required_i64(kind: &str, field: &str, value: &Scalar) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| mapping(format!("{} {} is not an integer: {:?}", kind, field, value)))
}

/// Decodes one raw record; any shape mismatch is a `MappingFailure`.
pub fn decode_record<T: DeserializeOwned>(category: ContentCategory, raw: Value) -> Result<T> {
    serde_json::from_value(raw)
        .map_err(|e| mapping(format!("Malformed {} record: {}", category.as_str(), e)))
}

/// Best-effort key of a raw record, for failure reports.
pub fn raw_key(raw: &Value) -> Option<String> {
    match raw.get("code") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// One page of the bulk feed: the raw records plus the paging envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPage {
    pub records: Vec<Value>,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub total: Option<u64>,
}

impl ContentPage {
    pub fn extract(category: ContentCategory, mut body: Value) -> Result<Self> {
        let number = |body: &Value, field: &str| body.get(field).and_then(Value::as_u64);
        let from = number(&body, "from");
        let to = number(&body, "to");
        let total = number(&body, "total");

        let records = match body.get_mut(category.records_key()).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(mapping(format!(
                    "Expected an array under '{}', got {}",
                    category.records_key(),
                    json_type(&other)
                )))
            }
        };

        Ok(Self {
            records,
            from,
            to,
            total,
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validates a coordinates object. `null` means no coordinates.
pub fn parse_coordinates(raw: &Value) -> Result<Option<Coordinates>> {
    let object = match raw {
        Value::Null => return Ok(None),
        Value::Object(object) => object,
        other => {
            return Err(mapping(format!(
                "coordinates must be an object, got {}",
                json_type(other)
            )))
        }
    };

    let axis = |name: &str, limit: f64| -> Result<f64> {
        let value = match object.get(name) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match value {
            Some(v) if v.is_finite() && v.abs() <= limit => Ok(v),
            _ => Err(mapping(format!(
                "coordinates.{} is missing or invalid: {}",
                name,
                object.get(name).cloned().unwrap_or(Value::Null)
            ))),
        }
    };

    Ok(Some(Coordinates {
        latitude: axis("latitude", 90.0)?,
        longitude: axis("longitude", 180.0)?,
    }))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Plain(String),
    Structured {
        #[serde(default)]
        content: Option<LocalizedText>,
        #[serde(default)]
        street: Option<String>,
        #[serde(default)]
        number: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelRecord {
    pub code: Scalar,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub destination_code: Option<String>,
    #[serde(default)]
    pub zone_code: Option<Scalar>,
    #[serde(default)]
    pub coordinates: Option<Value>,
    #[serde(default)]
    pub category_code: Option<String>,
    #[serde(default)]
    pub category_group_code: Option<String>,
    #[serde(default)]
    pub chain_code: Option<String>,
    #[serde(default)]
    pub accommodation_type_code: Option<String>,
    // null lists and null entries are both treated as absent
    #[serde(default)]
    pub board_codes: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub segment_codes: Option<Vec<Option<Scalar>>>,
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub city: Option<LocalizedText>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub giata_code: Option<Scalar>,
    #[serde(default, rename = "S2C")]
    pub s2c: Option<String>,
    #[serde(default)]
    pub ranking: Option<Scalar>,
    #[serde(default)]
    pub phones: Option<Value>,
    #[serde(default)]
    pub rooms: Option<Value>,
    #[serde(default)]
    pub facilities: Option<Value>,
    #[serde(default)]
    pub images: Option<Value>,
    #[serde(default)]
    pub terminals: Option<Value>,
    #[serde(default)]
    pub interest_points: Option<Value>,
    #[serde(default)]
    pub wildcards: Option<Value>,
    #[serde(default)]
    pub issues: Option<Value>,
    #[serde(default)]
    pub last_update: Option<String>,
}

// Opaque blobs are kept only when they carry something
fn blob(value: Option<Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        other => other,
    }
}

impl HotelRecord {
    /// Maps to a `Hotel` carrying every foreign code as sent; resolving them is the caller's job.
    pub fn into_hotel(self, synced_at: DateTime<Utc>) -> Result<Hotel> {
        let code = required_code("hotel", &self.code.as_code())?;

        let coordinates = match &self.coordinates {
            Some(raw) => parse_coordinates(raw)
                .map_err(|e| mapping(format!("hotel {}: {}", code, e.message)))?,
            None => None,
        };

        let zone_code = match &self.zone_code {
            Some(raw) => Some(required_i64("hotel", "zoneCode", raw)?),
            None => None,
        };

        let (address, street, number) = match self.address {
            Some(RawAddress::Plain(text)) => (Some(text), None, None),
            Some(RawAddress::Structured {
                content,
                street,
                number,
            }) => (text_of(&content), street, number),
            None => (None, None, None),
        };

        Ok(Hotel {
            name: text_of(&self.name),
            description: text_of(&self.description),
            country_code: self.country_code,
            state_code: self.state_code,
            destination_code: self.destination_code,
            zone_code,
            coordinates,
            category_code: self.category_code,
            category_group_code: self.category_group_code,
            chain_code: self.chain_code,
            accommodation_type_code: self.accommodation_type_code,
            board_codes: self
                .board_codes
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            segment_codes: self
                .segment_codes
                .unwrap_or_default()
                .iter()
                .flatten()
                .filter_map(Scalar::as_i64)
                .collect(),
            address,
            street,
            number,
            city: text_of(&self.city),
            postal_code: self.postal_code,
            email: self.email,
            web: self.web,
            license: self.license,
            giata_code: self.giata_code.as_ref().and_then(Scalar::as_i64),
            s2c: self.s2c,
            ranking: self.ranking.as_ref().and_then(Scalar::as_i64),
            phones: blob(self.phones),
            rooms: blob(self.rooms),
            facilities: blob(self.facilities),
            images: blob(self.images),
            terminals: blob(self.terminals),
            interest_points: blob(self.interest_points),
            wildcards: blob(self.wildcards),
            issues: blob(self.issues),
            last_provider_update: self.last_update,
            code,
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRecord {
    pub code: String,
    #[serde(default)]
    pub iso_code: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub states: Option<Value>,
}

impl CountryRecord {
    pub fn into_country(self, synced_at: DateTime<Utc>) -> Result<Country> {
        let code = required_code("country", &self.code)?;
        Ok(Country {
            description: text_of(&self.description).unwrap_or_else(|| format!("Country {}", code)),
            iso_code: self.iso_code,
            raw_states: blob(self.states),
            code,
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    pub code: Scalar,
    #[serde(default)]
    pub name: Option<LocalizedText>,
}

impl StateRecord {
    pub fn code(&self) -> String {
        self.code.as_code()
    }

    pub fn name(&self) -> String {
        text_of(&self.name).unwrap_or_else(|| format!("State {}", self.code()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRecord {
    pub code: String,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub iso_code: Option<String>,
    #[serde(default)]
    pub zones: Option<Vec<Value>>,
}

impl DestinationRecord {
    /// Maps to a `Destination` with its country code as sent; the zones are returned raw.
    pub fn into_destination(self, synced_at: DateTime<Utc>) -> Result<(Destination, Vec<Value>)> {
        let code = required_code("destination", &self.code)?;
        let destination = Destination {
            name: text_of(&self.name).unwrap_or_else(|| format!("Destination {}", code)),
            country_code: self.country_code,
            iso_code: self.iso_code,
            code,
            synced_at,
        };
        Ok((destination, self.zones.unwrap_or_default()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub zone_code: Scalar,
    #[serde(default)]
    pub name: Option<LocalizedText>,
}

impl ZoneRecord {
    pub fn zone_code(&self) -> Result<i64> {
        required_i64("zone", "zoneCode", &self.zone_code)
    }

    pub fn name(&self, zone_code: i64) -> String {
        text_of(&self.name).unwrap_or_else(|| format!("Zone {}", zone_code))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationRecord {
    pub code: String,
    #[serde(default)]
    pub type_description: Option<String>,
    #[serde(default)]
    pub type_multi_description: Option<LocalizedText>,
}

impl AccommodationRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Accommodation> {
        Ok(Accommodation {
            code: required_code("accommodation", &self.code)?,
            type_description: self
                .type_description
                .filter(|s| !s.trim().is_empty())
                .or_else(|| text_of(&self.type_multi_description)),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRecord {
    pub code: String,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub multi_lingual_code: Option<String>,
}

impl BoardRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Board> {
        Ok(Board {
            code: required_code("board", &self.code)?,
            description: text_of(&self.description),
            multi_lingual_code: self.multi_lingual_code,
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub code: String,
    #[serde(default)]
    pub simple_code: Option<Scalar>,
    #[serde(default)]
    pub accommodation_type: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
}

impl CategoryRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Category> {
        Ok(Category {
            code: required_code("category", &self.code)?,
            simple_code: self.simple_code.as_ref().and_then(Scalar::as_i64),
            accommodation_type: self.accommodation_type,
            group: self.group,
            description: text_of(&self.description),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub code: String,
    #[serde(default)]
    pub description: Option<LocalizedText>,
}

impl ChainRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Chain> {
        Ok(Chain {
            code: required_code("chain", &self.code)?,
            description: text_of(&self.description),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityGroupRecord {
    pub code: Scalar,
    #[serde(default)]
    pub description: Option<LocalizedText>,
}

impl FacilityGroupRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<FacilityGroup> {
        Ok(FacilityGroup {
            code: required_i64("facility group", "code", &self.code)?,
            description: text_of(&self.description),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRecord {
    pub code: Scalar,
    pub facility_group_code: Scalar,
    #[serde(default)]
    pub facility_typology_code: Option<Scalar>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
}

impl FacilityRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Facility> {
        Ok(Facility {
            code: required_i64("facility", "code", &self.code)?,
            facility_group_code: required_i64(
                "facility",
                "facilityGroupCode",
                &self.facility_group_code,
            )?,
            facility_typology_code: self
                .facility_typology_code
                .as_ref()
                .and_then(Scalar::as_i64),
            description: text_of(&self.description),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub code: Scalar,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    // Older feed revisions put the text here
    #[serde(default)]
    pub content: Option<String>,
}

impl SegmentRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Segment> {
        Ok(Segment {
            code: required_i64("segment", "code", &self.code)?,
            description: text_of(&self.description)
                .or_else(|| self.content.filter(|s| !s.trim().is_empty())),
            synced_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRecord {
    pub code: String,
    #[serde(default, rename = "type")]
    pub terminal_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
}

impl TerminalRecord {
    pub fn into_entity(self, synced_at: DateTime<Utc>) -> Result<Terminal> {
        let code = required_code("terminal", &self.code)?;
        let language_code = self
            .name
            .as_ref()
            .and_then(LocalizedText::language_code)
            .or_else(|| self.description.as_ref().and_then(LocalizedText::language_code));
        Ok(Terminal {
            terminal_type: self.terminal_type,
            country: self.country,
            name: text_of(&self.name),
            description: text_of(&self.description),
            language_code,
            code,
            synced_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test_case(json!("Hotel Sol"), Some("Hotel Sol"); "plain string")]
    #[test_case(
        json!({"content": "Hotel Sol", "languageCode": "ENG"}),
        Some("Hotel Sol");
        "localized"
    )]
    #[test_case(json!({"languageCode": "ENG"}), None; "localized without content")]
    #[test_case(json!("   "), None; "blank")]
    fn test_localized_text(raw: Value, expected: Option<&str>) {
        let text: LocalizedText = serde_json::from_value(raw).unwrap();
        assert_eq!(text.text().as_deref(), expected);
    }

    #[test_case(json!(12), Some(12); "integer")]
    #[test_case(json!("12"), Some(12); "numeric string")]
    #[test_case(json!(12.0), Some(12); "whole float")]
    #[test_case(json!("north"), None; "word")]
    fn test_scalar_as_i64(raw: Value, expected: Option<i64>) {
        let scalar: Scalar = serde_json::from_value(raw).unwrap();
        assert_eq!(scalar.as_i64(), expected);
    }

    #[test_case(json!({"latitude": 39.57, "longitude": 2.65}), true; "numbers")]
    #[test_case(json!({"latitude": "39.57", "longitude": "2.65"}), true; "numeric strings")]
    #[test_case(json!(null), true; "null")]
    #[test_case(json!({"latitude": "north", "longitude": 2.65}), false; "word latitude")]
    #[test_case(json!({"latitude": 123.0, "longitude": 2.65}), false; "latitude out of range")]
    #[test_case(json!({"longitude": 2.65}), false; "missing latitude")]
    #[test_case(json!("39.57,2.65"), false; "string")]
    fn test_parse_coordinates(raw: Value, ok: bool) {
        let result = parse_coordinates(&raw);
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert_eq!(err.kind, ErrorKind::MappingFailure);
        }
    }

    #[test]
    fn test_hotel_record_maps_fields_and_blobs() {
        let raw = json!({
            "code": 1234,
            "name": {"content": "Hotel Sol"},
            "description": {"content": "Near the beach"},
            "countryCode": "ES",
            "stateCode": "07",
            "destinationCode": "PMI",
            "zoneCode": "10",
            "coordinates": {"longitude": 2.65, "latitude": 39.57},
            "categoryCode": "4EST",
            "chainCode": "SOL",
            "boardCodes": ["BB", "HB"],
            "segmentCodes": [37, "38"],
            "address": {"content": "Calle Mayor 1", "street": "Calle Mayor", "number": "1"},
            "city": {"content": "PALMA"},
            "phones": [{"phoneNumber": "+34 971", "phoneType": "PHONEBOOKING"}],
            "rooms": [],
            "S2C": "1*",
            "ranking": 96,
            "lastUpdate": "2024-02-01"
        });
        let hotel = decode_record::<HotelRecord>(ContentCategory::Hotels, raw)
            .unwrap()
            .into_hotel(now())
            .unwrap();

        assert_eq!(hotel.code, "1234");
        assert_eq!(hotel.name.as_deref(), Some("Hotel Sol"));
        assert_eq!(hotel.zone_code, Some(10));
        assert_eq!(hotel.segment_codes, vec![37, 38]);
        assert_eq!(hotel.address.as_deref(), Some("Calle Mayor 1"));
        assert_eq!(hotel.street.as_deref(), Some("Calle Mayor"));
        assert_eq!(hotel.s2c.as_deref(), Some("1*"));
        assert_eq!(hotel.ranking, Some(96));
        assert!(hotel.phones.is_some());
        // Empty arrays are not stored
        assert!(hotel.rooms.is_none());
        let coordinates = hotel.coordinates.unwrap();
        assert_eq!(coordinates.latitude, 39.57);
    }

    #[test]
    fn test_hotel_record_without_code_is_mapping_failure() {
        let err = decode_record::<HotelRecord>(ContentCategory::Hotels, json!({"name": "x"}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MappingFailure);
        assert!(err.message.contains("hotels"));
    }

    #[test]
    fn test_country_fallback_description() {
        let record: CountryRecord = serde_json::from_value(json!({"code": "AD"})).unwrap();
        let country = record.into_country(now()).unwrap();
        assert_eq!(country.description, "Country AD");
        assert!(country.raw_states.is_none());
    }

    #[test]
    fn test_destination_keeps_raw_zones() {
        let record: DestinationRecord = serde_json::from_value(json!({
            "code": "PMI",
            "countryCode": "ES",
            "zones": [{"zoneCode": 1, "name": "Palma"}, {"zoneCode": "x"}]
        }))
        .unwrap();
        let (destination, zones) = record.into_destination(now()).unwrap();
        assert_eq!(destination.name, "Destination PMI");
        assert_eq!(zones.len(), 2);
    }

    #[test]
    fn test_page_extract() {
        let body = json!({"from": 1, "to": 2, "total": 340, "hotels": [{"code": 1}, {"code": 2}]});
        let page = ContentPage::extract(ContentCategory::Hotels, body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, Some(340));

        let empty = ContentPage::extract(ContentCategory::Hotels, json!({"total": 0})).unwrap();
        assert!(empty.records.is_empty());

        let err = ContentPage::extract(ContentCategory::Hotels, json!({"hotels": {"code": 1}}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MappingFailure);
    }

    #[test]
    fn test_hotel_record_tolerates_null_code_lists() {
        let raw = json!({
            "code": 1,
            "boardCodes": null,
            "segmentCodes": [37, null, "x"]
        });
        let hotel = decode_record::<HotelRecord>(ContentCategory::Hotels, raw)
            .unwrap()
            .into_hotel(now())
            .unwrap();
        assert!(hotel.board_codes.is_empty());
        assert_eq!(hotel.segment_codes, vec![37]);

        let raw = json!({"code": 2, "boardCodes": ["BB", null, " HB "], "segmentCodes": null});
        let hotel = decode_record::<HotelRecord>(ContentCategory::Hotels, raw)
            .unwrap()
            .into_hotel(now())
            .unwrap();
        assert_eq!(hotel.board_codes, vec!["BB".to_string(), "HB".to_string()]);
        assert!(hotel.segment_codes.is_empty());
    }

    #[test_case(json!({"code": " BB "}), Some("BB"); "padded")]
    #[test_case(json!({"code": "BB"}), Some("BB"); "clean")]
    #[test_case(json!({"code": ""}), None; "empty")]
    #[test_case(json!({"code": "   "}), None; "blank")]
    fn test_board_code_is_trimmed_and_required(raw: Value, expected: Option<&str>) {
        let record: BoardRecord = serde_json::from_value(raw).unwrap();
        match (record.into_entity(now()), expected) {
            (Ok(board), Some(code)) => assert_eq!(board.code, code),
            (Err(err), None) => assert_eq!(err.kind, ErrorKind::MappingFailure),
            (other, _) => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_string_keyed_types_reject_blank_codes() {
        let blank = json!({"code": " "});
        let accommodation: AccommodationRecord = serde_json::from_value(blank.clone()).unwrap();
        let category: CategoryRecord = serde_json::from_value(blank.clone()).unwrap();
        let chain: ChainRecord = serde_json::from_value(blank.clone()).unwrap();
        let terminal: TerminalRecord = serde_json::from_value(blank).unwrap();

        assert!(accommodation.into_entity(now()).is_err());
        assert!(category.into_entity(now()).is_err());
        assert!(chain.into_entity(now()).is_err());
        assert!(terminal.into_entity(now()).is_err());
    }

    #[test]
    fn test_segment_accepts_either_text_field() {
        let newer: SegmentRecord =
            serde_json::from_value(json!({"code": 31, "description": {"content": "Beach"}}))
                .unwrap();
        let older: SegmentRecord =
            serde_json::from_value(json!({"code": "31", "content": "Beach"})).unwrap();
        assert_eq!(
            newer.into_entity(now()).unwrap().description,
            older.into_entity(now()).unwrap().description
        );
    }
}
