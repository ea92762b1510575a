// Bulk content sync: one page of one category per call.
// Paging across the remote range is the caller's loop; see `page_windows`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ErrorSource, NormalizedError, Result};
use crate::feed::{
    decode_record, raw_key, AccommodationRecord, BoardRecord, CategoryRecord, ChainRecord,
    ContentPage, CountryRecord, DestinationRecord, FacilityGroupRecord, FacilityRecord,
    HotelRecord, SegmentRecord, StateRecord, TerminalRecord, ZoneRecord,
};
use crate::model::{State, Zone};
use crate::store::{Entity, EntityStore, ReferenceStores};
use crate::token::{Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Hotels,
    Countries,
    Destinations,
    Accommodations,
    Boards,
    Categories,
    Chains,
    FacilityGroups,
    Facilities,
    Segments,
    Terminals,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 11] = [
        ContentCategory::Countries,
        ContentCategory::Destinations,
        ContentCategory::Accommodations,
        ContentCategory::Boards,
        ContentCategory::Categories,
        ContentCategory::Chains,
        ContentCategory::FacilityGroups,
        ContentCategory::Facilities,
        ContentCategory::Segments,
        ContentCategory::Terminals,
        ContentCategory::Hotels,
    ];

    // Path under the content API root
    pub fn path(&self) -> &'static str {
        match self {
            ContentCategory::Hotels => "hotels",
            ContentCategory::Countries => "locations/countries",
            ContentCategory::Destinations => "locations/destinations",
            ContentCategory::Accommodations => "types/accommodations",
            ContentCategory::Boards => "types/boards",
            ContentCategory::Categories => "types/categories",
            ContentCategory::Chains => "types/chains",
            ContentCategory::FacilityGroups => "types/facilitygroups",
            ContentCategory::Facilities => "types/facilities",
            ContentCategory::Segments => "types/segments",
            ContentCategory::Terminals => "types/terminals",
        }
    }

    // Key of the record array in the page body
    pub fn records_key(&self) -> &'static str {
        match self {
            ContentCategory::Hotels => "hotels",
            ContentCategory::Countries => "countries",
            ContentCategory::Destinations => "destinations",
            ContentCategory::Accommodations => "accommodations",
            ContentCategory::Boards => "boards",
            ContentCategory::Categories => "categories",
            ContentCategory::Chains => "chains",
            ContentCategory::FacilityGroups => "facilityGroups",
            ContentCategory::Facilities => "facilities",
            ContentCategory::Segments => "segments",
            ContentCategory::Terminals => "terminals",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Hotels => "hotels",
            ContentCategory::Countries => "countries",
            ContentCategory::Destinations => "destinations",
            ContentCategory::Accommodations => "accommodations",
            ContentCategory::Boards => "boards",
            ContentCategory::Categories => "categories",
            ContentCategory::Chains => "chains",
            ContentCategory::FacilityGroups => "facility_groups",
            ContentCategory::Facilities => "facilities",
            ContentCategory::Segments => "segments",
            ContentCategory::Terminals => "terminals",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = NormalizedError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ContentCategory::ALL
            .iter()
            .copied()
            .find(|c| {
                c.as_str() == normalized || c.records_key().to_ascii_lowercase() == normalized
            })
            .ok_or_else(|| {
                NormalizedError::invalid_request(format!("Unknown content category: {}", s))
            })
    }
}

/// A 1-based inclusive record window plus the feed's freshness parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub from: u32,
    pub to: u32,
    pub language: String,
    // Only records changed since this provider timestamp
    pub since: Option<String>,
    // Destinations can be narrowed to some countries
    pub country_codes: Option<Vec<String>>,
}

impl PageRequest {
    pub fn new(from: u32, to: u32, language: impl Into<String>) -> Self {
        Self {
            from,
            to,
            language: language.into(),
            since: None,
            country_codes: None,
        }
    }

    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn with_country_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country_codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.from < 1 {
            return Err(NormalizedError::invalid_request(
                "Page window is 1-based: 'from' must be at least 1",
            ));
        }
        if self.to < self.from {
            return Err(NormalizedError::invalid_request(format!(
                "Page window is empty: from {} > to {}",
                self.from, self.to
            )));
        }
        if self.language.trim().is_empty() {
            return Err(NormalizedError::invalid_request("Language must not be empty"));
        }
        Ok(())
    }

    pub fn window_size(&self) -> usize {
        (self.to.saturating_sub(self.from) as usize) + 1
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("fields", "all".to_string()),
            ("from", self.from.to_string()),
            ("to", self.to.to_string()),
            ("language", self.language.clone()),
            ("useSecondaryLanguage", "false".to_string()),
        ];
        if let Some(since) = &self.since {
            query.push(("lastUpdateTime", since.clone()));
        }
        if let Some(codes) = &self.country_codes {
            if !codes.is_empty() {
                query.push(("countryCodes", codes.join(",")));
            }
        }
        query
    }
}

/// Splits `from..=to` into consecutive windows of at most `size` records.
pub fn page_windows(from: u32, to: u32, size: u32) -> Vec<(u32, u32)> {
    let size = size.max(1);
    let mut windows = Vec::new();
    if from == 0 || to < from {
        return windows;
    }
    let mut start = from;
    loop {
        let end = start.saturating_add(size - 1).min(to);
        windows.push((start, end));
        if end >= to {
            break;
        }
        start = end + 1;
    }
    windows
}

// The bulk content feed of the signature provider
#[async_trait]
pub trait ContentFeed: Send + Sync {
    /// Fetches one raw page. Transport and provider failures come back normalized.
    async fn fetch_page(&self, category: ContentCategory, request: &PageRequest) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    // Position of the record in the page
    pub index: usize,
    pub key: Option<String>,
    pub error: NormalizedError,
}

/// Outcome of one page: what was written and what was skipped, record by record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub category: ContentCategory,
    pub from: u32,
    pub to: u32,
    pub received: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<RecordFailure>,
    // Size of the whole remote range, when the feed reports it
    pub total: Option<u64>,
}

impl SyncReport {
    fn new(category: ContentCategory, request: &PageRequest, page: &ContentPage) -> Self {
        Self {
            category,
            from: request.from,
            to: request.to,
            received: page.records.len(),
            inserted: 0,
            updated: 0,
            failures: Vec::new(),
            total: page.total,
        }
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    /// Records successfully upserted.
    pub fn records_processed(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_last_page(&self) -> bool {
        match self.total {
            Some(total) => u64::from(self.to) >= total,
            None => self.received < (self.to.saturating_sub(self.from) as usize) + 1,
        }
    }
}

// Find by key first so the outcome is known and surrogate ids carry over
async fn upsert<E: Entity>(store: &dyn EntityStore<E>, mut entity: E) -> Result<UpsertOutcome> {
    let existing = store.find(&entity.key()).await?;
    let outcome = match existing {
        Some(row) => {
            if let Some(id) = row.id() {
                entity.assign_id(id);
            }
            UpsertOutcome::Updated
        }
        None => UpsertOutcome::Inserted,
    };
    store.upsert(entity).await?;
    Ok(outcome)
}

pub struct ContentSyncPipeline {
    feed: Arc<dyn ContentFeed>,
    stores: ReferenceStores,
    clock: Arc<dyn Clock>,
}

impl ContentSyncPipeline {
    pub fn new(feed: Arc<dyn ContentFeed>, stores: ReferenceStores) -> Self {
        Self::with_clock(feed, stores, Arc::new(SystemClock))
    }

    pub fn with_clock(
        feed: Arc<dyn ContentFeed>,
        stores: ReferenceStores,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            feed,
            stores,
            clock,
        }
    }

    pub fn stores(&self) -> &ReferenceStores {
        &self.stores
    }

    /// Syncs the records `from..=to` of one category.
    pub async fn sync_category(
        &self,
        category: ContentCategory,
        from: u32,
        to: u32,
        language: &str,
        since: Option<&str>,
    ) -> Result<SyncReport> {
        let mut request = PageRequest::new(from, to, language);
        request.since = since.map(str::to_string);
        self.sync_page(category, &request).await
    }

    /// Fetches one page and upserts every record independently.
    ///
    /// The fetch failing, or the page not being a page at all, fails the call. A record
    /// that cannot be mapped or stored is reported in `SyncReport::failures` and the rest
    /// of the page still goes through.
    pub async fn sync_page(
        &self,
        category: ContentCategory,
        request: &PageRequest,
    ) -> Result<SyncReport> {
        request.validate()?;
        info!(
            category = %category,
            from = request.from,
            to = request.to,
            language = %request.language,
            since = ?request.since,
            "syncing content page"
        );

        let body = self.feed.fetch_page(category, request).await.map_err(|err| {
            warn!(
                category = %category,
                from = request.from,
                to = request.to,
                error = %err,
                "content page fetch failed"
            );
            err
        })?;
        let page = ContentPage::extract(category, body)?;
        let synced_at = self.clock.now();

        let mut report = SyncReport::new(category, request, &page);
        for (index, raw) in page.records.into_iter().enumerate() {
            let key = raw_key(&raw);
            match self.process_record(category, raw, synced_at).await {
                Ok(outcome) => report.record(outcome),
                Err(error) => {
                    warn!(
                        category = %category,
                        index,
                        code = ?key,
                        kind = ?error.kind,
                        error = %error.message,
                        "skipping content record"
                    );
                    report.failures.push(RecordFailure { index, key, error });
                }
            }
        }

        info!(
            category = %category,
            from = report.from,
            to = report.to,
            received = report.received,
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed(),
            total = ?report.total,
            "content page synced"
        );
        Ok(report)
    }

    /// Runs one page of several categories concurrently.
    pub async fn sync_categories(
        &self,
        categories: &[ContentCategory],
        request: &PageRequest,
    ) -> Vec<(ContentCategory, Result<SyncReport>)> {
        let runs = categories.iter().map(|&category| async move {
            (category, self.sync_page(category, request).await)
        });
        join_all(runs).await
    }

    async fn process_record(
        &self,
        category: ContentCategory,
        raw: Value,
        synced_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let stores = &self.stores;
        match category {
            ContentCategory::Hotels => {
                self.sync_hotel(decode_record(category, raw)?, synced_at).await
            }
            ContentCategory::Countries => {
                self.sync_country(decode_record(category, raw)?, synced_at).await
            }
            ContentCategory::Destinations => {
                self.sync_destination(decode_record(category, raw)?, synced_at).await
            }
            ContentCategory::Accommodations => {
                let record: AccommodationRecord = decode_record(category, raw)?;
                upsert(stores.accommodations.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Boards => {
                let record: BoardRecord = decode_record(category, raw)?;
                upsert(stores.boards.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Categories => {
                let record: CategoryRecord = decode_record(category, raw)?;
                upsert(stores.categories.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Chains => {
                let record: ChainRecord = decode_record(category, raw)?;
                upsert(stores.chains.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::FacilityGroups => {
                let record: FacilityGroupRecord = decode_record(category, raw)?;
                upsert(stores.facility_groups.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Facilities => {
                let record: FacilityRecord = decode_record(category, raw)?;
                upsert(stores.facilities.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Segments => {
                let record: SegmentRecord = decode_record(category, raw)?;
                upsert(stores.segments.as_ref(), record.into_entity(synced_at)?).await
            }
            ContentCategory::Terminals => {
                let record: TerminalRecord = decode_record(category, raw)?;
                upsert(stores.terminals.as_ref(), record.into_entity(synced_at)?).await
            }
        }
    }

    // Only the country is resolved; a missing one leaves the reference unset
    async fn resolve_country(&self, code: Option<String>, owner: &str) -> Result<Option<String>> {
        let code = match code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
            Some(code) => code,
            None => return Ok(None),
        };
        match self.stores.countries.find(&code).await? {
            Some(country) => Ok(Some(country.code)),
            None => {
                debug!(owner, country = %code, "country not mirrored yet, reference left unset");
                Ok(None)
            }
        }
    }

    async fn sync_hotel(
        &self,
        record: HotelRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let mut hotel = record.into_hotel(synced_at)?;
        hotel.country_code = self
            .resolve_country(hotel.country_code.take(), &hotel.code)
            .await?;
        upsert(self.stores.hotels.as_ref(), hotel).await
    }

    async fn sync_country(
        &self,
        record: CountryRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let country = record.into_country(synced_at)?;
        let code = country.code.clone();
        let states = match &country.raw_states {
            Some(Value::Array(states)) => states.clone(),
            _ => Vec::new(),
        };

        let outcome = upsert(self.stores.countries.as_ref(), country).await?;

        for raw in states {
            if let Err(err) = self.sync_state(&code, raw, synced_at).await {
                warn!(country = %code, error = %err.message, "skipping state");
            }
        }
        Ok(outcome)
    }

    async fn sync_state(
        &self,
        country_code: &str,
        raw: Value,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let record: StateRecord = decode_record(ContentCategory::Countries, raw)?;
        let code = record.code();
        if code.is_empty() {
            return Err(NormalizedError::mapping(
                ErrorSource::Hotelbeds,
                "state code is empty",
            ));
        }
        let state = State {
            id: None,
            country_code: country_code.to_string(),
            name: record.name(),
            code,
            synced_at,
        };
        upsert(self.stores.states.as_ref(), state).await?;
        Ok(())
    }

    async fn sync_destination(
        &self,
        record: DestinationRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let (mut destination, zones) = record.into_destination(synced_at)?;
        destination.country_code = self
            .resolve_country(destination.country_code.take(), &destination.code)
            .await?;
        let code = destination.code.clone();

        let outcome = upsert(self.stores.destinations.as_ref(), destination).await?;

        for raw in zones {
            if let Err(err) = self.sync_zone(&code, raw, synced_at).await {
                warn!(destination = %code, error = %err.message, "skipping zone");
            }
        }
        Ok(outcome)
    }

    async fn sync_zone(
        &self,
        destination_code: &str,
        raw: Value,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let record: ZoneRecord = decode_record(ContentCategory::Destinations, raw)?;
        let zone_code = record.zone_code()?;
        let zone = Zone {
            id: None,
            zone_code,
            destination_code: destination_code.to_string(),
            name: record.name(zone_code),
            synced_at,
        };
        upsert(self.stores.zones.as_ref(), zone).await?;
        Ok(())
    }
}
