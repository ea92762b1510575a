// Provider integration core for the travel search backend

pub mod amadeus;
pub mod config;
pub mod error;
pub mod feed;
pub mod hotelbeds;
pub mod http;
pub mod iata;
pub mod model;
pub mod normalizer;
pub mod retry;
pub mod search;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod token;

// Re-export key types for convenience
pub use config::{ConfigError, ProviderSettings};
pub use error::{ErrorBody, ErrorKind, ErrorSource, NormalizedError, Provider, Result};
pub use normalizer::{ErrorEnvelope, ErrorNormalizer};
pub use retry::{with_backoff, RetryConfig};
pub use search::{HotelDirectory, SearchOrchestrator};
pub use store::{EntityStore, MemoryStore, ReferenceStores};
pub use sync::{ContentCategory, ContentFeed, ContentSyncPipeline, PageRequest, SyncReport};
pub use token::{Clock, SystemClock, TokenLifecycleManager, TokenSource};
