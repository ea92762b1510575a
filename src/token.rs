// Bearer token lifecycle for providers that authenticate with OAuth client credentials.
// One credential is shared by every caller; refreshes are single-flight.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, NormalizedError, Provider, Result};

// A token is never handed out within its last TOKEN_SAFETY_MARGIN_SECS of validity
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

// Source of "now" for expiry decisions
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// Token endpoint response; every field is optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: Some(access_token.into()),
            expires_in: Some(expires_in),
            token_type: Some("Bearer".to_string()),
        }
    }
}

// The network side of a token refresh
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    fn provider(&self) -> Provider;

    async fn fetch_token(&self) -> Result<TokenResponse>;
}

#[derive(Clone)]
pub struct Credential {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    fn from_response(
        provider: Provider,
        response: TokenResponse,
        issued_at: DateTime<Utc>,
        default_lifetime: Duration,
    ) -> Result<Self> {
        let token = match response.access_token {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                return Err(NormalizedError::auth(
                    provider,
                    "Token endpoint returned no access_token",
                ))
            }
        };

        let lifetime = match response.expires_in {
            Some(secs) if secs > 0 => Duration::seconds(secs),
            _ => default_lifetime,
        };
        let usable = lifetime - Duration::seconds(TOKEN_SAFETY_MARGIN_SECS);
        if usable <= Duration::zero() {
            warn!(
                provider = %provider,
                lifetime_secs = lifetime.num_seconds(),
                "token lifetime is within the safety margin, it will be refreshed on next use"
            );
        }

        Ok(Self {
            token,
            issued_at,
            expires_at: issued_at + usable.max(Duration::zero()),
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

// The token value never reaches logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String>>>;

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    in_flight: Option<RefreshFuture>,
}

struct Inner {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    default_lifetime: Duration,
    state: Mutex<TokenState>,
    refreshes: AtomicUsize,
}

/// Owns the shared credential of one provider and hands out its token.
///
/// Cloning is cheap and every clone shares the same credential. A refresh is
/// started by the first caller that finds the credential missing or stale;
/// callers arriving while it runs await the same future and get the same
/// token or the same failure.
#[derive(Clone)]
pub struct TokenLifecycleManager {
    inner: Arc<Inner>,
}

impl TokenLifecycleManager {
    pub fn new(source: Arc<dyn TokenSource>, default_lifetime: Duration) -> Self {
        Self::with_clock(source, default_lifetime, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn TokenSource>,
        default_lifetime: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                clock,
                default_lifetime,
                state: Mutex::new(TokenState::default()),
                refreshes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn provider(&self) -> Provider {
        self.inner.source.provider()
    }

    pub async fn get_token(&self) -> Result<String> {
        let refresh = {
            let mut state = self.inner.state.lock();
            let now = self.inner.clock.now();

            if let Some(credential) = state.credential.as_ref() {
                if credential.is_valid_at(now) {
                    return Ok(credential.token.clone());
                }
            }

            match state.in_flight.as_ref() {
                Some(refresh) => {
                    debug!(provider = %self.provider(), "joining in-flight token refresh");
                    refresh.clone()
                }
                None => {
                    let refresh = Inner::refresh(Arc::clone(&self.inner)).boxed().shared();
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Drops the cached credential so the next `get_token` refreshes.
    pub fn invalidate(&self) {
        let mut state = self.inner.state.lock();
        if state.credential.take().is_some() {
            info!(provider = %self.provider(), "cached token invalidated");
        }
    }

    /// Number of network refreshes started so far.
    pub fn refresh_count(&self) -> usize {
        self.inner.refreshes.load(Ordering::SeqCst)
    }

    pub fn credential_expiry(&self) -> Option<DateTime<Utc>> {
        self.inner
            .state
            .lock()
            .credential
            .as_ref()
            .map(Credential::expires_at)
    }
}

impl Inner {
    async fn refresh(inner: Arc<Inner>) -> Result<String> {
        let outcome = inner.fetch_credential().await;

        let mut state = inner.state.lock();
        state.in_flight = None;
        match outcome {
            Ok(credential) => {
                let token = credential.token.clone();
                info!(
                    provider = %inner.source.provider(),
                    expires_at = %credential.expires_at,
                    "token refreshed"
                );
                state.credential = Some(credential);
                Ok(token)
            }
            Err(err) => {
                warn!(provider = %inner.source.provider(), error = %err, "token refresh failed");
                Err(err)
            }
        }
    }

    async fn fetch_credential(&self) -> Result<Credential> {
        let provider = self.source.provider();
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let issued_at = self.clock.now();

        let response = self.source.fetch_token().await.map_err(|err| {
            if err.kind == ErrorKind::AuthFailure {
                err
            } else {
                err.into_auth_failure()
            }
        })?;

        Credential::from_response(provider, response, issued_at, self.default_lifetime)
    }
}
