//! Token cache and authenticator
//!
//! Obtains a bearer token from the upstream identity endpoint and caches it
//! in memory. The cache is a single record replaced wholesale on each
//! successful exchange; requests racing past an expired token may both
//! authenticate, in which case the last write wins and both tokens are valid.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{CLIENT_ID_VAR, CLIENT_SECRET_VAR, Credentials, UpstreamConfig};
use crate::{Error, Result};

/// Minimum remaining lifetime required to reuse a cached token
pub const SAFETY_MARGIN_MS: u64 = 60_000;

/// Client-side token lifetime assumption; the identity endpoint does not
/// declare one
pub const TOKEN_LIFETIME_MS: u64 = 3_600_000;

/// Milliseconds since the Unix epoch
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// A cached bearer token with its absolute expiry
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// Opaque bearer token
    pub value: String,
    /// Expiry, milliseconds since the Unix epoch
    pub expires_at: u64,
}

impl CachedToken {
    /// The already-expired record the cache starts with
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            value: String::new(),
            expires_at: 0,
        }
    }

    /// Usable only while more than the safety margin remains
    #[must_use]
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        self.expires_at.saturating_sub(now_ms) > SAFETY_MARGIN_MS
    }
}

/// Process-wide token cache.
///
/// Constructed by the caller and handed to [`Authenticator`], so tests get
/// isolated instances. The lock is held only to read or replace the record,
/// never across network I/O.
#[derive(Debug)]
pub struct TokenCache {
    cell: RwLock<CachedToken>,
}

impl TokenCache {
    /// Create an empty (already-expired) cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(CachedToken::empty()),
        }
    }

    /// Return the cached token if it is still fresh
    #[must_use]
    pub fn fresh_token(&self) -> Option<String> {
        let token = self.cell.read();
        token.is_fresh(now_ms()).then(|| token.value.clone())
    }

    /// Replace the cached record wholesale
    pub fn store(&self, value: String, expires_at: u64) {
        *self.cell.write() = CachedToken { value, expires_at };
    }

    /// Snapshot of the current record
    #[must_use]
    pub fn snapshot(&self) -> CachedToken {
        self.cell.read().clone()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity exchange request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

/// Identity exchange response. The token field spelling varies by tenant.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    jwt: Option<String>,
    token: Option<String>,
    access_token: Option<String>,
}

impl AuthResponse {
    fn into_token(self) -> Option<String> {
        self.jwt.or(self.token).or(self.access_token)
    }
}

/// Obtains bearer tokens from the upstream identity endpoint,
/// reading and filling the injected [`TokenCache`]
pub struct Authenticator {
    http: Client,
    authorize_url: String,
    auth_timeout: std::time::Duration,
    credentials: Option<Credentials>,
    cache: Arc<TokenCache>,
}

impl Authenticator {
    /// Create an authenticator over the given cache
    #[must_use]
    pub fn new(
        http: Client,
        upstream: &UpstreamConfig,
        credentials: Option<Credentials>,
        cache: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            authorize_url: upstream.authorize_url(),
            auth_timeout: upstream.auth_timeout,
            credentials,
            cache,
        }
    }

    /// Whether credentials were provided at construction
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Get a valid bearer token, reusing the cache while more than the
    /// safety margin remains.
    ///
    /// No retry, no backoff: a failed exchange surfaces directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when credentials are missing (checked
    /// before any network I/O) and [`Error::Auth`] when the identity
    /// endpoint answers with a non-success status.
    pub async fn get_valid_token(&self) -> Result<String> {
        if let Some(token) = self.cache.fresh_token() {
            return Ok(token);
        }

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "Missing CB Insights credentials. Set {CLIENT_ID_VAR} and {CLIENT_SECRET_VAR}."
            ))
        })?;

        debug!("requesting new authentication token");

        let response = self
            .http
            .post(&self.authorize_url)
            .timeout(self.auth_timeout)
            .json(&AuthRequest {
                client_id: &credentials.client_id,
                client_secret: &credentials.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token = response
            .json::<AuthResponse>()
            .await?
            .into_token()
            .ok_or_else(|| Error::Auth {
                status: status.as_u16(),
                body: "authorize response carried no token field".to_string(),
            })?;

        self.cache.store(token.clone(), now_ms() + TOKEN_LIFETIME_MS);
        info!("authentication successful");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // CachedToken freshness
    // =========================================================================

    #[test]
    fn empty_token_is_stale() {
        assert!(!CachedToken::empty().is_fresh(now_ms()));
    }

    #[test]
    fn freshness_boundary_is_the_safety_margin() {
        let now = 1_000_000_000;
        let token = CachedToken {
            value: "tok".to_string(),
            expires_at: now + SAFETY_MARGIN_MS,
        };
        // Exactly the margin remaining is not enough
        assert!(!token.is_fresh(now));

        let token = CachedToken {
            value: "tok".to_string(),
            expires_at: now + SAFETY_MARGIN_MS + 1,
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn expired_token_does_not_underflow() {
        let token = CachedToken {
            value: "tok".to_string(),
            expires_at: 1_000,
        };
        assert!(!token.is_fresh(2_000));
    }

    // =========================================================================
    // TokenCache
    // =========================================================================

    #[test]
    fn new_cache_has_no_fresh_token() {
        let cache = TokenCache::new();
        assert!(cache.fresh_token().is_none());
        assert_eq!(cache.snapshot().expires_at, 0);
    }

    #[test]
    fn stored_token_is_returned_while_fresh() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), now_ms() + TOKEN_LIFETIME_MS);
        assert_eq!(cache.fresh_token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn token_inside_safety_margin_is_not_returned() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), now_ms() + 30_000);
        assert!(cache.fresh_token().is_none());
    }

    #[test]
    fn store_replaces_the_record_wholesale() {
        let cache = TokenCache::new();
        cache.store("tok-1".to_string(), now_ms() + TOKEN_LIFETIME_MS);
        cache.store("tok-2".to_string(), now_ms() + TOKEN_LIFETIME_MS);
        assert_eq!(cache.fresh_token().as_deref(), Some("tok-2"));
    }

    // =========================================================================
    // AuthResponse field fallback
    // =========================================================================

    #[test]
    fn token_field_fallback_order() {
        let parse = |s: &str| -> Option<String> {
            serde_json::from_str::<AuthResponse>(s).unwrap().into_token()
        };
        assert_eq!(parse(r#"{"token":"a"}"#).as_deref(), Some("a"));
        assert_eq!(parse(r#"{"jwt":"b"}"#).as_deref(), Some("b"));
        assert_eq!(parse(r#"{"access_token":"c"}"#).as_deref(), Some("c"));
        assert_eq!(parse(r#"{"jwt":"b","token":"a"}"#).as_deref(), Some("b"));
        assert_eq!(parse("{}"), None);
    }
}
