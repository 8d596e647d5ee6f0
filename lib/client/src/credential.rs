//! The in-memory access credential store.
//!
//! Only the short-lived access credential lives here. The refresh
//! credential is an HTTP-only cookie held by the HTTP backend's cookie jar;
//! application code never sees it. Neither type implements `Serialize`, so
//! the access credential cannot be written to durable storage by accident.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

/// A bearer access credential and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl Credential {
    /// Creates a credential with an explicit expiry.
    #[must_use]
    pub fn new(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at,
        }
    }

    /// Creates a credential, reading the expiry from the token's `exp` claim.
    ///
    /// The claim is read without signature verification; it only schedules
    /// the client's own refresh. Opaque tokens fall back to `now + fallback_ttl`.
    #[must_use]
    pub fn from_access_token(access_token: String, fallback_ttl: Duration) -> Self {
        let expires_at = token_expiry(&access_token).unwrap_or_else(|| Utc::now() + fallback_ttl);
        Self::new(access_token, expires_at)
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns when the credential expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the credential expires within `skew` from now.
    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        Utc::now() + skew >= self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Reads the `exp` claim of a JWT-shaped token.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return None,
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp?, 0)
}

/// Process-wide holder of the current access credential.
///
/// Reading before any `set` returns `None`, meaning "no credential yet";
/// whether the user is anonymous is decided by the session, not here.
///
/// Every `set` and `clear` advances a generation counter, so a writer that
/// started work against one generation can tell whether the store changed
/// underneath it.
#[derive(Default)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

#[derive(Default)]
struct Slot {
    credential: Option<Credential>,
    generation: u64,
}

impl Slot {
    fn replace(&mut self, credential: Option<Credential>) {
        self.credential = credential;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current credential.
    #[must_use]
    pub fn get(&self) -> Option<Credential> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .credential
            .clone()
    }

    /// Returns the current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Replaces the current credential.
    pub fn set(&self, credential: Credential) {
        self.write().replace(Some(credential));
    }

    /// Removes the current credential.
    pub fn clear(&self) {
        self.write().replace(None);
    }

    /// Stores `credential` only if the store is still at `generation`.
    ///
    /// Returns false, leaving the store untouched, if a `set` or `clear`
    /// happened since `generation` was read.
    pub fn set_if_generation(&self, credential: Credential, generation: u64) -> bool {
        let mut slot = self.write();
        if slot.generation != generation {
            return false;
        }
        slot.replace(Some(credential));
        true
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("credential", &self.get())
            .finish()
    }
}
