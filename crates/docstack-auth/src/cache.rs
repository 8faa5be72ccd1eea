//! Bounded cache of derived SigV4 signing keys.
//!
//! Deriving a signing key costs four HMAC rounds and the result only changes
//! when the date, region, service, or credentials change, so keys are cached
//! per client. The cache is a FIFO map: when it grows past its capacity the
//! oldest entry is evicted regardless of how recently it was used.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::credentials::Credentials;
use crate::sigv4::{CredentialScope, derive_signing_key};

/// Number of signing keys kept by [`SigningKeyCache::new`].
pub const DEFAULT_CAPACITY: usize = 25;

/// FIFO-bounded cache of derived signing keys.
///
/// Entries are keyed by a SHA-256 digest of the secret key, access key, and
/// credential scope, so raw secrets are never held as map keys.
///
/// Key derivation runs outside the lock. Two threads missing on the same
/// scope both derive the same key and the second insert is a no-op.
#[derive(Debug)]
pub struct SigningKeyCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    order: VecDeque<String>,
    keys: HashMap<String, Arc<[u8]>>,
}

impl SigningKeyCache {
    /// Create a cache holding up to [`DEFAULT_CAPACITY`] keys.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache holding up to `capacity` keys (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the cached signing key for this scope, deriving and caching it
    /// on a miss.
    pub fn get_or_derive(&self, credentials: &Credentials, scope: &CredentialScope) -> Arc<[u8]> {
        let cache_key = cache_key(credentials, scope);

        if let Some(key) = self.state.lock().keys.get(&cache_key) {
            trace!(scope = %scope, "Signing key cache hit");
            return Arc::clone(key);
        }

        trace!(scope = %scope, "Signing key cache miss");
        let derived: Arc<[u8]> = derive_signing_key(
            &credentials.secret_access_key,
            &scope.date,
            &scope.region,
            &scope.service,
        )
        .into();

        let mut state = self.state.lock();
        if let Some(existing) = state.keys.get(&cache_key) {
            return Arc::clone(existing);
        }
        state.order.push_back(cache_key.clone());
        state.keys.insert(cache_key, Arc::clone(&derived));
        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.keys.remove(&oldest);
                trace!("Evicted oldest signing key");
            }
        }

        derived
    }

    /// Whether a key for these credentials and scope is cached.
    #[must_use]
    pub fn contains(&self, credentials: &Credentials, scope: &CredentialScope) -> bool {
        self.state.lock().keys.contains_key(&cache_key(credentials, scope))
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached keys.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(credentials: &Credentials, scope: &CredentialScope) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credentials.secret_access_key.as_bytes());
    hasher.update(b"\0");
    hasher.update(credentials.access_key_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(scope.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
