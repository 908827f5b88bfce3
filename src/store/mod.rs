//! The backing-store contract.
//!
//! Any store usable behind the coordinator must implement [`Store`]: a
//! key-value map with per-key lease-based locking. The coordinator never
//! mutates store state without holding the corresponding lease, so a store
//! only has to guarantee the atomicity of `lock` and the token check of
//! `unlock`, not any cross-key ordering.

pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::entry::CacheEntry;
use crate::error::StoreError;

pub use memory::MemoryStore;

/// Proof of lease ownership for one key.
///
/// Issued by [`Store::lock`]; a lease can only be released by presenting
/// the token it was issued with, so a holder whose lease already expired
/// cannot release a lease since reacquired by someone else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseToken(String);

impl LeaseToken {
    /// Generate a fresh 128-bit random token.
    pub fn generate() -> Self {
        LeaseToken(format!("{:032x}", rand::thread_rng().gen::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An abstract key-value store with lease-based locking.
///
/// `get` must never conflate "absent" with a stored falsy value; that is
/// why it returns `Option<CacheEntry<V>>` rather than a bare nullable
/// payload. `set` takes the hard TTL as a write-time parameter and the
/// store owns its enforcement.
#[async_trait]
pub trait Store<V>: Send + Sync {
    /// Read the entry for `key`, or `None` if absent (or hard-expired).
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, StoreError>;

    /// Store `entry` under `key`, to be evicted once `hard_ttl` elapses.
    async fn set(&self, key: &str, entry: CacheEntry<V>, hard_ttl: Duration)
        -> Result<(), StoreError>;

    /// Remove the entry for `key`; returns whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically acquire the lease for `key` if nobody holds it.
    ///
    /// Returns a token on success, `None` if the lease is held. The lease
    /// auto-expires after `lease_ttl` if never released, so a crashed
    /// holder cannot deadlock the key.
    async fn lock(&self, key: &str, lease_ttl: Duration) -> Result<Option<LeaseToken>, StoreError>;

    /// Release the lease for `key` if `token` matches the current holder;
    /// otherwise a no-op. Returns whether a release occurred.
    async fn unlock(&self, key: &str, token: &LeaseToken) -> Result<bool, StoreError>;
}

#[async_trait]
impl<V, S> Store<V> for Arc<S>
where
    V: Send + Sync + 'static,
    S: Store<V> + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, StoreError> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry<V>,
        hard_ttl: Duration,
    ) -> Result<(), StoreError> {
        (**self).set(key, entry, hard_ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }

    async fn lock(&self, key: &str, lease_ttl: Duration) -> Result<Option<LeaseToken>, StoreError> {
        (**self).lock(key, lease_ttl).await
    }

    async fn unlock(&self, key: &str, token: &LeaseToken) -> Result<bool, StoreError> {
        (**self).unlock(key, token).await
    }
}
