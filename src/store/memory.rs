//! In-memory store backend.
//!
//! Reference implementation of the [`Store`] contract, used in tests and
//! for single-process deployments. Hard-TTL eviction is lazy: an expired
//! entry is dropped the next time it is read or deleted, mirroring how a
//! networked store's expiry looks from the outside.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::store::{LeaseToken, Store};

#[derive(Debug, Clone)]
struct StoredEntry<V> {
    entry: CacheEntry<V>,
    hard_expires_at: Instant,
}

#[derive(Debug, Clone)]
struct Lease {
    token: LeaseToken,
    expires_at: Instant,
}

/// A process-local [`Store`] backed by concurrent hash maps.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: DashMap<String, StoredEntry<V>>,
    leases: DashMap<String, Lease>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            leases: DashMap::new(),
        }
    }

    /// Number of live (possibly hard-expired) entries. Test helper.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<V> Store<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<V>>, StoreError> {
        match self.entries.get(key) {
            Some(stored) if stored.hard_expires_at <= Instant::now() => {}
            Some(stored) => return Ok(Some(stored.entry.clone())),
            None => return Ok(None),
        }
        // Hard-expired. The shard guard is dropped with the match;
        // `remove_if` re-checks so a concurrent overwrite survives.
        self.entries
            .remove_if(key, |_, stored| stored.hard_expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry<V>,
        hard_ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                entry,
                hard_expires_at: Instant::now() + hard_ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self.entries.remove(key) {
            Some((_, stored)) => Ok(stored.hard_expires_at > Instant::now()),
            None => Ok(false),
        }
    }

    async fn lock(&self, key: &str, lease_ttl: Duration) -> Result<Option<LeaseToken>, StoreError> {
        let now = Instant::now();
        match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().expires_at > now {
                    return Ok(None);
                }
                // Expired lease from a crashed or slow holder: reacquire.
                let token = LeaseToken::generate();
                trace!(key, "reacquiring expired lease");
                slot.insert(Lease {
                    token: token.clone(),
                    expires_at: now + lease_ttl,
                });
                Ok(Some(token))
            }
            Entry::Vacant(slot) => {
                let token = LeaseToken::generate();
                slot.insert(Lease {
                    token: token.clone(),
                    expires_at: now + lease_ttl,
                });
                Ok(Some(token))
            }
        }
    }

    async fn unlock(&self, key: &str, token: &LeaseToken) -> Result<bool, StoreError> {
        let removed = self
            .leases
            .remove_if(key, |_, lease| lease.token == *token)
            .is_some();
        Ok(removed)
    }
}
