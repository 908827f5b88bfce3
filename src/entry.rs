use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the store persists per key.
///
/// The hard TTL is a write-time parameter of [`Store::set`](crate::Store),
/// enforced by the store itself; only the soft expiry is read back by the
/// coordinator. `data` is stored faithfully: `null`, `false`, `0`, `""` and
/// `None` are all legitimate cached values, distinct from "no entry".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached value.
    pub data: V,
    /// Absolute timestamp after which the entry is stale but still usable.
    pub soft_expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Build an entry that becomes stale `soft_ttl` from now.
    pub fn new(data: V, soft_ttl: Duration) -> Self {
        let soft_ttl = chrono::Duration::from_std(soft_ttl).unwrap_or(chrono::Duration::MAX);
        let soft_expires_at = Utc::now()
            .checked_add_signed(soft_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            data,
            soft_expires_at,
        }
    }

    /// Whether the entry is stale as of `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.soft_expires_at
    }
}
