//! Lease acquisition with bounded spin-wait.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::error::CacheError;
use crate::store::{LeaseToken, Store};

/// Outcome of a successful acquisition.
pub(crate) struct AcquiredLease {
    pub token: LeaseToken,
    /// Whether acquisition needed at least one retry. A spinning caller
    /// lost a race with another refresher, so the value it set out to
    /// regenerate may already have been replaced; the coordinator re-reads
    /// the store before invoking the producer when this is set.
    pub did_spin: bool,
}

/// Try to acquire the lease for `store_key`, retrying every
/// `retry_interval` until the cumulative wait exceeds `wait_for_lock`.
///
/// Never hangs: after `ceil(wait_for_lock / retry_interval)` failed
/// retries the caller gets [`CacheError::LockContention`] and holds no
/// lease.
pub(crate) async fn acquire<V, S>(
    store: &S,
    store_key: &str,
    lease_ttl: Duration,
    wait_for_lock: Duration,
    retry_interval: Duration,
) -> Result<AcquiredLease, CacheError>
where
    S: Store<V> + ?Sized,
{
    let budget_ms = wait_for_lock.as_millis() as u64;
    let interval_ms = (retry_interval.as_millis() as u64).max(1);
    let max_retries = budget_ms.div_ceil(interval_ms);

    let mut retries: u64 = 0;
    loop {
        if let Some(token) = store.lock(store_key, lease_ttl).await? {
            if retries > 0 {
                trace!(key = store_key, retries, "lease acquired after spinning");
            }
            return Ok(AcquiredLease {
                token,
                did_spin: retries > 0,
            });
        }
        if retries >= max_retries {
            debug!(key = store_key, retries, "lease wait budget exhausted");
            return Err(CacheError::LockContention(store_key.to_string()));
        }
        retries += 1;
        sleep(retry_interval).await;
    }
}
