//! The cache coordinator.
//!
//! Decides, for every read, whether to serve cached data, block for fresh
//! data, or serve stale data while refreshing in the background. Concurrent
//! same-key callers within a process collapse onto one execution through
//! the in-flight table; refreshers across processes exclude each other
//! through the store's per-key lease.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::config::CoordinatorConfig;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::inflight::FlightTable;
use crate::lock::{self, AcquiredLease};
use crate::producer::Producer;
use crate::store::{LeaseToken, Store};

/// Sink for errors that occur off a caller's critical path: background
/// refresh failures, deferred store writes, unlock failures, and the
/// stale-fallback case of `return_stale = false`.
pub type ErrorSink = Arc<dyn Fn(CacheError) + Send + Sync>;

/// Stampede-protected read-through cache front.
///
/// Cloning is cheap and all clones share one in-flight table; a single
/// instance is safe to use from any number of concurrent callers.
pub struct CacheCoordinator<V, S, P> {
    inner: Arc<Inner<V, S, P>>,
}

impl<V, S, P> Clone for CacheCoordinator<V, S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<V, S, P> {
    store: S,
    producer: P,
    config: CoordinatorConfig,
    flights: FlightTable<V>,
    on_background_error: ErrorSink,
}

impl<V, S, P> CacheCoordinator<V, S, P>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V> + 'static,
    P: Producer<V> + 'static,
{
    /// Build a coordinator; background errors are logged via `tracing`.
    pub fn new(store: S, producer: P, config: CoordinatorConfig) -> Result<Self, CacheError> {
        let sink: ErrorSink = Arc::new(|err: CacheError| {
            error!(error = %err, "background cache operation failed");
        });
        Self::with_error_sink(store, producer, config, sink)
    }

    /// Build a coordinator with an injectable background-error sink.
    pub fn with_error_sink(
        store: S,
        producer: P,
        config: CoordinatorConfig,
        on_background_error: ErrorSink,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                producer,
                config,
                flights: FlightTable::new(),
                on_background_error,
            }),
        })
    }

    /// Read the value for `key`, producing it if missing and refreshing it
    /// if stale, according to the configured stale-serving policy.
    ///
    /// Concurrent same-key calls within this process share one execution
    /// and one outcome. Fails only when nothing is servable: no cached
    /// value and no way to produce one within the caller's wait budgets.
    pub async fn get(&self, key: &str) -> Result<V, CacheError> {
        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        self.inner
            .flights
            .join_or_lead(key, move || inner.serve(owned_key).boxed())
            .await
    }

    /// Unconditionally regenerate the value for `key` under the lease,
    /// bypassing the freshness check.
    ///
    /// Joins an already in-flight same-key execution if one exists; still
    /// contends on the cross-process lease with other refreshers.
    pub async fn refresh(&self, key: &str) -> Result<V, CacheError> {
        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        self.inner
            .flights
            .join_or_lead(key, move || {
                async move { inner.locked_refresh(&owned_key).await }.boxed()
            })
            .await
    }

    /// Delete the stored entry for `key`. Leaves any lease untouched.
    ///
    /// Returns whether an entry was removed.
    pub async fn clear(&self, key: &str) -> Result<bool, CacheError> {
        let store_key = self.inner.config.store_key(key);
        Ok(self.inner.store.delete(&store_key).await?)
    }
}

impl<V, S, P> Inner<V, S, P>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V> + 'static,
    P: Producer<V> + 'static,
{
    /// The led execution behind `get`: classify the entry and act.
    async fn serve(self: Arc<Self>, key: String) -> Result<V, CacheError> {
        let store_key = self.config.store_key(&key);
        match self.store.get(&store_key).await? {
            None => {
                debug!(cache_key = %key, "cache MISS");
                self.locked_refresh(&key).await
            }
            Some(entry) if !entry.is_stale(Utc::now()) => {
                debug!(cache_key = %key, "cache HIT (fresh)");
                Ok(entry.data)
            }
            Some(entry) => {
                debug!(cache_key = %key, "cache HIT (stale)");
                self.serve_stale(key, entry.data).await
            }
        }
    }

    /// Serving policy for a stale entry.
    async fn serve_stale(self: Arc<Self>, key: String, stale: V) -> Result<V, CacheError> {
        if !self.config.return_stale {
            // Blocking policy: the caller's get is the refresh attempt.
            // A failed refresh is handed to the sink and the stale value
            // in hand is served as a fallback rather than raised.
            return match self.locked_refresh(&key).await {
                Ok(fresh) => Ok(fresh),
                Err(err) => {
                    warn!(cache_key = %key, error = %err, "refresh failed, serving stale fallback");
                    (self.on_background_error)(err);
                    Ok(stale)
                }
            };
        }

        // Background policy: the refresh runs independently of this
        // caller; its failure is visible only through the error sink.
        let refresher = Arc::clone(&self);
        let refresh_key = key.clone();
        let mut handle = tokio::spawn(async move {
            match refresher.locked_refresh(&refresh_key).await {
                Ok(fresh) => Some(fresh),
                Err(err) => {
                    (refresher.on_background_error)(err);
                    None
                }
            }
        });

        let budget = self.config.stale_wait_budget;
        if budget.is_zero() {
            return Ok(stale);
        }

        // Race the stale value against the in-flight refresh. Losing the
        // race does not cancel the refresh; it keeps running and its
        // result still reaches the store.
        match tokio::time::timeout(budget, &mut handle).await {
            Ok(Ok(Some(fresh))) => Ok(fresh),
            Ok(Ok(None)) => Ok(stale),
            Ok(Err(join_err)) => {
                error!(cache_key = %key, error = %join_err, "background refresh task failed");
                Ok(stale)
            }
            Err(_elapsed) => {
                debug!(cache_key = %key, "wait budget elapsed, serving stale");
                Ok(stale)
            }
        }
    }

    /// Lease-guarded producer invocation and write-back. Shared by the
    /// miss path, the stale path, and `refresh`.
    async fn locked_refresh(&self, key: &str) -> Result<V, CacheError> {
        let store_key = self.config.store_key(key);
        let AcquiredLease { token, did_spin } = lock::acquire::<V, S>(
            &self.store,
            &store_key,
            self.config.lease_ttl,
            self.config.wait_for_lock,
            self.config.retry_interval,
        )
        .await?;

        if did_spin {
            // We waited for the lease, so another holder may have already
            // regenerated the value. A present, non-stale entry means the
            // work is done; hand it back without touching the producer.
            match self.store.get(&store_key).await {
                Ok(Some(entry)) if !entry.is_stale(Utc::now()) => {
                    debug!(cache_key = %key, "value refreshed by previous lease holder");
                    self.unlock_isolated(&store_key, &token).await;
                    return Ok(entry.data);
                }
                Ok(_) => {}
                Err(err) => {
                    // Advisory read; a failure here just means we do the
                    // refresh ourselves.
                    warn!(cache_key = %key, error = %err, "post-spin re-read failed");
                }
            }
        }

        let value = match self.producer.produce(key).await {
            Ok(value) => value,
            Err(cause) => {
                self.unlock_isolated(&store_key, &token).await;
                return Err(CacheError::Producer {
                    key: key.to_string(),
                    message: format!("{cause:#}"),
                });
            }
        };

        let entry = CacheEntry::new(value.clone(), self.config.soft_ttl);
        let write = self.store.set(&store_key, entry, self.config.hard_ttl).await;
        // Unlock is always attempted, in a step isolated from the write,
        // so a write-side error cannot strand the lease.
        self.unlock_isolated(&store_key, &token).await;
        write?;

        Ok(value)
    }

    /// Release a lease; failure is reported to the sink, never raised.
    async fn unlock_isolated(&self, store_key: &str, token: &LeaseToken) {
        match self.store.unlock(store_key, token).await {
            Ok(released) => {
                if !released {
                    // Lease expired mid-refresh and possibly moved on.
                    warn!(key = store_key, "lease was no longer ours at release");
                }
            }
            Err(err) => {
                (self.on_background_error)(CacheError::Store(err));
            }
        }
    }
}
