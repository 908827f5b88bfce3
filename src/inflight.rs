//! In-flight deduplication of same-key operations.
//!
//! Process-local table mapping a key to the single outstanding `get` or
//! `refresh` execution for that key. N concurrent callers share one
//! execution and its one outcome, success or failure, instead of issuing
//! N. Orthogonal to the cross-process lease: the table only exists inside
//! one coordinator instance.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CacheError;

type FlightResult<V> = Result<V, CacheError>;
type Flight<V> = Shared<BoxFuture<'static, FlightResult<V>>>;

/// Table of currently-running executions, keyed by unprefixed cache key.
pub(crate) struct FlightTable<V> {
    flights: Arc<Mutex<HashMap<String, Flight<V>>>>,
}

impl<V> FlightTable<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attach to the in-flight execution for `key`, or lead a new one.
    ///
    /// `lead` is only invoked when no execution is in flight. The led
    /// flight removes its own table entry as its final step, before any
    /// waiter observes the outcome, so a caller arriving after settlement
    /// always starts fresh rather than replaying a settled failure.
    pub(crate) async fn join_or_lead<F>(&self, key: &str, lead: F) -> FlightResult<V>
    where
        F: FnOnce() -> BoxFuture<'static, FlightResult<V>>,
    {
        let flight = {
            let mut flights = self.flights.lock().await;
            if let Some(existing) = flights.get(key) {
                debug!(cache_key = key, "joining in-flight execution");
                existing.clone()
            } else {
                let table = Arc::clone(&self.flights);
                let owned_key = key.to_string();
                let work = lead();
                let flight: Flight<V> = async move {
                    let outcome = work.await;
                    table.lock().await.remove(&owned_key);
                    outcome
                }
                .boxed()
                .shared();
                flights.insert(key.to_string(), flight.clone());
                flight
            }
        };
        flight.await
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.flights.lock().await.len()
    }
}
