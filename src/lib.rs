//! Stampede-protected read-through cache coordinator.
//!
//! Corral sits in front of an expensive, slow, or rate-limited data
//! producer and:
//! - collapses concurrent same-key regeneration within a process into one
//!   execution (in-flight deduplication),
//! - excludes concurrent refreshers across cooperating processes with a
//!   per-key, token-verified lease held in the backing store,
//! - lets callers trade strict freshness against latency once an entry has
//!   gone stale (blocking refresh, or stale-while-revalidate with an
//!   optional wait budget).
//!
//! The backing store is abstract ([`Store`]); an in-memory implementation
//! ([`MemoryStore`]) ships for tests and single-process use. The producer
//! is abstract too ([`Producer`]), with a closure adapter ([`ProducerFn`]).
//!
//! ```ignore
//! use std::time::Duration;
//! use corral::{CacheCoordinator, CoordinatorConfig, MemoryStore, ProducerFn};
//!
//! let store: MemoryStore<String> = MemoryStore::new();
//! let producer = ProducerFn::new(|key: String| async move {
//!     Ok(expensive_lookup(&key).await?)
//! });
//! let cache = CacheCoordinator::new(
//!     store,
//!     producer,
//!     CoordinatorConfig {
//!         soft_ttl: Duration::from_secs(30),
//!         hard_ttl: Duration::from_secs(3600),
//!         return_stale: true,
//!         ..Default::default()
//!     },
//! )?;
//!
//! let value = cache.get("user:42").await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
mod inflight;
mod lock;
pub mod producer;
pub mod store;

pub use config::CoordinatorConfig;
pub use coordinator::{CacheCoordinator, ErrorSink};
pub use entry::CacheEntry;
pub use error::{CacheError, StoreError};
pub use producer::{Producer, ProducerFn};
pub use store::{LeaseToken, MemoryStore, Store};
