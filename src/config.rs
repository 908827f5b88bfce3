use std::time::Duration;

use crate::error::CacheError;

/// Configuration for a [`CacheCoordinator`](crate::CacheCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Duration after which a written entry is considered stale.
    pub soft_ttl: Duration,
    /// Absolute eviction time handed to the store on every write.
    /// Must exceed `soft_ttl`.
    pub hard_ttl: Duration,
    /// How long a refresh lease is held before it auto-expires.
    /// Should exceed the worst-case producer latency.
    pub lease_ttl: Duration,
    /// Maximum total time a caller spends retrying lease acquisition
    /// before giving up.
    pub wait_for_lock: Duration,
    /// Delay between lease acquisition retries. Must be nonzero.
    pub retry_interval: Duration,
    /// Stale-serving policy. When `false`, a `get` on a stale entry blocks
    /// on the refresh; if that refresh fails, the error is handed to the
    /// background error sink and the stale value is returned as a fallback
    /// rather than raised. When `true`, the refresh runs in the background
    /// and the caller races it against `stale_wait_budget`.
    pub return_stale: bool,
    /// Maximum time to let a background refresh race to completion before
    /// falling back to the stale value. Zero means "return stale
    /// immediately". Only consulted when `return_stale` is `true`.
    pub stale_wait_budget: Duration,
    /// Namespace prepended to store keys. Never visible to the producer.
    pub key_prefix: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            soft_ttl: Duration::from_secs(60),
            hard_ttl: Duration::from_secs(600),
            lease_ttl: Duration::from_secs(10),
            wait_for_lock: Duration::from_secs(5),
            retry_interval: Duration::from_millis(50),
            return_stale: false,
            stale_wait_budget: Duration::ZERO,
            key_prefix: None,
        }
    }
}

impl CoordinatorConfig {
    /// Check internal consistency. Called by the coordinator constructor.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.hard_ttl <= self.soft_ttl {
            return Err(CacheError::Config(format!(
                "hard_ttl ({:?}) must exceed soft_ttl ({:?})",
                self.hard_ttl, self.soft_ttl
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(CacheError::Config(
                "retry_interval must be nonzero".to_string(),
            ));
        }
        if self.lease_ttl.is_zero() {
            return Err(CacheError::Config("lease_ttl must be nonzero".to_string()));
        }
        Ok(())
    }

    /// The store-facing key for `key`, with the configured prefix applied.
    pub(crate) fn store_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_hard_ttl_must_exceed_soft_ttl() {
        let config = CoordinatorConfig {
            soft_ttl: Duration::from_secs(60),
            hard_ttl: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_zero_retry_interval_rejected() {
        let config = CoordinatorConfig {
            retry_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_store_key_prefixing() {
        let mut config = CoordinatorConfig::default();
        assert_eq!(config.store_key("user:1"), "user:1");

        config.key_prefix = Some("app:".to_string());
        assert_eq!(config.store_key("user:1"), "app:user:1");
    }
}
