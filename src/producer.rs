use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// The external data producer behind the cache.
///
/// Invoked with the *unprefixed* key on a miss or refresh. The coordinator
/// guarantees at most one concurrent invocation per key within a process
/// (via in-flight deduplication) and at most one write-holding invocation
/// per key across processes (via the lease), but a producer may still be
/// called once per refresh cycle per process.
#[async_trait]
pub trait Producer<V>: Send + Sync {
    async fn produce(&self, key: &str) -> anyhow::Result<V>;
}

#[async_trait]
impl<V, P> Producer<V> for Arc<P>
where
    V: Send + 'static,
    P: Producer<V> + ?Sized,
{
    async fn produce(&self, key: &str) -> anyhow::Result<V> {
        (**self).produce(key).await
    }
}

/// Adapter turning an async closure into a [`Producer`].
///
/// ```ignore
/// let producer = ProducerFn::new(|key: String| async move {
///     Ok(fetch_from_upstream(&key).await?)
/// });
/// ```
pub struct ProducerFn<F>(F);

impl<F> ProducerFn<F> {
    pub fn new(f: F) -> Self {
        ProducerFn(f)
    }
}

#[async_trait]
impl<V, F, Fut> Producer<V> for ProducerFn<F>
where
    V: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<V>> + Send,
{
    async fn produce(&self, key: &str) -> anyhow::Result<V> {
        (self.0)(key.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_adapter() {
        let producer = ProducerFn::new(|key: String| async move { Ok(format!("value:{key}")) });
        let value: String = producer.produce("k").await.unwrap();
        assert_eq!(value, "value:k");
    }
}
