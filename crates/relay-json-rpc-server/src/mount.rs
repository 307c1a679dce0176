//! Context mounts: named factories whose values are injected into every
//! [`CallContext`](crate::CallContext) before the first hook runs.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::MountedValue;
use crate::error::ServiceError;

/// Zero-argument factory producing a mounted value
pub type MountFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<MountedValue, ServiceError>> + Send + Sync>;

/// Context key to factory mapping
#[derive(Clone, Default)]
pub struct MountMap {
    factories: HashMap<String, MountFactory>,
}

impl MountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a value that is cloned into every context
    pub fn value<T>(self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        self.sync(key, move || value.clone())
    }

    /// Mount a synchronous factory
    pub fn sync<T, F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: MountFactory = Arc::new(move || {
            let value: MountedValue = Arc::new(factory());
            futures::future::ready(Ok(value)).boxed()
        });
        self.factories.insert(key.into(), factory);
        self
    }

    /// Mount an asynchronous, fallible factory
    pub fn with_async<T, F, Fut>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
    {
        let factory: MountFactory = Arc::new(move || {
            factory()
                .map(|result| result.map(|value| Arc::new(value) as MountedValue))
                .boxed()
        });
        self.factories.insert(key.into(), factory);
        self
    }

    /// Merge `other` into this map; same-named entries are overwritten
    pub fn merge(&mut self, other: MountMap) {
        self.factories.extend(other.factories);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Run every factory once, in key order. The first failure aborts.
    pub async fn resolve(&self) -> Result<HashMap<String, MountedValue>, ServiceError> {
        let mut resolved = HashMap::with_capacity(self.factories.len());
        for key in self.keys() {
            if let Some(factory) = self.factories.get(&key) {
                let value = factory().await?;
                resolved.insert(key, value);
            }
        }
        Ok(resolved)
    }
}

impl fmt::Debug for MountMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountMap")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sync_and_async_factories() {
        let mounts = MountMap::new()
            .sync("bb", || "??".to_string())
            .with_async("cc", || async { Ok("kk".to_string()) });

        let resolved = mounts.resolve().await.unwrap();
        let bb = resolved["bb"].clone().downcast::<String>().unwrap();
        let cc = resolved["cc"].clone().downcast::<String>().unwrap();
        assert_eq!(bb.as_str(), "??");
        assert_eq!(cc.as_str(), "kk");
    }

    #[tokio::test]
    async fn test_factories_run_on_every_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mounts = MountMap::new().sync("n", move || counter.fetch_add(1, Ordering::SeqCst));

        mounts.resolve().await.unwrap();
        mounts.resolve().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_merge_overwrites() {
        let mut mounts = MountMap::new().value("db", 1u32);
        mounts.merge(MountMap::new().value("db", 2u32).value("cache", 3u32));

        assert_eq!(mounts.keys(), vec!["cache", "db"]);
        let resolved = mounts.resolve().await.unwrap();
        assert_eq!(*resolved["db"].clone().downcast::<u32>().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failing_factory_aborts() {
        let mounts = MountMap::new().with_async("db", || async {
            Err::<u32, _>(ServiceError::internal("connection refused"))
        });
        assert_eq!(mounts.resolve().await.unwrap_err().code(), -32603);
    }
}
