use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Small key-value store for local metadata such as pin records.
///
/// Keys are logical slash-separated paths (for example
/// `/local/pins/direct/keys`). Values are opaque bytes.
#[async_trait]
pub trait Datastore: std::fmt::Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: Datastore + ?Sized> Datastore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}
