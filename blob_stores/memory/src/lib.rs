use bytes::Bytes;
use cairn_core::{
    Datastore, GcBlockstore, GcGuard, GcLocker, Hash, KeyStream, PinGuard,
    store::{BlockStore, StoreError, StoreResult},
};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};

/// Block store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: DashMap<Hash, Bytes>,
    locker: GcLocker,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<Hash> {
        let mut keys: Vec<Hash> = self.blocks.iter().map(|entry| *entry.key()).collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl BlockStore for MemoryStore {
    async fn get(&self, key: &Hash) -> StoreResult<Bytes> {
        self.blocks
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(*key))
    }

    async fn put(&self, bytes: Bytes) -> StoreResult<Hash> {
        let key = Hash::new(&bytes);
        self.blocks.entry(key).or_insert(bytes);
        Ok(key)
    }

    async fn has(&self, key: &Hash) -> StoreResult<bool> {
        Ok(self.blocks.contains_key(key))
    }

    async fn delete(&self, key: &Hash) -> StoreResult<()> {
        self.blocks.remove(key).ok_or(StoreError::NotFound(*key))?;
        Ok(())
    }

    /// Returns a snapshot of the keys present when called.
    async fn all_keys(&self) -> StoreResult<KeyStream> {
        let keys: Vec<StoreResult<Hash>> =
            self.blocks.iter().map(|entry| Ok(*entry.key())).collect();
        Ok(stream::iter(keys).boxed())
    }
}

#[async_trait::async_trait]
impl GcBlockstore for MemoryStore {
    async fn gc_lock(&self) -> StoreResult<GcGuard> {
        Ok(self.locker.gc_lock().await)
    }

    async fn pin_lock(&self) -> StoreResult<PinGuard> {
        Ok(self.locker.pin_lock().await)
    }

    fn gc_requested(&self) -> bool {
        self.locker.gc_requested()
    }
}

/// `Datastore` that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    records: DashMap<String, Bytes>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::testutil::StoreTests;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        StoreTests::new(&store).run_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_keys_are_sorted() {
        let store = MemoryStore::new();
        let a = store.put(Bytes::from_static(b"a")).await.unwrap();
        let b = store.put(Bytes::from_static(b"b")).await.unwrap();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.keys(), expected);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_datastore() -> anyhow::Result<()> {
        let ds = MemoryDatastore::new();
        assert_eq!(ds.get("/a").await?, None);

        ds.put("/a", Bytes::from_static(b"one")).await?;
        ds.put("/a", Bytes::from_static(b"two")).await?;
        assert_eq!(ds.get("/a").await?, Some(Bytes::from_static(b"two")));

        ds.delete("/a").await?;
        ds.delete("/a").await?;
        assert_eq!(ds.get("/a").await?, None);
        Ok(())
    }
}
