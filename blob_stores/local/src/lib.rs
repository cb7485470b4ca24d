use anyhow::{Context, anyhow};
use bytes::Bytes;
use cairn_core::{
    GcBlockstore, GcGuard, GcLocker, Hash, KeyStream, PinGuard,
    store::{BlockStore, StoreError, StoreResult},
};
use fs4::fs_std::FileExt;
use futures::StreamExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use walkdir::WalkDir;

const BLOCKS_DIR: &str = "blocks";
const GC_LOCK_FILE: &str = "gc.lock";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalStoreConfig {
    pub base_path: String,
}

/// Block store that keeps one file per block under
/// `<base>/blocks/<first two hex chars>/<hex key>`.
///
/// The GC lock is held both in-process and as an exclusive OS lock on
/// `<base>/gc.lock`, so two processes sharing a directory never collect at
/// the same time.
#[derive(Debug)]
pub struct LocalStore {
    base_path: PathBuf,
    locker: GcLocker,
    tmp_counter: AtomicU64,
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStore {
            base_path: base_path.into(),
            locker: GcLocker::new(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn create(config: LocalStoreConfig) -> Self {
        Self::new(config.base_path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blocks_root(&self) -> PathBuf {
        self.base_path.join(BLOCKS_DIR)
    }

    fn block_path(&self, key: &Hash) -> PathBuf {
        let hex = key.to_hex();
        self.blocks_root().join(&hex[..2]).join(hex)
    }

    fn not_found_as(key: &Hash, err: std::io::Error) -> StoreError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(*key)
        } else {
            StoreError::Io(err)
        }
    }
}

/// Parses a block file name back into its key. Foreign files (temp files,
/// editor leftovers) yield `None`.
fn key_from_file_name(name: &str) -> Option<Hash> {
    name.parse().ok()
}

#[async_trait::async_trait]
impl BlockStore for LocalStore {
    async fn get(&self, key: &Hash) -> StoreResult<Bytes> {
        let bytes = tokio::fs::read(self.block_path(key))
            .await
            .map_err(|e| Self::not_found_as(key, e))?;
        Ok(Bytes::from(bytes))
    }

    /// Writes to a temp file first and renames it into place, so readers
    /// never see a partially written block.
    async fn put(&self, bytes: Bytes) -> StoreResult<Hash> {
        let key = Hash::new(&bytes);
        let path = self.block_path(&key);
        if tokio::fs::try_exists(&path).await? {
            return Ok(key);
        }
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("block path has no parent: {}", path.display()))?;
        tokio::fs::create_dir_all(parent).await?;

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{}.{n}.tmp", std::process::id()));
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(key)
    }

    async fn has(&self, key: &Hash) -> StoreResult<bool> {
        tokio::fs::try_exists(self.block_path(key))
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, key: &Hash) -> StoreResult<()> {
        tokio::fs::remove_file(self.block_path(key))
            .await
            .map_err(|e| Self::not_found_as(key, e))
    }

    async fn all_keys(&self) -> StoreResult<KeyStream> {
        let root = self.blocks_root();
        if !tokio::fs::try_exists(&root).await? {
            return Ok(futures::stream::empty().boxed());
        }
        let walker = WalkDir::new(root).min_depth(2).max_depth(2).into_iter();
        let stream = futures::stream::iter(walker).filter_map(|entry| {
            futures::future::ready(match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        entry.file_name().to_str().and_then(key_from_file_name).map(Ok)
                    } else {
                        None
                    }
                }
                Err(e) => Some(Err(StoreError::Other(e.into()))),
            })
        });
        Ok(stream.boxed())
    }
}

#[async_trait::async_trait]
impl GcBlockstore for LocalStore {
    async fn gc_lock(&self) -> StoreResult<GcGuard> {
        let guard = self.locker.gc_lock().await;

        tokio::fs::create_dir_all(&self.base_path).await?;
        let lock_path = self.base_path.join(GC_LOCK_FILE);
        let file = tokio::task::spawn_blocking(move || -> anyhow::Result<std::fs::File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .with_context(|| format!("failed to open {}", lock_path.display()))?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| anyhow!("gc lock task failed: {e}"))??;

        tracing::debug!("local store: gc lock acquired");
        // Closing the file releases the OS lock.
        Ok(guard.hold(file))
    }

    async fn pin_lock(&self) -> StoreResult<PinGuard> {
        Ok(self.locker.pin_lock().await)
    }

    fn gc_requested(&self) -> bool {
        self.locker.gc_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::testutil::StoreTests;

    #[tokio::test]
    async fn test_local_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        StoreTests::new(&store).run_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_layout_is_sharded_by_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let key = store.put(Bytes::from_static(b"layout")).await.unwrap();
        let hex = key.to_hex();
        let expected = temp_dir.path().join("blocks").join(&hex[..2]).join(&hex);
        assert!(expected.is_file());
    }

    #[tokio::test]
    async fn test_all_keys_skips_foreign_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let key = store.put(Bytes::from_static(b"real")).await.unwrap();
        let shard = temp_dir.path().join("blocks").join("zz");
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join("notes.txt"), b"ignore me").unwrap();

        let keys: Vec<Hash> = store
            .all_keys()
            .await
            .unwrap()
            .map(|k| k.unwrap())
            .collect()
            .await;
        assert_eq!(keys, vec![key]);
    }

    #[tokio::test]
    async fn test_all_keys_on_fresh_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path().join("never_written"));
        let keys: Vec<_> = store.all_keys().await.unwrap().collect().await;
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_gc_lock_creates_lock_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let guard = store.gc_lock().await.unwrap();
        assert!(temp_dir.path().join(GC_LOCK_FILE).is_file());
        drop(guard);
        // Re-acquiring after release must not block.
        let _again = store.gc_lock().await.unwrap();
    }
}
