use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::Hash;

/// Errors raised by block store backends.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("block not found: {0}")]
    NotFound(Hash),

    #[error("corrupt block {key}: {reason}")]
    Corrupt { key: Hash, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T, E = StoreError> = std::result::Result<T, E>;

/// Point-in-time enumeration of every key held by a store.
pub type KeyStream = BoxStream<'static, StoreResult<Hash>>;

/// Content-addressed block storage.
///
/// Blocks are immutable: `put` derives the key from the bytes and writing
/// the same bytes twice is a no-op.
#[async_trait]
pub trait BlockStore: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the bytes stored under `key`, or `StoreError::NotFound`.
    async fn get(&self, key: &Hash) -> StoreResult<Bytes>;

    /// Stores `bytes` and returns their key.
    async fn put(&self, bytes: Bytes) -> StoreResult<Hash>;

    async fn has(&self, key: &Hash) -> StoreResult<bool>;

    /// Removes the block stored under `key`.
    ///
    /// Deleting an absent key reports `StoreError::NotFound`.
    async fn delete(&self, key: &Hash) -> StoreResult<()>;

    /// Enumerates all keys currently in the store. Order is unspecified.
    async fn all_keys(&self) -> StoreResult<KeyStream>;
}

/// A block store that can be garbage collected.
///
/// A GC run holds the exclusive [`GcGuard`] for its whole duration. Writers
/// that add blocks and then pin them hold a shared [`PinGuard`] across both
/// steps so a collection cannot observe the block before its pin exists.
#[async_trait]
pub trait GcBlockstore: BlockStore {
    /// Waits for and takes the exclusive GC lock.
    async fn gc_lock(&self) -> StoreResult<GcGuard>;

    /// Takes a shared lock that keeps GC from starting.
    async fn pin_lock(&self) -> StoreResult<PinGuard>;

    /// Returns `true` if a GC run holds or is waiting for the GC lock.
    fn gc_requested(&self) -> bool;
}

#[async_trait]
impl<T: BlockStore + ?Sized> BlockStore for Arc<T> {
    async fn get(&self, key: &Hash) -> StoreResult<Bytes> {
        (**self).get(key).await
    }

    async fn put(&self, bytes: Bytes) -> StoreResult<Hash> {
        (**self).put(bytes).await
    }

    async fn has(&self, key: &Hash) -> StoreResult<bool> {
        (**self).has(key).await
    }

    async fn delete(&self, key: &Hash) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn all_keys(&self) -> StoreResult<KeyStream> {
        (**self).all_keys().await
    }
}

#[async_trait]
impl<T: GcBlockstore + ?Sized> GcBlockstore for Arc<T> {
    async fn gc_lock(&self) -> StoreResult<GcGuard> {
        (**self).gc_lock().await
    }

    async fn pin_lock(&self) -> StoreResult<PinGuard> {
        (**self).pin_lock().await
    }

    fn gc_requested(&self) -> bool {
        (**self).gc_requested()
    }
}

/// Readers-writer gate shared by store backends to implement
/// [`GcBlockstore`] locking.
#[derive(Debug, Clone, Default)]
pub struct GcLocker {
    lock: Arc<RwLock<()>>,
    waiting: Arc<AtomicUsize>,
}

impl GcLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn gc_lock(&self) -> GcGuard {
        // Counted from the moment we start waiting, so writers can back off.
        let ticket = WaitTicket::enter(self.waiting.clone());
        let guard = self.lock.clone().write_owned().await;
        GcGuard {
            _guard: guard,
            _ticket: ticket,
            extra: None,
        }
    }

    pub async fn pin_lock(&self) -> PinGuard {
        PinGuard {
            _guard: self.lock.clone().read_owned().await,
        }
    }

    pub fn gc_requested(&self) -> bool {
        self.waiting.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug)]
struct WaitTicket(Arc<AtomicUsize>);

impl WaitTicket {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitTicket {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Exclusive GC lock. Released on drop.
#[must_use = "the GC lock is released when the guard is dropped"]
pub struct GcGuard {
    extra: Option<Box<dyn std::any::Any + Send + Sync>>,
    _guard: OwnedRwLockWriteGuard<()>,
    _ticket: WaitTicket,
}

impl GcGuard {
    /// Attaches a backend-specific resource (such as an OS file lock) that
    /// is released together with the guard.
    pub fn hold(mut self, resource: impl Send + Sync + 'static) -> Self {
        self.extra = Some(Box::new(resource));
        self
    }
}

impl std::fmt::Debug for GcGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcGuard").finish()
    }
}

/// Shared lock that keeps GC from starting. Released on drop.
#[must_use = "the pin lock is released when the guard is dropped"]
#[derive(Debug)]
pub struct PinGuard {
    _guard: OwnedRwLockReadGuard<()>,
}
