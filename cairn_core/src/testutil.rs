//! Test utilities for `GcBlockstore` implementations.
//!
//! This module provides a test suite that can be run against any
//! `GcBlockstore` implementation to verify it honours the trait contract.
//!
//! # Usage
//!
//! In your store crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! cairn_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use cairn_core::testutil::StoreTests;
//!
//! #[tokio::test]
//! async fn test_my_store() {
//!     let store = MyStore::new(...);
//!     StoreTests::new(&store).run_all().await.unwrap();
//! }
//! ```

use crate::Hash;
use crate::store::{GcBlockstore, StoreResult};
use bytes::Bytes;
use futures::StreamExt;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;

/// Test suite for `GcBlockstore` implementations.
pub struct StoreTests<'a, S> {
    store: &'a S,
    /// Mixed into every payload so runs against a shared store never collide.
    salt: u64,
}

impl<'a, S: GcBlockstore> StoreTests<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            salt: rand::rng().random(),
        }
    }

    fn payload(&self, name: &str) -> Bytes {
        Bytes::from(format!("{}:{}", self.salt, name))
    }

    /// Run all tests.
    pub async fn run_all(&self) -> StoreResult<()> {
        self.test_put_get().await?;
        self.test_put_is_idempotent().await?;
        self.test_has().await?;
        self.test_delete().await?;
        self.test_get_missing().await?;
        self.test_all_keys().await?;
        self.test_gc_lock_excludes_pin_lock().await?;
        Ok(())
    }

    /// `put` returns the content hash and `get` returns the same bytes.
    pub async fn test_put_get(&self) -> StoreResult<()> {
        let data = self.payload("put_get");
        let key = self.store.put(data.clone()).await?;
        assert_eq!(key, Hash::new(&data), "key should be the content hash");

        let retrieved = self.store.get(&key).await?;
        assert_eq!(retrieved, data, "retrieved data should match original");
        Ok(())
    }

    pub async fn test_put_is_idempotent(&self) -> StoreResult<()> {
        let data = self.payload("idempotent");
        let first = self.store.put(data.clone()).await?;
        let second = self.store.put(data).await?;
        assert_eq!(first, second);
        Ok(())
    }

    pub async fn test_has(&self) -> StoreResult<()> {
        let data = self.payload("has");
        let missing = Hash::new(self.payload("has_missing"));
        let key = self.store.put(data).await?;
        assert!(self.store.has(&key).await?, "stored block should exist");
        assert!(!self.store.has(&missing).await?, "unknown key should not exist");
        Ok(())
    }

    pub async fn test_delete(&self) -> StoreResult<()> {
        let key = self.store.put(self.payload("delete")).await?;
        self.store.delete(&key).await?;
        assert!(!self.store.has(&key).await?, "block should be gone");

        let err = self
            .store
            .delete(&key)
            .await
            .expect_err("deleting twice should fail");
        assert!(err.is_not_found(), "second delete should report NotFound");
        Ok(())
    }

    pub async fn test_get_missing(&self) -> StoreResult<()> {
        let missing = Hash::new(self.payload("get_missing"));
        let err = self
            .store
            .get(&missing)
            .await
            .expect_err("missing block should fail");
        assert!(err.is_not_found(), "missing block should report NotFound");
        Ok(())
    }

    pub async fn test_all_keys(&self) -> StoreResult<()> {
        let mut expected = HashSet::new();
        for i in 0..5 {
            expected.insert(self.store.put(self.payload(&format!("list_{i}"))).await?);
        }

        let mut listed = HashSet::new();
        let mut keys = self.store.all_keys().await?;
        while let Some(key) = keys.next().await {
            listed.insert(key?);
        }

        for key in &expected {
            assert!(listed.contains(key), "all_keys should list {key}");
        }
        Ok(())
    }

    pub async fn test_gc_lock_excludes_pin_lock(&self) -> StoreResult<()> {
        let guard = self.store.gc_lock().await?;
        assert!(self.store.gc_requested(), "gc should be flagged while locked");

        let blocked = tokio::time::timeout(Duration::from_millis(20), self.store.pin_lock()).await;
        assert!(blocked.is_err(), "pin lock must wait for the GC lock");

        drop(guard);
        let _pin = self.store.pin_lock().await?;
        assert!(!self.store.gc_requested());
        Ok(())
    }
}
