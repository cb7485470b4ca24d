//! RedbDatastore - A local `Datastore` implementation backed by redb.

use bytes::Bytes;
use cairn_core::Datastore;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::{path::Path, sync::Arc};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Durable `Datastore` backed by a single redb file (`datastore.redb`).
#[derive(Clone)]
pub struct RedbDatastore {
    db: Arc<Database>,
}

impl RedbDatastore {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = Database::create(path.join("datastore.redb"))?;

        // Create the table up front so the first access may be a read.
        {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(TABLE)?;
            }
            write_txn.commit()?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}

impl std::fmt::Debug for RedbDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDatastore").finish()
    }
}

#[async_trait::async_trait]
impl Datastore for RedbDatastore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let db = self.db.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Bytes>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(TABLE)?;
            let value = table
                .get(key.as_str())?
                .map(|guard| Bytes::copy_from_slice(guard.value()));
            Ok(value)
        })
        .await
        .map_err(|e| anyhow::anyhow!("redb read task failed: {}", e))?
    }

    async fn put(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        let db = self.db.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(TABLE)?;
                table.insert(key.as_str(), value.as_ref())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("redb write task failed: {}", e))?
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let db = self.db.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(TABLE)?;
                table.remove(key.as_str())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("redb delete task failed: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_redb_datastore_roundtrip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ds = RedbDatastore::open(dir.path())?;

        assert_eq!(ds.get("/local/pins/direct/keys").await?, None);
        ds.put("/local/pins/direct/keys", Bytes::from_static(b"abc"))
            .await?;
        assert_eq!(
            ds.get("/local/pins/direct/keys").await?,
            Some(Bytes::from_static(b"abc"))
        );

        ds.delete("/local/pins/direct/keys").await?;
        ds.delete("/local/pins/direct/keys").await?;
        assert_eq!(ds.get("/local/pins/direct/keys").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_redb_datastore_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let ds = RedbDatastore::open(dir.path())?;
            ds.put("/k", Bytes::from_static(b"durable")).await?;
        }
        let ds = RedbDatastore::open(dir.path())?;
        assert_eq!(ds.get("/k").await?, Some(Bytes::from_static(b"durable")));
        Ok(())
    }
}
