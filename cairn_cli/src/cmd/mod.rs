use std::{path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use cairn_core::{BlockDag, GcBlockstore};
use cairn_datastore_redb::RedbDatastore;
use cairn_pin::Pinner;
use cairn_store_local::LocalStore;
use cairn_store_memory::MemoryStore;

use crate::config::{CairnConfig, StoreConfig};

pub mod block;
pub mod config;
pub mod gc;
pub mod pin;

pub type Store = Arc<dyn GcBlockstore>;
pub type Dag = BlockDag<Store>;
pub type CliPinner = Pinner<Dag, RedbDatastore>;

pub fn open_store(config: &StoreConfig) -> Store {
    match config {
        StoreConfig::Local(local) => Arc::new(LocalStore::create(local.clone())),
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Opens the pin state, starting empty if none was flushed yet.
pub async fn open_pinner(config: &CairnConfig, dag: Dag) -> Result<CliPinner> {
    let datastore = RedbDatastore::open(config.pins_path())
        .with_context(|| format!("failed to open pin datastore at {}", config.pins.path))?;
    Pinner::open(dag, datastore)
        .await
        .context("failed to load pins")
}

pub async fn run_command(
    config_file: PathBuf,
    data_dir: &Path,
    cmd: crate::Commands,
) -> Result<()> {
    if let crate::Commands::Config { cmd } = cmd {
        return cmd.run(&config_file, data_dir);
    }

    let config = CairnConfig::load(&config_file, data_dir)?;
    let store = open_store(&config.store);
    let dag = BlockDag::new(store.clone());

    match cmd {
        crate::Commands::Block { cmd } => block::run_block(cmd, &dag).await,
        crate::Commands::Pin { cmd } => pin::run_pin(cmd, &config, &store, dag).await,
        crate::Commands::Gc { best_effort, quiet } => {
            gc::run_gc(&config, store, dag, best_effort, quiet).await
        }
        crate::Commands::Config { .. } => Ok(()),
    }
}
