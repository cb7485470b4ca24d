use std::{fs, io::Write, path::Path};

use anyhow::Context;
use clap::Subcommand;
use toml_edit::{DocumentMut, Item, Table, value};
use tracing::info;

#[derive(Subcommand)]
pub enum CmdConfig {
    /// Creates the config file if it doesn't exist and fills in missing
    /// sections with defaults
    Init,
}

impl CmdConfig {
    pub fn run(self, config_file: &Path, data_dir: &Path) -> anyhow::Result<()> {
        let mut doc = if config_file.exists() {
            fs::read_to_string(config_file)?
        } else {
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent)?;
            }
            String::new()
        }
        .parse::<DocumentMut>()
        .context("could not parse config file")?;

        match self {
            Self::Init => init_defaults(&mut doc, data_dir),
        }

        info!("writing to config file {config_file:?}");

        let tmp_path = config_file.with_extension("tmp");
        let mut tmp = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(doc.to_string().as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, config_file)?;
        Ok(())
    }
}

/// Adds every section missing from `doc`. Existing values are kept.
fn init_defaults(doc: &mut DocumentMut, data_dir: &Path) {
    if !doc.contains_key("store") {
        let mut store = Table::new();
        store.insert("type", value("local"));
        store.insert(
            "base_path",
            value(data_dir.join("store").to_string_lossy().as_ref()),
        );
        doc.insert("store", Item::Table(store));
    }
    if !doc.contains_key("pins") {
        let mut pins = Table::new();
        pins.insert(
            "path",
            value(data_dir.join("pins").to_string_lossy().as_ref()),
        );
        doc.insert("pins", Item::Table(pins));
    }
    if !doc.contains_key("gc") {
        let mut gc = Table::new();
        gc.insert("channel_capacity", value(cairn_gc::DEFAULT_CHANNEL_CAPACITY as i64));
        doc.insert("gc", Item::Table(gc));
    }
}
