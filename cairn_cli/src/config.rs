use std::path::{Path, PathBuf};

use anyhow::Context;
use cairn_store_local::LocalStoreConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "cairn.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CairnConfig {
    pub store: StoreConfig,
    pub pins: PinsConfig,
    #[serde(default)]
    pub gc: GcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    Local(LocalStoreConfig),
    /// Discarded when the process exits.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinsConfig {
    /// Directory holding the pin datastore.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GcConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    cairn_gc::DEFAULT_CHANNEL_CAPACITY
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl CairnConfig {
    /// Config used when no file exists yet: everything under `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            store: StoreConfig::Local(LocalStoreConfig {
                base_path: data_dir.join("store").to_string_lossy().into_owned(),
            }),
            pins: PinsConfig {
                path: data_dir.join("pins").to_string_lossy().into_owned(),
            },
            gc: GcConfig::default(),
        }
    }

    pub fn parse(toml_content: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_content).context("could not parse config file")
    }

    /// Reads `config_file`, falling back to [`CairnConfig::with_data_dir`]
    /// if it does not exist. Relative paths are taken relative to the
    /// directory holding the file.
    pub fn load(config_file: &Path, data_dir: &Path) -> anyhow::Result<Self> {
        if !config_file.exists() {
            tracing::debug!("no config at {config_file:?}, using defaults");
            return Ok(Self::with_data_dir(data_dir));
        }
        let toml_content = std::fs::read_to_string(config_file)
            .with_context(|| format!("failed to read {}", config_file.display()))?;
        let mut config = Self::parse(&toml_content)?;
        if let Some(base) = config_file.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if let StoreConfig::Local(local) = &mut self.store {
            local.base_path = resolve(base, &local.base_path);
        }
        self.pins.path = resolve(base, &self.pins.path);
    }

    pub fn pins_path(&self) -> PathBuf {
        PathBuf::from(&self.pins.path)
    }
}

fn resolve(base: &Path, path: &str) -> String {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_string_lossy().into_owned()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_store() {
        let config = CairnConfig::parse(
            r#"
            [store]
            type = "local"
            base_path = "/srv/cairn/store"

            [pins]
            path = "/srv/cairn/pins"

            [gc]
            channel_capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Local(LocalStoreConfig {
                base_path: "/srv/cairn/store".into()
            })
        );
        assert_eq!(config.pins.path, "/srv/cairn/pins");
        assert_eq!(config.gc.channel_capacity, 16);
    }

    #[test]
    fn gc_section_is_optional() {
        let config = CairnConfig::parse(
            r#"
            [store]
            type = "memory"

            [pins]
            path = "pins"
            "#,
        )
        .unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.gc, GcConfig::default());
    }

    #[test]
    fn unknown_store_type_is_rejected() {
        let result = CairnConfig::parse(
            r#"
            [store]
            type = "tape"

            [pins]
            path = "pins"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &file,
            "[store]\ntype = \"local\"\nbase_path = \"store\"\n\n[pins]\npath = \"/abs/pins\"\n",
        )
        .unwrap();

        let config = CairnConfig::load(&file, Path::new("/unused")).unwrap();
        let StoreConfig::Local(local) = &config.store else {
            panic!("expected local store");
        };
        assert_eq!(Path::new(&local.base_path), dir.path().join("store"));
        assert_eq!(config.pins_path(), PathBuf::from("/abs/pins"));
    }

    #[test]
    fn missing_file_uses_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CairnConfig::load(&dir.path().join("nope.toml"), dir.path()).unwrap();
        assert_eq!(config, CairnConfig::with_data_dir(dir.path()));
    }
}
