use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use lotto645_db::db::{default_data_dir, ArchiveStore, SqliteArchiveStore};
use lotto645_db::json::JsonArchiveStore;

use crate::recommend::DEFAULT_TOP_N;
use crate::selector::DEFAULT_TARGET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub archive_path: PathBuf,
    pub store: StoreKind,
    pub feed_path: PathBuf,
    pub target: usize,
    pub top_n: usize,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data = default_data_dir();
        Self {
            archive_path: data.join("historical_data.json"),
            store: StoreKind::Json,
            feed_path: data.join("feed.json"),
            target: DEFAULT_TARGET,
            top_n: DEFAULT_TOP_N,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire la configuration {:?}", path))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("Configuration invalide {:?}", path))?;
        Ok(config)
    }

    pub fn open_store(&self) -> Box<dyn ArchiveStore> {
        match self.store {
            StoreKind::Json => Box::new(JsonArchiveStore::new(&self.archive_path)),
            StoreKind::Sqlite => Box::new(SqliteArchiveStore::new(&self.archive_path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.target, 6);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.store, StoreKind::Json);
        assert!(config.archive_path.ends_with("historical_data.json"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"store": "sqlite", "seed": 42}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.target, 6);
        assert_eq!(config.top_n, 3);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.archive_path, config.archive_path);
        assert_eq!(restored.store, config.store);
    }
}
