use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::db::ArchiveStore;
use crate::lock::ArchiveLock;
use crate::models::RoundRecord;

/// Archive au format JSON d'origine : tableau de `{round, winning_numbers}`.
pub struct JsonArchiveStore {
    path: PathBuf,
}

impl JsonArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn read_records(path: &Path) -> Result<Vec<RoundRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    let records: Vec<RoundRecord> = serde_json::from_str(&json)
        .with_context(|| format!("Archive JSON invalide {:?}", path))?;
    Ok(records)
}

/// Écriture atomique : fichier temporaire voisin puis renommage.
pub fn write_records(path: &Path, records: &[RoundRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Impossible de créer le répertoire {:?}", dir))?;

    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.round);

    let json = serde_json::to_string(&sorted)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Impossible de créer un fichier temporaire dans {:?}", dir))?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("Impossible d'écrire {:?}", path))?;
    Ok(())
}

impl ArchiveStore for JsonArchiveStore {
    fn load(&self) -> Result<Option<Vec<RoundRecord>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        read_records(&self.path).map(Some)
    }

    fn save(&mut self, records: &[RoundRecord]) -> Result<()> {
        write_records(&self.path, records)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn lock_exclusive(&self) -> Result<Option<ArchiveLock>> {
        ArchiveLock::acquire(&self.path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArchiveStore::new(dir.path().join("historical_data.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_sorts_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historical_data.json");
        let mut store = JsonArchiveStore::new(&path);

        store.save(&[
            RoundRecord::new(3, [1, 2, 3, 4, 5, 6]),
            RoundRecord::new(1, [40, 41, 42, 43, 44, 45]).with_bonus(7),
        ]).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].round, 1);
        assert_eq!(loaded[0].bonus, Some(7));
        assert_eq!(loaded[1].round, 3);
        assert_eq!(loaded[1].winning_numbers, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_reads_backbone_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historical_data.json");
        std::fs::write(
            &path,
            r#"[{"round": 1, "winning_numbers": [10, 23, 29, 33, 37, 40]}]"#,
        ).unwrap();

        let loaded = JsonArchiveStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded, vec![RoundRecord::new(1, [10, 23, 29, 33, 37, 40])]);
    }

    #[test]
    fn test_lock_file_next_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historical_data.json");
        let lock = JsonArchiveStore::new(&path).lock_exclusive().unwrap().unwrap();
        assert_eq!(lock.path(), dir.path().join("historical_data.json.lock"));
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historical_data.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonArchiveStore::new(&path).load().is_err());
    }
}
