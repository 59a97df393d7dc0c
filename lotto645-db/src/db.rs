use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use crate::lock::ArchiveLock;
use crate::models::RoundRecord;

/// Persistance de l'archive complète.
///
/// `load` retourne `Ok(None)` lorsqu'aucune archive n'a encore été déposée.
/// `save` réécrit l'archive entière, triée par tirage croissant.
/// `lock_exclusive` protège un cycle lecture-écriture contre les autres processus ;
/// `None` pour un stockage propre au processus.
pub trait ArchiveStore: Send {
    fn load(&self) -> Result<Option<Vec<RoundRecord>>>;
    fn save(&mut self, records: &[RoundRecord]) -> Result<()>;
    fn describe(&self) -> String;

    fn lock_exclusive(&self) -> Result<Option<ArchiveLock>> {
        Ok(None)
    }
}

impl<S: ArchiveStore + ?Sized> ArchiveStore for Box<S> {
    fn load(&self) -> Result<Option<Vec<RoundRecord>>> {
        (**self).load()
    }

    fn save(&mut self, records: &[RoundRecord]) -> Result<()> {
        (**self).save(records)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn lock_exclusive(&self) -> Result<Option<ArchiveLock>> {
        (**self).lock_exclusive()
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rounds (
    round  INTEGER PRIMARY KEY,
    n1     INTEGER NOT NULL,
    n2     INTEGER NOT NULL,
    n3     INTEGER NOT NULL,
    n4     INTEGER NOT NULL,
    n5     INTEGER NOT NULL,
    n6     INTEGER NOT NULL,
    bonus  INTEGER
);
";

pub fn default_data_dir() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn insert_round(conn: &Connection, record: &RoundRecord) -> Result<bool> {
    let n = &record.winning_numbers;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO rounds (round, n1, n2, n3, n4, n5, n6, bonus)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![record.round, n[0], n[1], n[2], n[3], n[4], n[5], record.bonus],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

pub fn fetch_all_rounds(conn: &Connection) -> Result<Vec<RoundRecord>> {
    let mut stmt = conn.prepare(
        "SELECT round, n1, n2, n3, n4, n5, n6, bonus FROM rounds ORDER BY round ASC"
    )?;
    let records = stmt.query_map([], |row| {
        Ok(RoundRecord {
            round: row.get(0)?,
            winning_numbers: [
                row.get::<_, u8>(1)?,
                row.get::<_, u8>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, u8>(4)?,
                row.get::<_, u8>(5)?,
                row.get::<_, u8>(6)?,
            ],
            bonus: row.get::<_, Option<u8>>(7)?,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn count_rounds(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM rounds", [], |row| row.get(0))?;
    Ok(count)
}

/// Remplace tout le contenu de la table dans une seule transaction.
pub fn replace_all_rounds(conn: &Connection, records: &[RoundRecord]) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    tx.execute("DELETE FROM rounds", [])
        .context("Échec de la purge")?;
    for record in records {
        insert_round(&tx, record)?;
    }
    tx.commit().context("Échec du commit")?;
    Ok(())
}

/// Archive stockée dans une base SQLite.
pub struct SqliteArchiveStore {
    path: PathBuf,
}

impl SqliteArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_existing(&self) -> Result<Option<Connection>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .with_context(|| format!("Impossible d'ouvrir la base {:?}", self.path))?;
        Ok(Some(conn))
    }
}

impl ArchiveStore for SqliteArchiveStore {
    fn load(&self) -> Result<Option<Vec<RoundRecord>>> {
        let Some(conn) = self.open_existing()? else {
            return Ok(None);
        };
        migrate(&conn)?;
        let records = fetch_all_rounds(&conn)?;
        Ok(Some(records))
    }

    fn save(&mut self, records: &[RoundRecord]) -> Result<()> {
        let conn = open_db(&self.path)?;
        migrate(&conn)?;
        replace_all_rounds(&conn, records)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn lock_exclusive(&self) -> Result<Option<ArchiveLock>> {
        ArchiveLock::acquire(&self.path).map(Some)
    }
}

/// Archive en mémoire ; `None` simule l'absence d'archive déposée.
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    records: Option<Vec<RoundRecord>>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryArchiveStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<RoundRecord>) -> Self {
        Self {
            records: Some(records),
            ..Self::default()
        }
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn records(&self) -> Option<&[RoundRecord]> {
        self.records.as_deref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ArchiveStore for MemoryArchiveStore {
    fn load(&self) -> Result<Option<Vec<RoundRecord>>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[RoundRecord]) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("Écriture refusée (archive en lecture seule)");
        }
        self.records = Some(records.to_vec());
        self.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(round: u32) -> RoundRecord {
        RoundRecord::new(round, [1, 12, 23, 34, 45, 6])
    }

    #[test]
    fn test_insert_and_count() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(count_rounds(&conn).unwrap(), 0);

        insert_round(&conn, &record(1)).unwrap();
        assert_eq!(count_rounds(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert!(insert_round(&conn, &record(1)).unwrap());
        assert!(!insert_round(&conn, &record(1)).unwrap());
        assert_eq!(count_rounds(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order_and_bonus() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        insert_round(&conn, &record(5)).unwrap();
        insert_round(&conn, &record(2).with_bonus(9)).unwrap();
        insert_round(&conn, &record(3)).unwrap();

        let rounds = fetch_all_rounds(&conn).unwrap();
        let ids: Vec<u32> = rounds.iter().map(|r| r.round).collect();
        assert_eq!(ids, vec![2, 3, 5]);
        assert_eq!(rounds[0].bonus, Some(9));
        assert_eq!(rounds[1].bonus, None);
        assert_eq!(rounds[0].winning_numbers, [1, 12, 23, 34, 45, 6]);
    }

    #[test]
    fn test_sqlite_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteArchiveStore::new(dir.path().join("absent.db"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_sqlite_store_save_replaces_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteArchiveStore::new(dir.path().join("archive.db"));

        store.save(&[record(1), record(2), record(3)]).unwrap();
        store.save(&[record(2), record(4)]).unwrap();

        let loaded = store.load().unwrap().unwrap();
        let ids: Vec<u32> = loaded.iter().map(|r| r.round).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let mut store = MemoryArchiveStore::empty();
        assert!(store.load().unwrap().is_none());
        store.save(&[record(1)]).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_failing_saves() {
        let mut store = MemoryArchiveStore::with_records(vec![record(1)]).failing_saves();
        assert!(store.save(&[record(1), record(2)]).is_err());
        assert_eq!(store.records().unwrap().len(), 1);
        assert_eq!(store.save_count(), 0);
    }
}
