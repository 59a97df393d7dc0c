use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use lotto645_db::models::{CurrentDraw, RoundRecord};

use crate::probability::AppearanceCounts;

/// Fournisseur externe des résultats officiels.
///
/// `fetch_round` retourne une erreur pour tout tirage introuvable ou illisible ;
/// l'appelant décide s'il la rattrape.
pub trait DrawSource {
    fn fetch_appearance_counts(&self) -> Result<AppearanceCounts>;
    fn fetch_current_draw(&self) -> Result<CurrentDraw>;
    fn fetch_round(&self, round: u32) -> Result<RoundRecord>;
}

/// Instantané hors ligne du site de résultats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub appearance_counts: BTreeMap<u8, u32>,
    pub current_draw: Option<CurrentDraw>,
    #[serde(default)]
    pub rounds: Vec<RoundRecord>,
}

pub struct FeedDrawSource {
    feed: Feed,
    rounds: BTreeMap<u32, RoundRecord>,
}

impl FeedDrawSource {
    pub fn new(feed: Feed) -> Self {
        let rounds = feed.rounds.iter().map(|r| (r.round, r.clone())).collect();
        Self { feed, rounds }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire le flux {:?}", path))?;
        let feed: Feed = serde_json::from_str(&json)
            .with_context(|| format!("Flux JSON invalide {:?}", path))?;
        Ok(Self::new(feed))
    }
}

impl DrawSource for FeedDrawSource {
    fn fetch_appearance_counts(&self) -> Result<AppearanceCounts> {
        if self.feed.appearance_counts.is_empty() {
            bail!("Table des apparitions absente du flux");
        }
        Ok(self.feed.appearance_counts.clone())
    }

    fn fetch_current_draw(&self) -> Result<CurrentDraw> {
        self.feed
            .current_draw
            .clone()
            .ok_or_else(|| anyhow!("Tirage en cours absent du flux"))
    }

    fn fetch_round(&self, round: u32) -> Result<RoundRecord> {
        self.rounds
            .get(&round)
            .cloned()
            .ok_or_else(|| anyhow!("Tirage {} absent du flux", round))
    }
}

/// Source en mémoire pour les tests : tirages en échec configurables,
/// journal des tirages demandés.
#[derive(Default)]
pub struct MemoryDrawSource {
    pub counts: AppearanceCounts,
    pub current: Option<CurrentDraw>,
    pub rounds: BTreeMap<u32, RoundRecord>,
    pub failing: BTreeSet<u32>,
    flaky: RefCell<BTreeSet<u32>>,
    requested: RefCell<Vec<u32>>,
}

impl MemoryDrawSource {
    pub fn new(current_round: u32) -> Self {
        Self {
            current: Some(CurrentDraw {
                round: current_round,
                winning_numbers: [1, 2, 3, 4, 5, 6],
                bonus: 7,
            }),
            ..Self::default()
        }
    }

    pub fn with_round(mut self, record: RoundRecord) -> Self {
        self.rounds.insert(record.round, record);
        self
    }

    pub fn failing_round(mut self, round: u32) -> Self {
        self.failing.insert(round);
        self
    }

    /// Échoue au premier appel seulement.
    pub fn failing_once(self, round: u32) -> Self {
        self.flaky.borrow_mut().insert(round);
        self
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.borrow().clone()
    }
}

impl DrawSource for MemoryDrawSource {
    fn fetch_appearance_counts(&self) -> Result<AppearanceCounts> {
        Ok(self.counts.clone())
    }

    fn fetch_current_draw(&self) -> Result<CurrentDraw> {
        self.current
            .clone()
            .ok_or_else(|| anyhow!("Tirage en cours indisponible"))
    }

    fn fetch_round(&self, round: u32) -> Result<RoundRecord> {
        self.requested.borrow_mut().push(round);
        if self.failing.contains(&round) || self.flaky.borrow_mut().remove(&round) {
            bail!("Délai dépassé pour le tirage {}", round);
        }
        self.rounds
            .get(&round)
            .cloned()
            .ok_or_else(|| anyhow!("Tirage {} introuvable", round))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "appearance_counts": {"1": 160, "2": 150},
        "current_draw": {"round": 1101, "winning_numbers": [1, 2, 3, 4, 5, 6], "bonus": 7},
        "rounds": [{"round": 1100, "winning_numbers": [7, 12, 23, 34, 41, 2]}]
    }"#;

    #[test]
    fn test_feed_source_lookups() {
        let feed: Feed = serde_json::from_str(FEED).unwrap();
        let source = FeedDrawSource::new(feed);

        assert_eq!(source.fetch_current_draw().unwrap().round, 1101);
        assert_eq!(source.fetch_round(1100).unwrap().winning_numbers, [7, 12, 23, 34, 41, 2]);
        assert!(source.fetch_round(1099).is_err());

        let counts = source.fetch_appearance_counts().unwrap();
        assert_eq!(counts.get(&1), Some(&160));
    }

    #[test]
    fn test_feed_source_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, FEED).unwrap();
        let source = FeedDrawSource::from_path(&path).unwrap();
        assert_eq!(source.fetch_current_draw().unwrap().bonus, 7);
    }

    #[test]
    fn test_empty_feed_errors() {
        let source = FeedDrawSource::new(Feed::default());
        assert!(source.fetch_current_draw().is_err());
        assert!(source.fetch_appearance_counts().is_err());
    }

    #[test]
    fn test_memory_source_failures_are_logged() {
        let source = MemoryDrawSource::new(10)
            .with_round(RoundRecord::new(8, [1, 2, 3, 4, 5, 6]))
            .failing_round(8);
        assert!(source.fetch_round(8).is_err());
        assert!(source.fetch_round(9).is_err());
        assert_eq!(source.requested(), vec![8, 9]);
    }

    #[test]
    fn test_memory_source_failing_once() {
        let source = MemoryDrawSource::new(10)
            .with_round(RoundRecord::new(8, [1, 2, 3, 4, 5, 6]))
            .failing_once(8);
        assert!(source.fetch_round(8).is_err());
        assert!(source.fetch_round(8).is_ok());
    }
}
