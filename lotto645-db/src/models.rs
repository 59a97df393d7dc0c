use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const MAX_NUMBER: u8 = 45;
pub const PICK_COUNT: usize = 6;

/// Un tirage finalisé, tel qu'il est archivé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    /// Ordre de sortie d'origine, non trié.
    pub winning_numbers: [u8; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u8>,
}

impl RoundRecord {
    pub fn new(round: u32, winning_numbers: [u8; 6]) -> Self {
        Self {
            round,
            winning_numbers,
            bonus: None,
        }
    }

    pub fn with_bonus(mut self, bonus: u8) -> Self {
        self.bonus = Some(bonus);
        self
    }

    pub fn pattern(&self) -> GroupPattern {
        GroupPattern::from_numbers(&self.winning_numbers)
    }
}

/// Tirage en cours (le plus récent publié par le site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentDraw {
    pub round: u32,
    pub winning_numbers: [u8; 6],
    pub bonus: u8,
}

pub fn validate_number(n: u8) -> Result<()> {
    if n < 1 || n > MAX_NUMBER {
        bail!("Numéro {} hors limites (1-{})", n, MAX_NUMBER);
    }
    Ok(())
}

pub fn validate_winning_numbers(numbers: &[u8]) -> Result<()> {
    if numbers.len() != PICK_COUNT {
        bail!("{} numéros attendus, {} reçus", PICK_COUNT, numbers.len());
    }
    for &n in numbers {
        validate_number(n)?;
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro en double : {}", numbers[i]);
            }
        }
    }
    Ok(())
}

pub fn validate_record(record: &RoundRecord) -> Result<()> {
    if record.round == 0 {
        bail!("Numéro de tirage invalide : 0");
    }
    validate_winning_numbers(&record.winning_numbers)?;
    if let Some(bonus) = record.bonus {
        validate_number(bonus)?;
    }
    Ok(())
}

/// Les cinq tranches fixes qui partitionnent 1..=45.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupRange {
    G1To10,
    G11To20,
    G21To30,
    G31To40,
    G41To45,
}

impl GroupRange {
    pub const ALL: [GroupRange; 5] = [
        GroupRange::G1To10,
        GroupRange::G11To20,
        GroupRange::G21To30,
        GroupRange::G31To40,
        GroupRange::G41To45,
    ];

    pub fn bounds(&self) -> (u8, u8) {
        match self {
            GroupRange::G1To10 => (1, 10),
            GroupRange::G11To20 => (11, 20),
            GroupRange::G21To30 => (21, 30),
            GroupRange::G31To40 => (31, 40),
            GroupRange::G41To45 => (41, 45),
        }
    }

    /// Index 1-based dans l'ordre fixe des tranches.
    pub fn index(&self) -> u8 {
        match self {
            GroupRange::G1To10 => 1,
            GroupRange::G11To20 => 2,
            GroupRange::G21To30 => 3,
            GroupRange::G31To40 => 4,
            GroupRange::G41To45 => 5,
        }
    }

    pub fn members(&self) -> Vec<u8> {
        let (low, high) = self.bounds();
        (low..=high).collect()
    }

    pub fn from_bounds(low: u8, high: u8) -> Option<GroupRange> {
        GroupRange::ALL
            .into_iter()
            .find(|g| g.bounds() == (low, high))
    }

    pub fn of(number: u8) -> Option<GroupRange> {
        match number {
            1..=10 => Some(GroupRange::G1To10),
            11..=20 => Some(GroupRange::G11To20),
            21..=30 => Some(GroupRange::G21To30),
            31..=40 => Some(GroupRange::G31To40),
            41..=45 => Some(GroupRange::G41To45),
            _ => None,
        }
    }
}

impl fmt::Display for GroupRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (low, high) = self.bounds();
        write!(f, "[{}, {}]", low, high)
    }
}

/// Suite des tranches des six numéros, dans l'ordre de sortie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupPattern(pub [u8; 6]);

impl GroupPattern {
    /// Un numéro hors 1..=45 est classé 0 ; les enregistrements validés n'en contiennent pas.
    pub fn from_numbers(numbers: &[u8; 6]) -> Self {
        let mut pattern = [0u8; 6];
        for (slot, &n) in pattern.iter_mut().zip(numbers.iter()) {
            *slot = GroupRange::of(n).map(|g| g.index()).unwrap_or(0);
        }
        GroupPattern(pattern)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for GroupPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|g| g.to_string()).collect();
        write!(f, "{}", parts.join("-"))
    }
}

/// Archive des tirages, indexée par numéro de tirage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoricalArchive {
    rounds: BTreeMap<u32, RoundRecord>,
}

impl HistoricalArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// En cas de doublon, la première occurrence est conservée.
    /// Les enregistrements invalides sont écartés.
    pub fn from_records(records: Vec<RoundRecord>) -> Self {
        let mut archive = Self::new();
        for record in records {
            let round = record.round;
            if let Err(e) = validate_record(&record) {
                log::warn!("Tirage {} invalide dans l'archive, ignoré : {:#}", round, e);
                continue;
            }
            if !archive.insert(record) {
                log::warn!("Tirage {} présent en double dans l'archive, doublon ignoré", round);
            }
        }
        archive
    }

    /// Retourne false si le tirage existait déjà (l'archive reste inchangée).
    pub fn insert(&mut self, record: RoundRecord) -> bool {
        if self.rounds.contains_key(&record.round) {
            return false;
        }
        self.rounds.insert(record.round, record);
        true
    }

    pub fn get(&self, round: u32) -> Option<&RoundRecord> {
        self.rounds.get(&round)
    }

    pub fn contains(&self, round: u32) -> bool {
        self.rounds.contains_key(&round)
    }

    pub fn max_round(&self) -> u32 {
        self.rounds.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> impl Iterator<Item = u32> + '_ {
        self.rounds.keys().copied()
    }

    /// Ordre croissant de tirage.
    pub fn iter(&self) -> impl Iterator<Item = &RoundRecord> {
        self.rounds.values()
    }

    pub fn records(&self) -> Vec<RoundRecord> {
        self.rounds.values().cloned().collect()
    }

    pub fn last_records(&self, limit: usize) -> Vec<RoundRecord> {
        self.rounds.values().rev().take(limit).cloned().collect()
    }
}
