use lotto645_db::models::{HistoricalArchive, MAX_NUMBER};
use lotto645_engine::probability::{AppearanceCounts, ProbabilityTable};

#[derive(Debug, Clone, PartialEq)]
pub enum WeightTag {
    Hot,
    Cold,
    Normal,
}

impl std::fmt::Display for WeightTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightTag::Hot => write!(f, "HOT"),
            WeightTag::Cold => write!(f, "COLD"),
            WeightTag::Normal => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumberWeight {
    pub number: u8,
    pub count: u32,
    pub weight: f64,
    pub tag: WeightTag,
}

pub fn number_weights(counts: &AppearanceCounts, table: &ProbabilityTable) -> Vec<NumberWeight> {
    let mut rows: Vec<NumberWeight> = (1..=MAX_NUMBER)
        .map(|n| NumberWeight {
            number: n,
            count: counts.get(&n).copied().unwrap_or(0),
            weight: table.weight(n),
            tag: WeightTag::Normal,
        })
        .collect();
    tag_weights(&mut rows);
    rows
}

/// Écart relatif au poids moyen au-delà duquel un numéro est chaud ou froid.
const TAG_THRESHOLD: f64 = 0.1;

pub fn tag_weights(rows: &mut [NumberWeight]) {
    if rows.is_empty() {
        return;
    }
    let mean = rows.iter().map(|r| r.weight).sum::<f64>() / rows.len() as f64;
    if mean <= 0.0 {
        return;
    }

    for row in rows.iter_mut() {
        let deviation = (row.weight - mean) / mean;
        if deviation > TAG_THRESHOLD {
            row.tag = WeightTag::Hot;
        } else if deviation < -TAG_THRESHOLD {
            row.tag = WeightTag::Cold;
        } else {
            row.tag = WeightTag::Normal;
        }
    }
}

/// Répartition des numéros gagnants par tranche sur les `window` derniers tirages.
pub fn group_distribution(archive: &HistoricalArchive, window: usize) -> [u32; 5] {
    let mut totals = [0u32; 5];
    for record in archive.last_records(window) {
        for &g in record.pattern().as_slice() {
            if (1..=5).contains(&g) {
                totals[(g - 1) as usize] += 1;
            }
        }
    }
    totals
}
