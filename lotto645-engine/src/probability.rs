use std::collections::BTreeMap;

/// Nombre d'apparitions de chaque numéro (bonus compris) depuis le premier tirage.
pub type AppearanceCounts = BTreeMap<u8, u32>;

/// Chaque tirage fait sortir 7 numéros (6 + bonus).
pub fn estimate_round(counts: &AppearanceCounts) -> u32 {
    let total: u64 = counts.values().map(|&c| c as u64).sum();
    (total / 7) as u32
}

/// Poids par numéro ; la somme n'est pas normalisée.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityTable {
    weights: BTreeMap<u8, f64>,
}

impl ProbabilityTable {
    pub fn new(weights: BTreeMap<u8, f64>) -> Self {
        Self { weights }
    }

    pub fn uniform() -> Self {
        Self::new((1..=lotto645_db::models::MAX_NUMBER).map(|n| (n, 1.0)).collect())
    }

    /// poids(n) = (apparitions(n) / tirage estimé) / 7
    pub fn from_appearance_counts(counts: &AppearanceCounts) -> Self {
        let round = estimate_round(counts);
        let weights = counts
            .iter()
            .map(|(&n, &count)| {
                let w = if round == 0 {
                    0.0
                } else {
                    (count as f64 / round as f64) / 7.0
                };
                (n, w)
            })
            .collect();
        Self { weights }
    }

    /// Un numéro absent de la table pèse 0.
    pub fn weight(&self, number: u8) -> f64 {
        self.weights.get(&number).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.weights.iter().map(|(&n, &w)| (n, w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
