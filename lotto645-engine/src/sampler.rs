use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::probability::ProbabilityTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Proportionnel au poids de chaque numéro.
    #[default]
    Weighted,
    /// Équiprobable, ignore les poids.
    Uniform,
    /// Proportionnel à 1/poids (0 si le poids est nul).
    #[value(name = "inverse")]
    #[serde(rename = "inverse")]
    InverseWeighted,
}

impl Strategy {
    /// Codes numériques historiques : 1 pondéré, 2 aléatoire, 3 inverse.
    pub fn from_code(code: u8) -> Option<Strategy> {
        match code {
            1 => Some(Strategy::Weighted),
            2 => Some(Strategy::Uniform),
            3 => Some(Strategy::InverseWeighted),
            _ => None,
        }
    }

    fn transform(&self, weight: f64) -> f64 {
        match self {
            Strategy::Weighted => weight,
            Strategy::Uniform => 1.0,
            Strategy::InverseWeighted => {
                if weight > 0.0 {
                    1.0 / weight
                } else {
                    0.0
                }
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Weighted => write!(f, "pondéré"),
            Strategy::Uniform => write!(f, "aléatoire"),
            Strategy::InverseWeighted => write!(f, "pondéré inverse"),
        }
    }
}

/// Tire `k` numéros distincts parmi `candidates`, sans remise.
pub fn draw<R: Rng + ?Sized>(
    strategy: Strategy,
    weights: &ProbabilityTable,
    candidates: &[u8],
    k: usize,
    rng: &mut R,
) -> EngineResult<Vec<u8>> {
    if k > candidates.len() {
        return Err(EngineError::InsufficientCandidates {
            requested: k,
            available: candidates.len(),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    match strategy {
        Strategy::Uniform => Ok(candidates.choose_multiple(rng, k).copied().collect()),
        Strategy::Weighted | Strategy::InverseWeighted => {
            let raw: Vec<f64> = candidates.iter().map(|&n| weights.weight(n)).collect();
            if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(EngineError::DegenerateWeights);
            }
            let transformed: Vec<(u8, f64)> = candidates
                .iter()
                .zip(raw)
                .map(|(&n, w)| (n, strategy.transform(w)))
                .collect();
            sample_without_replacement(transformed, k, rng)
        }
    }
}

fn sample_without_replacement<R: Rng + ?Sized>(
    mut available: Vec<(u8, f64)>,
    count: usize,
    rng: &mut R,
) -> EngineResult<Vec<u8>> {
    let mut selected = Vec::with_capacity(count);

    for _ in 0..count {
        let weights: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
        // Échoue aussi quand il reste moins de poids non nuls que de tirages
        let dist = WeightedIndex::new(&weights).map_err(|_| EngineError::DegenerateWeights)?;
        let idx = dist.sample(rng);

        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    Ok(selected)
}
