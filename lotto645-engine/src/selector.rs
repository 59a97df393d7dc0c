use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};
use rand::Rng;
use serde::{Deserialize, Serialize};

use lotto645_db::models::GroupRange;

use crate::error::EngineResult;
use crate::probability::ProbabilityTable;
use crate::sampler::{draw, Strategy};

pub const DEFAULT_TARGET: usize = 6;

/// Tranche demandée par l'appelant, sous sa forme brute `[bas, haut]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub low: u8,
    pub high: u8,
}

impl GroupSpec {
    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn resolve(&self) -> Option<GroupRange> {
        GroupRange::from_bounds(self.low, self.high)
    }
}

impl From<GroupRange> for GroupSpec {
    fn from(group: GroupRange) -> Self {
        let (low, high) = group.bounds();
        Self { low, high }
    }
}

impl fmt::Display for GroupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Accepte `1-10` ou `[1, 10]`.
impl FromStr for GroupSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let parts: Vec<&str> = trimmed
            .split(|c| c == '-' || c == ',')
            .map(|p| p.trim())
            .collect();
        if parts.len() != 2 {
            bail!("Tranche invalide: '{}' (format attendu : 1-10)", s);
        }
        let low = parts[0]
            .parse::<u8>()
            .with_context(|| format!("Borne basse invalide dans '{}'", s))?;
        let high = parts[1]
            .parse::<u8>()
            .with_context(|| format!("Borne haute invalide dans '{}'", s))?;
        Ok(GroupSpec { low, high })
    }
}

/// Tirage contraint par tranches : un numéro obligatoire par tranche demandée,
/// puis complément jusqu'à `target` dans l'union des tranches.
///
/// Le résultat peut compter moins de `target` numéros si l'union est épuisée.
pub fn select<R: Rng + ?Sized>(
    groups: &[GroupSpec],
    probabilities: &ProbabilityTable,
    strategy: Strategy,
    target: usize,
    rng: &mut R,
) -> EngineResult<BTreeSet<u8>> {
    let resolved: Vec<GroupRange> = groups
        .iter()
        .filter_map(|spec| {
            let group = spec.resolve();
            if group.is_none() {
                log::warn!("Tranche {} inconnue, ignorée", spec);
            }
            group
        })
        .collect();

    let available: BTreeSet<u8> = resolved.iter().flat_map(|g| g.members()).collect();
    log::debug!("Numéros disponibles : {:?}", available);

    // Les doublons de tranche sont tirés indépendamment ; une collision est absorbée par l'ensemble
    let mut chosen = BTreeSet::new();
    for group in &resolved {
        let pool = group.members();
        let picked = draw(strategy, probabilities, &pool, 1, rng)?;
        log::debug!("Tranche {} : numéro obligatoire {:?}", group, picked);
        chosen.extend(picked);
    }

    while chosen.len() < target {
        let remaining: Vec<u8> = available.difference(&chosen).copied().collect();
        if remaining.is_empty() {
            log::debug!("Plus aucun numéro disponible, {} numéros retenus", chosen.len());
            break;
        }
        let needed = (target - chosen.len()).min(remaining.len());
        let picked = draw(strategy, probabilities, &remaining, needed, rng)?;
        chosen.extend(picked);
    }

    log::debug!("Numéros retenus ({}) : {:?}", strategy, chosen);
    Ok(chosen)
}

/// Même tirage, présenté en ordre croissant.
pub fn select_sorted<R: Rng + ?Sized>(
    groups: &[GroupSpec],
    probabilities: &ProbabilityTable,
    strategy: Strategy,
    target: usize,
    rng: &mut R,
) -> EngineResult<Vec<u8>> {
    let chosen = select(groups, probabilities, strategy, target, rng)?;
    Ok(chosen.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn specs(groups: &[GroupRange]) -> Vec<GroupSpec> {
        groups.iter().copied().map(GroupSpec::from).collect()
    }

    fn skewed_table() -> ProbabilityTable {
        ProbabilityTable::new((1..=45).map(|n| (n, n as f64 / 100.0)).collect())
    }

    #[test]
    fn test_six_numbers_within_groups() {
        let groups = specs(&[GroupRange::G1To10, GroupRange::G31To40]);
        let table = skewed_table();
        let mut rng = StdRng::seed_from_u64(17);

        for strategy in [Strategy::Weighted, Strategy::Uniform, Strategy::InverseWeighted] {
            for _ in 0..100 {
                let chosen = select(&groups, &table, strategy, 6, &mut rng).unwrap();
                assert_eq!(chosen.len(), 6);
                assert!(chosen.iter().all(|&n| (1..=10).contains(&n) || (31..=40).contains(&n)));
                assert!(chosen.iter().any(|&n| n <= 10));
                assert!(chosen.iter().any(|&n| n >= 31));
            }
        }
    }

    #[test]
    fn test_one_number_per_group_when_all_selected() {
        let groups = specs(&GroupRange::ALL);
        let table = skewed_table();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..100 {
            let chosen = select(&groups, &table, Strategy::Weighted, 6, &mut rng).unwrap();
            assert_eq!(chosen.len(), 6);
            for group in GroupRange::ALL {
                assert!(chosen.iter().any(|&n| GroupRange::of(n) == Some(group)));
            }
        }
    }

    #[test]
    fn test_no_groups_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select(&[], &skewed_table(), Strategy::Weighted, 6, &mut rng).unwrap();
        assert!(chosen.is_empty());
    }

    #[test]
    fn test_short_pool_gives_short_result() {
        let groups = specs(&[GroupRange::G41To45]);
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select(&groups, &skewed_table(), Strategy::Uniform, 6, &mut rng).unwrap();
        assert_eq!(chosen.into_iter().collect::<Vec<_>>(), vec![41, 42, 43, 44, 45]);
    }

    #[test]
    fn test_duplicate_groups_are_deduplicated() {
        let groups = specs(&[GroupRange::G41To45, GroupRange::G41To45, GroupRange::G41To45]);
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..50 {
            let chosen = select(&groups, &skewed_table(), Strategy::Weighted, 6, &mut rng).unwrap();
            assert_eq!(chosen.len(), 5);
        }
    }

    #[test]
    fn test_unknown_group_is_skipped() {
        let groups = vec![GroupSpec::new(1, 9), GroupSpec::new(11, 20)];
        let mut rng = StdRng::seed_from_u64(4);
        let chosen = select(&groups, &skewed_table(), Strategy::Weighted, 6, &mut rng).unwrap();
        assert_eq!(chosen.len(), 6);
        assert!(chosen.iter().all(|&n| (11..=20).contains(&n)));
    }

    #[test]
    fn test_only_unknown_groups_is_empty() {
        let groups = vec![GroupSpec::new(0, 50)];
        let mut rng = StdRng::seed_from_u64(4);
        let chosen = select(&groups, &skewed_table(), Strategy::Weighted, 6, &mut rng).unwrap();
        assert!(chosen.is_empty());
    }

    #[test]
    fn test_degenerate_weights_propagate() {
        let zero = ProbabilityTable::new(BTreeMap::new());
        let groups = specs(&[GroupRange::G1To10]);
        let mut rng = StdRng::seed_from_u64(4);
        for strategy in [Strategy::Weighted, Strategy::InverseWeighted] {
            let err = select(&groups, &zero, strategy, 6, &mut rng).unwrap_err();
            assert!(matches!(err, EngineError::DegenerateWeights));
        }
        assert_eq!(select(&groups, &zero, Strategy::Uniform, 6, &mut rng).unwrap().len(), 6);
    }

    #[test]
    fn test_select_sorted_is_ascending() {
        let groups = specs(&[GroupRange::G21To30, GroupRange::G1To10]);
        let mut rng = StdRng::seed_from_u64(99);
        let numbers = select_sorted(&groups, &skewed_table(), Strategy::Uniform, 6, &mut rng).unwrap();
        assert_eq!(numbers.len(), 6);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_group_spec_parsing() {
        assert_eq!("1-10".parse::<GroupSpec>().unwrap(), GroupSpec::new(1, 10));
        assert_eq!("[41, 45]".parse::<GroupSpec>().unwrap(), GroupSpec::new(41, 45));
        assert_eq!(" 11 - 20 ".parse::<GroupSpec>().unwrap(), GroupSpec::new(11, 20));
        assert!("1".parse::<GroupSpec>().is_err());
        assert!("a-b".parse::<GroupSpec>().is_err());
        assert_eq!(GroupSpec::new(21, 30).resolve(), Some(GroupRange::G21To30));
        assert_eq!(GroupSpec::new(21, 29).resolve(), None);
    }
}
