use serde::Serialize;

use lotto645_db::db::ArchiveStore;
use lotto645_db::models::{validate_record, GroupPattern, HistoricalArchive};

use crate::archive::{ArchiveManager, UpdateReport};
use crate::error::{EngineError, EngineResult};
use crate::source::DrawSource;

pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCandidate {
    pub pattern: GroupPattern,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub previous_round: u32,
    pub previous_numbers: [u8; 6],
    pub previous_pattern: GroupPattern,
    /// Vide si aucun tirage passé ne reproduit le motif précédent.
    pub candidates: Vec<PatternCandidate>,
    pub report: UpdateReport,
}

/// Motifs ayant suivi `previous_pattern` dans l'archive, par fréquence décroissante.
///
/// Seuls les tirages `r < previous_round` dont le suivant `r + 1` est archivé
/// sont examinés. À fréquence égale, l'ordre de première apparition l'emporte.
pub fn rank_successor_patterns(
    archive: &HistoricalArchive,
    previous_round: u32,
    previous_pattern: GroupPattern,
    top_n: usize,
) -> Vec<PatternCandidate> {
    let mut tally: Vec<PatternCandidate> = Vec::new();

    for record in archive.iter().take_while(|r| r.round < previous_round) {
        let Some(next) = archive.get(record.round + 1) else {
            continue;
        };
        if record.pattern() != previous_pattern {
            continue;
        }
        let successor = next.pattern();
        log::debug!("Tirage {} identique -> tirage {} : {}", record.round, next.round, successor);
        match tally.iter_mut().find(|c| c.pattern == successor) {
            Some(candidate) => candidate.occurrences += 1,
            None => tally.push(PatternCandidate {
                pattern: successor,
                occurrences: 1,
            }),
        }
    }

    // sort_by est stable : l'ordre de découverte départage les égalités
    tally.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    tally.truncate(top_n);
    tally
}

pub struct PatternRecommender<'a, S: ArchiveStore> {
    manager: &'a ArchiveManager<S>,
    source: &'a dyn DrawSource,
    top_n: usize,
}

impl<'a, S: ArchiveStore> PatternRecommender<'a, S> {
    pub fn new(manager: &'a ArchiveManager<S>, source: &'a dyn DrawSource) -> Self {
        Self {
            manager,
            source,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn recommend(&self) -> EngineResult<Recommendation> {
        let update = self.manager.update(self.source)?;

        let current_round = match update.report.current_round {
            Some(round) => round,
            None => self
                .source
                .fetch_current_draw()
                .map_err(EngineError::Source)?
                .round,
        };
        let previous_round = current_round.saturating_sub(1);
        if previous_round == 0 {
            return Err(EngineError::PreviousRoundUnavailable { round: previous_round });
        }

        let previous_numbers = match update.archive.get(previous_round) {
            Some(record) => record.winning_numbers,
            None => {
                log::warn!("Tirage précédent {} absent de l'archive, requête directe", previous_round);
                let record = self
                    .source
                    .fetch_round(previous_round)
                    .and_then(|r| validate_record(&r).map(|_| r))
                    .map_err(|e| {
                        log::warn!("Tirage {} introuvable : {:#}", previous_round, e);
                        EngineError::PreviousRoundUnavailable { round: previous_round }
                    })?;
                if record.round != previous_round {
                    return Err(EngineError::PreviousRoundUnavailable { round: previous_round });
                }
                record.winning_numbers
            }
        };

        let previous_pattern = GroupPattern::from_numbers(&previous_numbers);
        let candidates =
            rank_successor_patterns(&update.archive, previous_round, previous_pattern, self.top_n);
        log::info!(
            "Tirage {} ({}) : {} motif(s) recommandé(s)",
            previous_round,
            previous_pattern,
            candidates.len()
        );

        Ok(Recommendation {
            previous_round,
            previous_numbers,
            previous_pattern,
            candidates,
            report: update.report,
        })
    }
}
