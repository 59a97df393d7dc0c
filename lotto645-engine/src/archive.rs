use std::sync::Mutex;

use anyhow::anyhow;
use serde::Serialize;

use lotto645_db::db::ArchiveStore;
use lotto645_db::models::{validate_record, HistoricalArchive, RoundRecord};

use crate::error::{EngineError, EngineResult};
use crate::source::DrawSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RoundStatus {
    Appended,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub status: RoundStatus,
}

/// Bilan d'une mise à jour : un résultat par tirage tenté.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// `None` si le tirage en cours n'a pas pu être obtenu.
    pub current_round: Option<u32>,
    pub target_round: Option<u32>,
    pub loaded: usize,
    pub outcomes: Vec<RoundOutcome>,
    pub persisted: bool,
    pub persist_error: Option<String>,
}

impl UpdateReport {
    pub fn appended(&self) -> impl Iterator<Item = u32> + '_ {
        self.outcomes
            .iter()
            .filter(|o| o.status == RoundStatus::Appended)
            .map(|o| o.round)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.outcomes.iter().filter_map(|o| match &o.status {
            RoundStatus::Skipped { reason } => Some((o.round, reason.as_str())),
            RoundStatus::Appended => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveUpdate {
    pub archive: HistoricalArchive,
    pub report: UpdateReport,
}

/// Seul écrivain de l'archive persistée ; les mises à jour sont sérialisées
/// entre threads par le `Mutex` et entre processus par le verrou du stockage.
pub struct ArchiveManager<S: ArchiveStore> {
    store: Mutex<S>,
}

impl<S: ArchiveStore> ArchiveManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn into_store(self) -> EngineResult<S> {
        self.store
            .into_inner()
            .map_err(|_| EngineError::Other(anyhow!("Verrou de l'archive empoisonné")))
    }

    /// Lecture seule, sans rafraîchissement.
    pub fn load(&self) -> EngineResult<HistoricalArchive> {
        let store = self.lock()?;
        let records = store.load()?.ok_or(EngineError::ArchiveUnavailable)?;
        Ok(HistoricalArchive::from_records(records))
    }

    /// Fusionne des tirages importés dans l'archive, en la créant si besoin.
    /// Retourne (ajoutés, doublons ignorés).
    pub fn seed(&self, records: Vec<RoundRecord>) -> EngineResult<(usize, usize)> {
        let mut store = self.lock()?;
        let _file_lock = store.lock_exclusive()?;
        let mut archive = HistoricalArchive::from_records(store.load()?.unwrap_or_default());

        let mut inserted = 0;
        let mut duplicates = 0;
        for record in records {
            if archive.insert(record) {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        store.save(&archive.records())?;
        log::info!("{} tirages importés dans {}", inserted, store.describe());
        Ok((inserted, duplicates))
    }

    /// Complète l'archive avec les tirages finalisés manquants.
    ///
    /// Un tirage introuvable est ignoré et redemandé au prochain appel ;
    /// l'archive n'est réécrite que si au moins un tirage a été ajouté.
    pub fn update(&self, source: &dyn DrawSource) -> EngineResult<ArchiveUpdate> {
        let mut store = self.lock()?;
        let _file_lock = store.lock_exclusive()?;

        let records = store.load()?.ok_or_else(|| {
            log::error!("Aucune archive dans {}", store.describe());
            EngineError::ArchiveUnavailable
        })?;
        let mut archive = HistoricalArchive::from_records(records);
        log::debug!("{} tirages chargés depuis {}", archive.len(), store.describe());

        let mut report = UpdateReport {
            loaded: archive.len(),
            ..UpdateReport::default()
        };

        let current_round = match source.fetch_current_draw() {
            Ok(current) => current.round,
            Err(e) => {
                log::warn!("Tirage en cours indisponible, archive non rafraîchie : {:#}", e);
                return Ok(ArchiveUpdate { archive, report });
            }
        };
        let target_round = current_round.saturating_sub(1);
        let max_round = archive.max_round();
        let first_missing = max_round.saturating_add(1);
        report.current_round = Some(current_round);
        report.target_round = Some(target_round);
        log::debug!(
            "Tirage en cours {}, archive jusqu'à {}, cible {}",
            current_round, max_round, target_round
        );

        for round in first_missing..=target_round {
            let status = match fetch_checked(source, round) {
                Ok(record) => {
                    log::debug!("Tirage {} -> {:?}", round, record.winning_numbers);
                    archive.insert(record);
                    RoundStatus::Appended
                }
                Err(reason) => {
                    log::warn!("Tirage {} ignoré : {}", round, reason);
                    RoundStatus::Skipped { reason }
                }
            };
            report.outcomes.push(RoundOutcome { round, status });
        }

        let appended = report.appended().count();
        if appended == 0 {
            log::debug!("Aucun nouveau tirage à enregistrer");
            return Ok(ArchiveUpdate { archive, report });
        }

        match store.save(&archive.records()) {
            Ok(()) => {
                report.persisted = true;
                log::info!("{} tirages ajoutés à {}", appended, store.describe());
            }
            Err(e) => {
                log::warn!("Échec de l'écriture de {} : {:#}", store.describe(), e);
                report.persist_error = Some(format!("{:#}", e));
            }
        }

        Ok(ArchiveUpdate { archive, report })
    }

    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| EngineError::Other(anyhow!("Verrou de l'archive empoisonné")))
    }
}

fn fetch_checked(source: &dyn DrawSource, round: u32) -> Result<RoundRecord, String> {
    let record = source.fetch_round(round).map_err(|e| format!("{:#}", e))?;
    if record.round != round {
        return Err(format!("tirage {} reçu à la place de {}", record.round, round));
    }
    validate_record(&record).map_err(|e| format!("{:#}", e))?;
    Ok(record)
}
