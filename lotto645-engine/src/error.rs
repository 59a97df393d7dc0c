use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Poids dégénérés : somme nulle ou poids négatif sur les candidats")]
    DegenerateWeights,

    #[error("Candidats insuffisants : {requested} demandés, {available} disponibles")]
    InsufficientCandidates { requested: usize, available: usize },

    #[error("Aucune archive historique disponible. Lancez d'abord : lotto645 import")]
    ArchiveUnavailable,

    #[error("Impossible d'obtenir les numéros du tirage précédent ({round})")]
    PreviousRoundUnavailable { round: u32 },

    #[error("Source de tirages indisponible : {0}")]
    Source(anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
