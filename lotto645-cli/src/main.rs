mod analysis;
mod display;
mod import;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::analysis::{group_distribution, number_weights};
use crate::display::{
    display_current, display_group_distribution, display_import_summary,
    display_recommendation, display_rounds, display_selection, display_update_report,
    display_weights,
};
use crate::import::{read_csv, ImportResult};
use lotto645_db::db::ArchiveStore;
use lotto645_engine::archive::ArchiveManager;
use lotto645_engine::config::{EngineConfig, StoreKind};
use lotto645_engine::probability::{estimate_round, ProbabilityTable};
use lotto645_engine::recommend::PatternRecommender;
use lotto645_engine::sampler::Strategy;
use lotto645_engine::selector::{select_sorted, GroupSpec};
use lotto645_engine::source::{DrawSource, FeedDrawSource};
use lotto645_engine::EngineError;

type Manager = ArchiveManager<Box<dyn ArchiveStore>>;

#[derive(Parser)]
#[command(name = "lotto645", about = "Générateur de grilles Lotto 6/45")]
struct Cli {
    /// Fichier de configuration JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chemin de l'archive historique
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// Format de l'archive
    #[arg(long, global = true)]
    store: Option<StoreKind>,

    /// Flux JSON des résultats officiels
    #[arg(long, global = true)]
    feed: Option<PathBuf>,

    /// Journalisation détaillée
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer des tirages depuis un fichier CSV (tirage;n1..n6[;bonus])
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de l'archive
    Path,

    /// Lister les derniers tirages archivés
    History {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher les apparitions et poids par numéro
    Stats {
        /// Fenêtre pour la répartition par tranche (nombre de tirages)
        #[arg(short, long, default_value = "100")]
        window: usize,
    },

    /// Afficher le tirage en cours
    Current,

    /// Tirer une grille contrainte par tranches
    Select {
        /// Tranche à inclure (ex: 1-10), répétable
        #[arg(short, long = "group", required = true)]
        groups: Vec<GroupSpec>,

        /// Méthode de tirage
        #[arg(short, long, default_value = "weighted")]
        strategy: Strategy,

        /// Code de méthode historique (1 pondéré, 2 aléatoire, 3 inverse)
        #[arg(long, conflicts_with = "strategy")]
        method: Option<u8>,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compléter l'archive avec les tirages manquants
    Update,

    /// Recommander des motifs de tranches à partir de l'historique
    Recommend {
        /// Nombre de motifs proposés
        #[arg(short, long)]
        top: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli)?;
    let manager: Manager = ArchiveManager::new(config.open_store());

    match cli.command {
        Command::Import { file } => cmd_import(&manager, &file),
        Command::Path => {
            println!("{}", config.archive_path.display());
            Ok(())
        }
        Command::History { last } => cmd_history(&manager, last),
        Command::Stats { window } => cmd_stats(&manager, &config, window),
        Command::Current => cmd_current(&config),
        Command::Select {
            groups,
            strategy,
            method,
            seed,
        } => cmd_select(&config, &groups, strategy, method, seed),
        Command::Update => cmd_update(&manager, &config),
        Command::Recommend { top } => cmd_recommend(&manager, &config, top),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(archive) = &cli.archive {
        config.archive_path = archive.clone();
    }
    if let Some(store) = cli.store {
        config.store = store;
    }
    if let Some(feed) = &cli.feed {
        config.feed_path = feed.clone();
    }
    log::debug!("Configuration : {:?}", config);
    Ok(config)
}

fn open_feed(config: &EngineConfig) -> Result<FeedDrawSource> {
    FeedDrawSource::from_path(&config.feed_path)
        .context("Flux de résultats indisponible (option --feed)")
}

fn cmd_import(manager: &Manager, file: &PathBuf) -> Result<()> {
    let parsed = read_csv(file)?;
    let (inserted, skipped) = manager.seed(parsed.records)?;
    display_import_summary(&ImportResult {
        total_records: parsed.total_records,
        inserted: inserted as u32,
        skipped: skipped as u32,
        errors: parsed.errors,
    });
    Ok(())
}

fn cmd_history(manager: &Manager, last: usize) -> Result<()> {
    let archive = match manager.load() {
        Ok(archive) => archive,
        Err(EngineError::ArchiveUnavailable) => {
            println!("Archive vide. Lancez d'abord : lotto645 import");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    display_rounds(&archive.last_records(last));
    Ok(())
}

fn cmd_stats(manager: &Manager, config: &EngineConfig, window: usize) -> Result<()> {
    let source = open_feed(config)?;
    let counts = source.fetch_appearance_counts()?;
    let table = ProbabilityTable::from_appearance_counts(&counts);
    display_weights(&number_weights(&counts, &table), estimate_round(&counts));

    match manager.load() {
        Ok(archive) => {
            let effective_window = window.min(archive.len());
            display_group_distribution(&group_distribution(&archive, effective_window), effective_window);
        }
        Err(EngineError::ArchiveUnavailable) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn cmd_current(config: &EngineConfig) -> Result<()> {
    let source = open_feed(config)?;
    display_current(&source.fetch_current_draw()?);
    Ok(())
}

fn cmd_select(
    config: &EngineConfig,
    groups: &[GroupSpec],
    strategy: Strategy,
    method: Option<u8>,
    seed: Option<u64>,
) -> Result<()> {
    let strategy = match method {
        Some(code) => match Strategy::from_code(code) {
            Some(s) => s,
            None => bail!("Méthode {} inconnue (1, 2 ou 3)", code),
        },
        None => strategy,
    };

    let source = open_feed(config)?;
    let counts = source.fetch_appearance_counts()?;
    let table = ProbabilityTable::from_appearance_counts(&counts);

    let mut rng: StdRng = match seed.or(config.seed) {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let numbers = select_sorted(groups, &table, strategy, config.target, &mut rng)?;
    display_selection(&numbers, &strategy.to_string());
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn cmd_update(manager: &Manager, config: &EngineConfig) -> Result<()> {
    let source = open_feed(config)?;
    let pb = spinner("Mise à jour de l'archive...");
    let result = manager.update(&source);
    pb.finish_and_clear();

    let update = result?;
    display_update_report(&update.report);
    Ok(())
}

fn cmd_recommend(manager: &Manager, config: &EngineConfig, top: Option<usize>) -> Result<()> {
    let source = open_feed(config)?;
    let pb = spinner("Analyse de l'historique...");
    let result = PatternRecommender::new(manager, &source)
        .with_top_n(top.unwrap_or(config.top_n))
        .recommend();
    pb.finish_and_clear();

    let recommendation = result?;
    if recommendation.report.skipped().count() > 0 {
        display_update_report(&recommendation.report);
    }
    display_recommendation(&recommendation);
    Ok(())
}
