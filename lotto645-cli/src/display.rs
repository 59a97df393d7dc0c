use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::analysis::{NumberWeight, WeightTag};
use crate::import::ImportResult;
use lotto645_db::models::{CurrentDraw, GroupRange, RoundRecord};
use lotto645_engine::archive::{RoundStatus, UpdateReport};
use lotto645_engine::recommend::Recommendation;

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_rounds(records: &[RoundRecord]) {
    if records.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tirage", "Numéros (ordre de sortie)", "Bonus", "Motif"]);

    for record in records {
        let bonus = record
            .bonus
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            &record.round.to_string(),
            &join_numbers(&record.winning_numbers),
            &bonus,
            &record.pattern().to_string(),
        ]);
    }

    println!("{table}");
}

pub fn display_current(current: &CurrentDraw) {
    println!("Tirage en cours : {}", current.round);
    println!("  Numéros : {}", join_numbers(&current.winning_numbers));
    println!("  Bonus   : {}", current.bonus);
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_weights(rows: &[NumberWeight], estimated_round: u32) {
    println!("\n📊 Apparitions par numéro (tirage estimé : {})\n", estimated_round);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Numéro", "Tranche", "Apparitions", "Poids", "Tag"]);

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));

    for row in &sorted {
        let color = match row.tag {
            WeightTag::Hot => Color::Green,
            WeightTag::Cold => Color::Red,
            WeightTag::Normal => Color::White,
        };
        let group = GroupRange::of(row.number)
            .map(|g| g.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(format!("{:2}", row.number)),
            Cell::new(group),
            Cell::new(row.count.to_string()),
            Cell::new(format!("{:.4}", row.weight)),
            Cell::new(row.tag.to_string()).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn display_group_distribution(totals: &[u32; 5], window: usize) {
    println!("\n── Répartition par tranche ({} derniers tirages) ──", window);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tranche", "Numéros sortis"]);
    for (group, total) in GroupRange::ALL.iter().zip(totals.iter()) {
        table.add_row(vec![group.to_string(), total.to_string()]);
    }
    println!("{table}");
}

pub fn display_selection(numbers: &[u8], strategy: &str) {
    println!("\n🎲 Numéros proposés ({strategy})\n");
    if numbers.is_empty() {
        println!("Aucune tranche valide sélectionnée.");
        return;
    }
    println!("  {}", join_numbers(numbers));
    if numbers.len() < 6 {
        println!("  ({} numéros seulement : tranches épuisées)", numbers.len());
    }
}

pub fn display_update_report(report: &UpdateReport) {
    match (report.current_round, report.target_round) {
        (Some(current), Some(target)) => {
            println!("Tirage en cours : {}, archive complétée jusqu'à {}", current, target);
        }
        _ => println!("Tirage en cours indisponible : archive non rafraîchie."),
    }
    println!("  Tirages chargés : {}", report.loaded);

    if report.outcomes.is_empty() {
        println!("  Archive déjà à jour.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tirage", "Résultat"]);
    for outcome in &report.outcomes {
        let (label, color) = match &outcome.status {
            RoundStatus::Appended => ("ajouté".to_string(), Color::Green),
            RoundStatus::Skipped { reason } => (format!("ignoré : {}", reason), Color::Red),
        };
        table.add_row(vec![
            Cell::new(outcome.round.to_string()),
            Cell::new(label).fg(color),
        ]);
    }
    println!("{table}");

    if report.persisted {
        println!("  Archive enregistrée ({} ajout(s)).", report.appended().count());
    } else if let Some(err) = &report.persist_error {
        println!("  ⚠ Archive non enregistrée : {}", err);
    }
}

pub fn display_recommendation(recommendation: &Recommendation) {
    println!(
        "\n🎯 Tirage précédent {} : {} (motif {})\n",
        recommendation.previous_round,
        join_numbers(&recommendation.previous_numbers),
        recommendation.previous_pattern
    );

    if recommendation.candidates.is_empty() {
        println!("Aucun tirage passé ne reproduit ce motif.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Motif suivant", "Occurrences"]);

    for (i, candidate) in recommendation.candidates.iter().enumerate() {
        table.add_row(vec![
            &format!("{}", i + 1),
            &candidate.pattern.to_string(),
            &candidate.occurrences.to_string(),
        ]);
    }
    println!("{table}");
}
