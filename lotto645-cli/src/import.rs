use anyhow::{Context, Result};
use std::path::Path;

use lotto645_db::models::{validate_record, RoundRecord};

/// Une ligne : `tirage;n1;n2;n3;n4;n5;n6[;bonus]`.
fn parse_record(record: &csv::StringRecord) -> Result<RoundRecord> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let raw_round = get(0)?;
    let round = raw_round
        .parse::<u32>()
        .with_context(|| format!("Numéro de tirage invalide: '{}'", raw_round))?;

    let winning_numbers: [u8; 6] = [
        get_u8(1)?,
        get_u8(2)?,
        get_u8(3)?,
        get_u8(4)?,
        get_u8(5)?,
        get_u8(6)?,
    ];

    let bonus = match record.get(7).map(str::trim) {
        Some(s) if !s.is_empty() => Some(get_u8(7)?),
        _ => None,
    };

    let parsed = RoundRecord {
        round,
        winning_numbers,
        bonus,
    };
    validate_record(&parsed)?;
    Ok(parsed)
}

pub struct ParsedImport {
    pub records: Vec<RoundRecord>,
    pub total_records: u32,
    pub errors: u32,
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn read_csv(path: &Path) -> Result<ParsedImport> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let mut result = ParsedImport {
        records: Vec::new(),
        total_records: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => match parse_record(&record) {
                Ok(parsed) => result.records.push(parsed),
                Err(e) => {
                    log::warn!("Erreur parsing ligne {}: {:#}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::warn!("Erreur lecture ligne {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_csv_with_and_without_bonus() {
        let (_dir, path) = write_csv("round;n1;n2;n3;n4;n5;n6;bonus\n1;10;23;29;33;37;40;16\n2;9;13;21;25;32;42\n");
        let parsed = read_csv(&path).unwrap();
        assert_eq!(parsed.total_records, 2);
        assert_eq!(parsed.errors, 0);
        assert_eq!(parsed.records[0], RoundRecord::new(1, [10, 23, 29, 33, 37, 40]).with_bonus(16));
        assert_eq!(parsed.records[1].bonus, None);
    }

    #[test]
    fn test_read_csv_counts_bad_lines() {
        let (_dir, path) = write_csv("round;n1;n2;n3;n4;n5;n6\n1;1;1;2;3;4;5\nx;1;2;3;4;5;6\n3;1;2;3;4;5\n4;1;2;3;4;5;46\n5;1;2;3;4;5;6\n");
        let parsed = read_csv(&path).unwrap();
        assert_eq!(parsed.total_records, 5);
        assert_eq!(parsed.errors, 4);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].round, 5);
    }

    #[test]
    fn test_read_csv_missing_file() {
        assert!(read_csv(Path::new("/nonexistent/rounds.csv")).is_err());
    }
}
