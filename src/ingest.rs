//! Loading of per-country match data from CSV.

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const SEASON: &str = "Temporada";
pub const MATCHDAY: &str = "Jornada";
pub const HOME: &str = "Local";
pub const AWAY: &str = "Visitante";
pub const HOME_GOALS: &str = "Local_gol";
pub const AWAY_GOALS: &str = "Visitante_gol";

/// Columns a match file must carry. Any further columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 6] = [SEASON, MATCHDAY, HOME, AWAY, HOME_GOALS, AWAY_GOALS];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: {source}")]
    Record { line: u64, source: csv::Error },
}

/// A single match, as it appears in the source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "Temporada")]
    pub season: String,

    #[serde(rename = "Jornada")]
    pub matchday: u32,

    #[serde(rename = "Local")]
    pub home: String,

    #[serde(rename = "Visitante")]
    pub away: String,

    /// Dot-delimited goal minutes of the home side, e.g., `"12.78.-"`.
    #[serde(rename = "Local_gol", default)]
    pub home_goals: String,

    #[serde(rename = "Visitante_gol", default)]
    pub away_goals: String,
}

/// Reads all match records from the CSV file at `path`.
pub fn load_matches(path: impl AsRef<Path>) -> Result<Vec<MatchRecord>, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let matches = read_matches(file)?;
    debug!("read {} matches from {}", matches.len(), path.display());
    Ok(matches)
}

/// Reads all match records from a CSV source with a header row.
pub fn read_matches(reader: impl Read) -> Result<Vec<MatchRecord>, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    validate_headers(&headers)?;

    let mut matches = vec![];
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();
        let parsed = record
            .deserialize::<MatchRecord>(Some(&headers))
            .map_err(|source| IngestError::Record { line, source })?;
        matches.push(parsed);
    }
    Ok(matches)
}

fn validate_headers(headers: &StringRecord) -> Result<(), IngestError> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(IngestError::MissingColumn(column));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_records() {
        let csv = "\
Temporada,Jornada,Local,Visitante,Local_gol,Visitante_gol,Estadio
2020,1,PSG,Lyon,10.50.-,-,Parc des Princes
2020, 2 ,Lyon,PSG,-,60.-,Groupama
";
        let matches = read_matches(csv.as_bytes()).unwrap();
        assert_eq!(
            vec![
                MatchRecord {
                    season: "2020".into(),
                    matchday: 1,
                    home: "PSG".into(),
                    away: "Lyon".into(),
                    home_goals: "10.50.-".into(),
                    away_goals: "-".into(),
                },
                MatchRecord {
                    season: "2020".into(),
                    matchday: 2,
                    home: "Lyon".into(),
                    away: "PSG".into(),
                    home_goals: "-".into(),
                    away_goals: "60.-".into(),
                },
            ],
            matches
        );
    }

    #[test]
    fn quoted_fields() {
        let csv = "\
Temporada,Jornada,Local,Visitante,Local_gol,Visitante_gol
\"2019/2020\",38,\"Paris, SG\",Nice,,-
";
        let matches = read_matches(csv.as_bytes()).unwrap();
        assert_eq!("2019/2020", matches[0].season);
        assert_eq!("Paris, SG", matches[0].home);
        assert_eq!("", matches[0].home_goals);
    }

    #[test]
    fn missing_column() {
        let csv = "Temporada,Jornada,Local,Visitante,Local_gol\n2020,1,PSG,Lyon,-\n";
        let err = read_matches(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(column) if column == AWAY_GOALS));
        assert_eq!("missing column 'Visitante_gol'", err.to_string());
    }

    #[test]
    fn malformed_matchday() {
        let csv = "\
Temporada,Jornada,Local,Visitante,Local_gol,Visitante_gol
2020,1,PSG,Lyon,-,-
2020,uno,Lyon,PSG,-,-
";
        let err = read_matches(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::Record { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn missing_file() {
        let err = load_matches("no/such/file.csv").unwrap_err();
        assert!(matches!(err, IngestError::Open { .. }));
    }
}
