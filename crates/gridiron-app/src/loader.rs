// Input loading: the transaction log (JSON) and the game list (CSV).
//
// Individual malformed records are skipped with a warning and remembered as
// rejections so the runner can report which seasons had bad input. Only a
// file that cannot be read or parsed at all is an error.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use gridiron_core::franchise::FranchiseId;
use gridiron_core::game::{Game, GameSide, GameType};
use gridiron_core::ledger::{Transaction, TransactionLog};
use gridiron_core::season::{Season, SeasonRules};
use serde::Deserialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error and result types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// A record that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Zero-based position in the input.
    pub index: usize,
    /// Season of the record, when it could be read.
    pub season: Option<Season>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub rejected: Vec<Rejection>,
}

impl<T> Loaded<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Seasons with at least one rejected record.
    pub fn failed_seasons(&self) -> BTreeSet<Season> {
        self.rejected.iter().filter_map(|r| r.season).collect()
    }

    /// Whether some rejected record could not even be tied to a season.
    pub fn has_unattributed_rejections(&self) -> bool {
        self.rejected.iter().any(|r| r.season.is_none())
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

fn load_transactions_from_reader<R: Read>(
    rdr: R,
) -> Result<Loaded<Transaction>, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_reader(rdr)?;
    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (index, value) in raw.into_iter().enumerate() {
        let season = value
            .get("season")
            .and_then(serde_json::Value::as_u64)
            .and_then(|s| Season::try_from(s).ok());
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        let player = value
            .get("player")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        match serde_json::from_value::<Transaction>(value) {
            Ok(tx) => records.push(tx),
            Err(e) => {
                warn!(
                    "skipping malformed transaction #{} (season {}, type {}, player {}): {}",
                    index,
                    season.map_or_else(|| "?".to_string(), |s| s.to_string()),
                    kind,
                    player.as_deref().unwrap_or("-"),
                    e
                );
                rejected.push(Rejection {
                    index,
                    season,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(Loaded { records, rejected })
}

/// Load the transaction log from a JSON array file.
pub fn load_transactions(path: &Path) -> Result<Loaded<Transaction>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_transactions_from_reader(file).map_err(|e| LoadError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

/// Build the replay log from loaded transactions, adding the RFA
/// conversions implied by contract expiries under each season's rules.
pub fn transaction_log<F>(loaded: &Loaded<Transaction>, rules_for: F) -> TransactionLog
where
    F: Fn(Season) -> SeasonRules,
{
    TransactionLog::new(loaded.records.clone()).with_expiry_conversions_under(rules_for)
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

/// One game per CSV row, away side then home side.
#[derive(Debug, Deserialize)]
struct RawGame {
    season: Season,
    week: u8,
    #[serde(rename = "type")]
    kind: String,
    away_franchise: u8,
    #[serde(default)]
    away_name: Option<String>,
    #[serde(default)]
    away_score: Option<f64>,
    home_franchise: u8,
    #[serde(default)]
    home_name: Option<String>,
    #[serde(default)]
    home_score: Option<f64>,
}

fn side(franchise: u8, name: Option<String>, score: Option<f64>) -> Result<GameSide, String> {
    let franchise =
        FranchiseId::new(franchise).ok_or_else(|| format!("franchise {franchise} out of range"))?;
    if let Some(score) = score {
        if !score.is_finite() {
            return Err(format!("non-finite score for franchise {franchise}"));
        }
    }
    let mut side = GameSide::new(franchise, score);
    side.name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    Ok(side)
}

fn game_from_raw(raw: RawGame) -> Result<Game, String> {
    let kind =
        GameType::from_str_type(&raw.kind).ok_or_else(|| format!("unknown game type '{}'", raw.kind))?;
    let away = side(raw.away_franchise, raw.away_name, raw.away_score)?;
    let home = side(raw.home_franchise, raw.home_name, raw.home_score)?;
    if away.franchise == home.franchise {
        return Err(format!("franchise {} plays itself", away.franchise));
    }
    Ok(Game {
        season: raw.season,
        week: raw.week,
        kind,
        away,
        home,
    })
}

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Loaded<Game>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader.headers()?.clone();
    let season_column = headers.iter().position(|h| h == "season");

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!("skipping unreadable game row #{}: {}", index, e);
                rejected.push(Rejection {
                    index,
                    season: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let season = season_column
            .and_then(|i| row.get(i))
            .and_then(|s| s.parse::<Season>().ok());
        let parsed = row
            .deserialize::<RawGame>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(game_from_raw);
        match parsed {
            Ok(game) => records.push(game),
            Err(reason) => {
                warn!(
                    "skipping malformed game row #{} (season {}): {}",
                    index,
                    season.map_or_else(|| "?".to_string(), |s| s.to_string()),
                    reason
                );
                rejected.push(Rejection {
                    index,
                    season,
                    reason,
                });
            }
        }
    }
    Ok(Loaded { records, rejected })
}

/// Load the game list from a CSV file. A file without a single valid game
/// is an error.
pub fn load_games(path: &Path) -> Result<Loaded<Game>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let loaded = load_games_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if loaded.records.is_empty() {
        return Err(LoadError::Validation(format!(
            "{} produced zero valid games",
            path.display()
        )));
    }
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::ledger::TransactionKind;

    const GAMES_HEADER: &str =
        "season,week,type,away_franchise,away_name,away_score,home_franchise,home_name,home_score";

    #[test]
    fn transactions_load_and_skip_malformed() {
        let json = r#"[
            { "type": "contract", "timestamp": "2022-08-20T19:00:00Z", "season": 2022,
              "player": "4034", "franchise": 3, "salary": 27, "start_year": 2022, "end_year": 2024 },
            { "type": "contract", "timestamp": "not a time", "season": 2021, "player": "77",
              "franchise": 3, "salary": 1, "end_year": 2021 },
            { "type": "fa", "timestamp": "2022-10-04T09:00:00Z", "season": 2022,
              "franchise": "Keyon", "adds": [{ "player": "8150" }] },
            { "type": "waiver-claim", "timestamp": "2022-10-04T09:00:00Z" }
        ]"#;
        let loaded = load_transactions_from_reader(json.as_bytes()).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].kind.label(), "contract");
        assert!(matches!(loaded.records[1].kind, TransactionKind::Fa(_)));

        assert!(!loaded.is_clean());
        assert_eq!(loaded.rejected.len(), 2);
        assert_eq!(loaded.rejected[0].index, 1);
        assert_eq!(loaded.failed_seasons(), BTreeSet::from([2021]));
        assert!(loaded.has_unattributed_rejections());
    }

    #[test]
    fn transactions_not_an_array_is_an_error() {
        assert!(load_transactions_from_reader(r#"{ "type": "fa" }"#.as_bytes()).is_err());
    }

    #[test]
    fn transaction_log_adds_expiry_conversions() {
        let json = r#"[
            { "type": "contract-expiry", "timestamp": "2022-12-31T00:00:00Z", "season": 2022,
              "player": "4034", "franchise": 3, "start_year": 2020 }
        ]"#;
        let loaded = load_transactions_from_reader(json.as_bytes()).unwrap();
        let log = transaction_log(&loaded, SeasonRules::for_season);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn games_csv_roundtrip() {
        let csv_data = format!(
            "{GAMES_HEADER}\n\
             2022,1,regular,1,Keyon,120.5,2,Luke,99.25\n\
             2022,16,championship,3,,,4,,\n"
        );
        let loaded = load_games_from_reader(csv_data.as_bytes()).unwrap();
        assert!(loaded.is_clean());
        assert_eq!(loaded.records.len(), 2);

        let first = &loaded.records[0];
        assert_eq!(first.kind, GameType::Regular);
        assert_eq!(first.away.name.as_deref(), Some("Keyon"));
        assert_eq!(first.home.score, Some(99.25));

        let last = &loaded.records[1];
        assert_eq!(last.kind, GameType::Championship);
        assert!(!last.is_played());
        assert_eq!(last.away.name, None);
    }

    #[test]
    fn games_csv_skips_bad_rows_with_season() {
        let csv_data = format!(
            "{GAMES_HEADER}\n\
             2019,1,regular,1,,100,2,,90\n\
             2019,2,bye,1,,100,2,,90\n\
             2020,1,regular,13,,100,2,,90\n\
             2020,1,regular,5,,100,5,,90\n\
             twenty,1,regular,1,,100,2,,90\n"
        );
        let loaded = load_games_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.rejected.len(), 4);
        assert_eq!(loaded.failed_seasons(), BTreeSet::from([2019, 2020]));
        assert!(loaded.has_unattributed_rejections());
    }

    #[test]
    fn games_csv_skips_ragged_rows() {
        let csv_data = format!(
            "{GAMES_HEADER}\n\
             2021,1,regular,1,,100,2,,90\n\
             2021,2,regular,3,,100\n\
             2021,3,regular,4,,88.5,5,,91\n"
        );
        let loaded = load_games_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].week, 3);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].index, 1);
        assert!(loaded.has_unattributed_rejections());
    }

    #[test]
    fn load_games_missing_file_is_io_error() {
        let err = load_games(Path::new("/nonexistent/games.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
