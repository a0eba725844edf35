// SQLite persistence for derived league state and standings.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridiron_core::division::Division;
use gridiron_core::franchise::FranchiseId;
use gridiron_core::game::{Game, GameRecords, WinLoss};
use gridiron_core::ledger::{Contract, Pick, PickStatus, PlayerId, RfaRight};
use gridiron_core::replay::{CashBalance, LeagueSnapshot};
use gridiron_core::season::Season;
use gridiron_core::standings::{PlayoffFinish, Standings, StandingsEntry};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

/// SQLite-backed store for per-season snapshots (contracts, RFA rights,
/// picks, cash), standings, weekly game records and key-value run state.
///
/// Every season is written as a full replacement: its previous rows are
/// deleted and the new set inserted in one transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contracts (
                season     INTEGER NOT NULL,
                player     TEXT NOT NULL,
                franchise  INTEGER NOT NULL,
                salary     INTEGER NOT NULL,
                start_year INTEGER,
                end_year   INTEGER NOT NULL,
                signed_at  TEXT NOT NULL,
                PRIMARY KEY (season, player)
            );

            CREATE TABLE IF NOT EXISTS rfa_rights (
                season        INTEGER NOT NULL,
                player        TEXT NOT NULL,
                franchise     INTEGER NOT NULL,
                rights_season INTEGER NOT NULL,
                converted_at  TEXT NOT NULL,
                PRIMARY KEY (season, player)
            );

            CREATE TABLE IF NOT EXISTS picks (
                season             INTEGER NOT NULL,
                draft_season       INTEGER NOT NULL,
                round              INTEGER NOT NULL,
                original_franchise INTEGER NOT NULL,
                current_franchise  INTEGER NOT NULL,
                status             TEXT NOT NULL,
                PRIMARY KEY (season, draft_season, round, original_franchise)
            );

            CREATE TABLE IF NOT EXISTS cash (
                season      INTEGER NOT NULL,
                franchise   INTEGER NOT NULL,
                cash_season INTEGER NOT NULL,
                amount      INTEGER NOT NULL,
                PRIMARY KEY (season, franchise, cash_season)
            );

            CREATE TABLE IF NOT EXISTS standings (
                season         INTEGER NOT NULL,
                rank           INTEGER NOT NULL,
                franchise      INTEGER NOT NULL,
                name           TEXT,
                wins           INTEGER NOT NULL,
                losses         INTEGER NOT NULL,
                ties           INTEGER NOT NULL,
                points_for     REAL NOT NULL,
                points_against REAL NOT NULL,
                all_play_wins   INTEGER NOT NULL,
                all_play_losses INTEGER NOT NULL,
                all_play_ties   INTEGER NOT NULL,
                stern_wins      INTEGER NOT NULL,
                stern_losses    INTEGER NOT NULL,
                stern_ties      INTEGER NOT NULL,
                division       TEXT,
                seed           INTEGER,
                finish         TEXT,
                PRIMARY KEY (season, franchise)
            );

            CREATE TABLE IF NOT EXISTS game_records (
                season    INTEGER NOT NULL,
                week      INTEGER NOT NULL,
                franchise INTEGER NOT NULL,
                records   TEXT NOT NULL,
                PRIMARY KEY (season, week, franchise)
            );

            CREATE TABLE IF NOT EXISTS run_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Replace everything stored for `snapshot.season` with `snapshot`.
    pub fn replace_snapshot(&self, snapshot: &LeagueSnapshot) -> Result<()> {
        let season = snapshot.season;
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin snapshot transaction")?;

        for table in ["contracts", "rfa_rights", "picks", "cash"] {
            tx.execute(&format!("DELETE FROM {table} WHERE season = ?1"), params![season])
                .with_context(|| format!("failed to clear {table} for {season}"))?;
        }

        for c in &snapshot.contracts {
            tx.execute(
                "INSERT INTO contracts
                    (season, player, franchise, salary, start_year, end_year, signed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    season,
                    c.player.as_str(),
                    c.franchise.slot(),
                    c.salary,
                    c.start_year,
                    c.end_year,
                    c.signed_at.to_rfc3339(),
                ],
            )
            .context("failed to insert contract")?;
        }

        for r in &snapshot.rfa_rights {
            tx.execute(
                "INSERT INTO rfa_rights (season, player, franchise, rights_season, converted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    season,
                    r.player.as_str(),
                    r.franchise.slot(),
                    r.season,
                    r.converted_at.to_rfc3339(),
                ],
            )
            .context("failed to insert RFA right")?;
        }

        for p in &snapshot.picks {
            tx.execute(
                "INSERT INTO picks
                    (season, draft_season, round, original_franchise, current_franchise, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    season,
                    p.season,
                    p.round,
                    p.original_franchise.slot(),
                    p.current_franchise.slot(),
                    p.status.as_str(),
                ],
            )
            .context("failed to insert pick")?;
        }

        for c in &snapshot.cash {
            tx.execute(
                "INSERT INTO cash (season, franchise, cash_season, amount)
                 VALUES (?1, ?2, ?3, ?4)",
                params![season, c.franchise.slot(), c.season, c.amount],
            )
            .context("failed to insert cash balance")?;
        }

        tx.commit().context("failed to commit snapshot")?;
        Ok(())
    }

    pub fn load_contracts(&self, season: Season) -> Result<Vec<Contract>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player, franchise, salary, start_year, end_year, signed_at
                 FROM contracts WHERE season = ?1 ORDER BY player",
            )
            .context("failed to prepare load_contracts query")?;
        let contracts = stmt
            .query_map(params![season], |row| {
                Ok(Contract {
                    player: PlayerId::new(row.get::<_, String>(0)?),
                    franchise: franchise_at(row, 1)?,
                    salary: row.get(2)?,
                    start_year: row.get(3)?,
                    end_year: row.get(4)?,
                    signed_at: timestamp_at(row, 5)?,
                })
            })
            .context("failed to query contracts")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map contract rows")?;
        Ok(contracts)
    }

    pub fn load_rfa_rights(&self, season: Season) -> Result<Vec<RfaRight>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player, franchise, rights_season, converted_at
                 FROM rfa_rights WHERE season = ?1 ORDER BY player",
            )
            .context("failed to prepare load_rfa_rights query")?;
        let rights = stmt
            .query_map(params![season], |row| {
                Ok(RfaRight {
                    player: PlayerId::new(row.get::<_, String>(0)?),
                    franchise: franchise_at(row, 1)?,
                    season: row.get(2)?,
                    converted_at: timestamp_at(row, 3)?,
                })
            })
            .context("failed to query RFA rights")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map RFA right rows")?;
        Ok(rights)
    }

    pub fn load_picks(&self, season: Season) -> Result<Vec<Pick>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT draft_season, round, original_franchise, current_franchise, status
                 FROM picks WHERE season = ?1
                 ORDER BY draft_season, round, original_franchise",
            )
            .context("failed to prepare load_picks query")?;
        let picks = stmt
            .query_map(params![season], |row| {
                let status: String = row.get(4)?;
                Ok(Pick {
                    season: row.get(0)?,
                    round: row.get(1)?,
                    original_franchise: franchise_at(row, 2)?,
                    current_franchise: franchise_at(row, 3)?,
                    status: PickStatus::from_str_status(&status)
                        .ok_or_else(|| conversion_error(4, format!("unknown pick status '{status}'")))?,
                })
            })
            .context("failed to query picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pick rows")?;
        Ok(picks)
    }

    pub fn load_cash(&self, season: Season) -> Result<Vec<CashBalance>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT franchise, cash_season, amount
                 FROM cash WHERE season = ?1 ORDER BY franchise, cash_season",
            )
            .context("failed to prepare load_cash query")?;
        let cash = stmt
            .query_map(params![season], |row| {
                Ok(CashBalance {
                    franchise: franchise_at(row, 0)?,
                    season: row.get(1)?,
                    amount: row.get(2)?,
                })
            })
            .context("failed to query cash balances")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map cash rows")?;
        Ok(cash)
    }

    /// Rebuild a stored snapshot. `None` when nothing has been written for
    /// the season.
    pub fn load_snapshot(&self, season: Season) -> Result<Option<LeagueSnapshot>> {
        let snapshot = LeagueSnapshot {
            season,
            contracts: self.load_contracts(season)?,
            rfa_rights: self.load_rfa_rights(season)?,
            picks: self.load_picks(season)?,
            cash: self.load_cash(season)?,
        };
        let empty = snapshot.contracts.is_empty()
            && snapshot.rfa_rights.is_empty()
            && snapshot.picks.is_empty()
            && snapshot.cash.is_empty();
        Ok((!empty).then_some(snapshot))
    }

    // ------------------------------------------------------------------
    // Standings
    // ------------------------------------------------------------------

    /// Replace the stored standings for `standings.season`.
    pub fn replace_standings(&self, standings: &Standings) -> Result<()> {
        let season = standings.season;
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin standings transaction")?;

        tx.execute("DELETE FROM standings WHERE season = ?1", params![season])
            .with_context(|| format!("failed to clear standings for {season}"))?;

        for e in &standings.entries {
            tx.execute(
                "INSERT INTO standings
                    (season, rank, franchise, name, wins, losses, ties, points_for, points_against,
                     all_play_wins, all_play_losses, all_play_ties,
                     stern_wins, stern_losses, stern_ties, division, seed, finish)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    season,
                    e.rank,
                    e.franchise.slot(),
                    e.name,
                    e.record.wins,
                    e.record.losses,
                    e.record.ties,
                    e.points_for,
                    e.points_against,
                    e.all_play.wins,
                    e.all_play.losses,
                    e.all_play.ties,
                    e.stern.wins,
                    e.stern.losses,
                    e.stern.ties,
                    e.division.map(division_str),
                    e.seed,
                    e.finish.map(PlayoffFinish::as_str),
                ],
            )
            .context("failed to insert standings row")?;
        }

        tx.commit().context("failed to commit standings")?;
        Ok(())
    }

    /// Stored standings rows for `season`, in rank order.
    pub fn load_standings(&self, season: Season) -> Result<Vec<StandingsEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT rank, franchise, name, wins, losses, ties, points_for, points_against,
                        all_play_wins, all_play_losses, all_play_ties,
                        stern_wins, stern_losses, stern_ties, division, seed, finish
                 FROM standings WHERE season = ?1 ORDER BY rank",
            )
            .context("failed to prepare load_standings query")?;
        let entries = stmt
            .query_map(params![season], |row| {
                let division: Option<String> = row.get(14)?;
                let finish: Option<String> = row.get(16)?;
                Ok(StandingsEntry {
                    rank: row.get(0)?,
                    franchise: franchise_at(row, 1)?,
                    name: row.get(2)?,
                    record: WinLoss::new(row.get(3)?, row.get(4)?, row.get(5)?),
                    points_for: row.get(6)?,
                    points_against: row.get(7)?,
                    all_play: WinLoss::new(row.get(8)?, row.get(9)?, row.get(10)?),
                    stern: WinLoss::new(row.get(11)?, row.get(12)?, row.get(13)?),
                    division: division
                        .map(|d| {
                            parse_division(&d)
                                .ok_or_else(|| conversion_error(14, format!("unknown division '{d}'")))
                        })
                        .transpose()?,
                    seed: row.get(15)?,
                    finish: finish
                        .map(|f| {
                            PlayoffFinish::from_str_finish(&f)
                                .ok_or_else(|| conversion_error(16, format!("unknown finish '{f}'")))
                        })
                        .transpose()?,
                })
            })
            .context("failed to query standings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map standings rows")?;
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Weekly game records
    // ------------------------------------------------------------------

    /// Replace the stored weekly records for `season` with those carried by
    /// `games`. Sides without records are skipped.
    pub fn replace_game_records(&self, season: Season, games: &[Game]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin game records transaction")?;

        tx.execute("DELETE FROM game_records WHERE season = ?1", params![season])
            .with_context(|| format!("failed to clear game records for {season}"))?;

        for game in games.iter().filter(|g| g.season == season) {
            for side in [&game.away, &game.home] {
                let Some(records) = side.records else {
                    continue;
                };
                let json_str =
                    serde_json::to_string(&records).context("failed to serialize game records")?;
                tx.execute(
                    "INSERT OR REPLACE INTO game_records (season, week, franchise, records)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![season, game.week, side.franchise.slot(), json_str],
                )
                .context("failed to insert game records row")?;
            }
        }

        tx.commit().context("failed to commit game records")?;
        Ok(())
    }

    /// Stored weekly records for `season`, ordered by week then franchise.
    pub fn load_game_records(
        &self,
        season: Season,
    ) -> Result<Vec<(u8, FranchiseId, GameRecords)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT week, franchise, records FROM game_records
                 WHERE season = ?1 ORDER BY week, franchise",
            )
            .context("failed to prepare load_game_records query")?;
        let rows = stmt
            .query_map(params![season], |row| {
                let json_str: String = row.get(2)?;
                let records: GameRecords = serde_json::from_str(&json_str)
                    .map_err(|e| conversion_error(2, e.to_string()))?;
                Ok((row.get(0)?, franchise_at(row, 1)?, records))
            })
            .context("failed to query game records")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game records rows")?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Run state and maintenance
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`, overwriting any previous
    /// value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO run_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM run_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query run state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Delete every derived row and the run state.
    pub fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for table in [
            "contracts",
            "rfa_rights",
            "picks",
            "cash",
            "standings",
            "game_records",
            "run_state",
        ] {
            tx.execute(&format!("DELETE FROM {table}"), [])
                .with_context(|| format!("failed to clear {table}"))?;
        }
        tx.commit().context("failed to commit clear_all")?;
        Ok(())
    }

    /// Number of rows stored for `season` in `table`.
    pub fn row_count(&self, table: &str, season: Season) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE season = ?1"),
                params![season],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to count {table} rows"))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn franchise_at(row: &Row<'_>, column: usize) -> rusqlite::Result<FranchiseId> {
    let slot: u8 = row.get(column)?;
    FranchiseId::new(slot).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            format!("franchise slot {slot} out of range").into(),
        )
    })
}

fn timestamp_at(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn division_str(division: Division) -> &'static str {
    match division {
        Division::East => "east",
        Division::West => "west",
    }
}

fn parse_division(s: &str) -> Option<Division> {
    match s {
        "east" => Some(Division::East),
        "west" => Some(Division::West),
        _ => None,
    }
}
