// Batch runner: load inputs, rebuild every selected season, persist the
// results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use gridiron_core::game::Game;
use gridiron_core::ledger::TransactionLog;
use gridiron_core::records;
use gridiron_core::replay::Replayer;
use gridiron_core::season::Season;
use gridiron_core::standings::{self, Standings};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::loader::{self, Loaded};

/// Command-line choices for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Restrict the run to one season. `None` processes every configured
    /// season.
    pub season: Option<Season>,
    /// Wipe all previously derived rows before writing.
    pub clear: bool,
}

/// Outcome of a run, used for logging and the exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Seasons whose snapshot was written.
    pub snapshots: Vec<Season>,
    /// Seasons whose standings were written.
    pub standings: Vec<Season>,
    /// Seasons with at least one record that could not be parsed.
    pub failed_seasons: BTreeSet<Season>,
    /// A skipped record could not be tied to any season.
    pub unattributed_rejections: bool,
    /// Input files that could not be loaded at all.
    pub fatal: Vec<String>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_seasons.is_empty() && !self.unattributed_rejections && self.fatal.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }

    fn note_rejections<T>(&mut self, loaded: &Loaded<T>) {
        self.failed_seasons.extend(loaded.failed_seasons());
        self.unattributed_rejections |= loaded.has_unattributed_rejections();
    }
}

/// Seasons selected by `options`, in ascending order.
pub fn selected_seasons(config: &Config, options: &RunOptions) -> Vec<Season> {
    match options.season {
        Some(season) => {
            if !config.seasons().contains(&season) {
                warn!(
                    "season {} is outside the configured range {}-{}",
                    season, config.league.first_season, config.league.current_season
                );
            }
            vec![season]
        }
        None => config.seasons().collect(),
    }
}

/// Run the whole pipeline against `db`.
///
/// Bad records are skipped and reported through the summary. A missing or
/// unreadable input file stops only the part of the run that needs it: no
/// snapshots without transactions, no standings without games.
pub async fn run(config: &Config, db: &Database, options: &RunOptions) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let seasons = selected_seasons(config, options);
    info!("Processing {} season(s)", seasons.len());

    if options.clear {
        db.clear_all().context("failed to clear derived state")?;
        info!("Cleared previously derived state");
    }

    // Ledger snapshots
    match loader::load_transactions(Path::new(&config.data_paths.transactions)) {
        Ok(loaded) => {
            summary.note_rejections(&loaded);
            info!(
                "Loaded {} transactions ({} skipped)",
                loaded.records.len(),
                loaded.rejected.len()
            );
            let log = loader::transaction_log(&loaded, |season| config.season_rules(season));
            write_snapshots(config, db, &log, &seasons, &mut summary)?;
        }
        Err(e) => {
            error!("Transactions unavailable, no snapshots written: {e}");
            summary.fatal.push(e.to_string());
        }
    }

    // Standings
    match loader::load_games(Path::new(&config.data_paths.games)) {
        Ok(loaded) => {
            summary.note_rejections(&loaded);
            info!(
                "Loaded {} games ({} skipped)",
                loaded.records.len(),
                loaded.rejected.len()
            );
            let computed = compute_standings(config, loaded.records, &seasons).await?;
            for (table, annotated) in computed {
                db.replace_standings(&table)
                    .with_context(|| format!("failed to write standings for {}", table.season))?;
                db.replace_game_records(table.season, &annotated)
                    .with_context(|| format!("failed to write game records for {}", table.season))?;
                info!("Standings {}: {} franchises", table.season, table.entries.len());
                summary.standings.push(table.season);
            }
        }
        Err(e) => {
            error!("Games unavailable, no standings written: {e}");
            summary.fatal.push(e.to_string());
        }
    }

    if !summary.failed_seasons.is_empty() {
        warn!("Seasons with skipped records: {:?}", summary.failed_seasons);
    }

    db.save_state(
        "last_run",
        &json!({
            "completed_at": chrono::Utc::now().to_rfc3339(),
            "snapshots": summary.snapshots,
            "standings": summary.standings,
            "failed_seasons": summary.failed_seasons,
            "clean": summary.is_clean(),
        }),
    )
    .context("failed to record run state")?;

    Ok(summary)
}

fn write_snapshots(
    config: &Config,
    db: &Database,
    log: &TransactionLog,
    seasons: &[Season],
    summary: &mut RunSummary,
) -> Result<()> {
    let regimes = config.regime_book();
    for &season in seasons {
        let rules = config.season_rules(season);
        let snapshot = Replayer::new(&regimes)
            .with_draft_rounds(rules.draft_rounds)
            .reconstruct(season, log);
        db.replace_snapshot(&snapshot)
            .with_context(|| format!("failed to write snapshot for {season}"))?;
        info!(
            "Snapshot {}: {} contracts, {} RFA rights, {} picks",
            season,
            snapshot.contracts.len(),
            snapshot.rfa_rights.len(),
            snapshot.picks.len()
        );
        summary.snapshots.push(season);
    }
    Ok(())
}

/// Compute standings and weekly-record annotated games for each season on
/// its own blocking task. Results come back in season order, one per
/// selected season; a season without games gets an empty table so stale
/// rows are replaced too.
async fn compute_standings(
    config: &Config,
    games: Vec<Game>,
    seasons: &[Season],
) -> Result<Vec<(Standings, Vec<Game>)>> {
    let mut by_season: BTreeMap<Season, Vec<Game>> =
        seasons.iter().map(|&season| (season, Vec::new())).collect();
    for game in games {
        if let Some(season_games) = by_season.get_mut(&game.season) {
            season_games.push(game);
        }
    }
    for (season, season_games) in &by_season {
        if season_games.is_empty() {
            warn!("No games for season {}; clearing its standings", season);
        }
    }

    let regimes = config.regime_book();
    let mut handles = Vec::with_capacity(by_season.len());
    for (season, games) in by_season {
        let rules = config.season_rules(season);
        let regimes = regimes.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let table = standings::compute(&games, &rules, &regimes);
            (table, records::annotate_season(&games))
        });
        handles.push((season, handle));
    }

    let mut computed = Vec::with_capacity(handles.len());
    for (season, handle) in handles {
        let result = handle
            .await
            .with_context(|| format!("standings task for {season} failed"))?;
        computed.push(result);
    }
    Ok(computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataPaths, LeagueConfig};

    fn config(first: Season, current: Season) -> Config {
        Config {
            league: LeagueConfig {
                name: "Test League".into(),
                first_season: first,
                current_season: current,
                draft_rounds: 2,
                playoff_teams: 4,
            },
            regimes: vec![],
            season_overrides: vec![],
            db_path: ":memory:".into(),
            data_paths: DataPaths {
                transactions: "/nonexistent/transactions.json".into(),
                games: "/nonexistent/games.csv".into(),
            },
        }
    }

    #[test]
    fn selected_seasons_defaults_to_configured_range() {
        let cfg = config(2018, 2021);
        assert_eq!(
            selected_seasons(&cfg, &RunOptions::default()),
            vec![2018, 2019, 2020, 2021]
        );
        let one = RunOptions {
            season: Some(2020),
            clear: false,
        };
        assert_eq!(selected_seasons(&cfg, &one), vec![2020]);
    }

    #[test]
    fn summary_exit_codes() {
        let mut summary = RunSummary::default();
        assert_eq!(summary.exit_code(), 0);
        summary.failed_seasons.insert(2019);
        assert_eq!(summary.exit_code(), 1);

        let unattributed = RunSummary {
            unattributed_rejections: true,
            ..RunSummary::default()
        };
        assert!(!unattributed.is_clean());
    }

    #[tokio::test]
    async fn missing_inputs_are_fatal_but_recorded() {
        let cfg = config(2020, 2020);
        let db = Database::open(":memory:").unwrap();
        let summary = run(&cfg, &db, &RunOptions::default()).await.unwrap();

        assert_eq!(summary.fatal.len(), 2);
        assert!(summary.snapshots.is_empty());
        assert!(summary.standings.is_empty());
        assert_eq!(summary.exit_code(), 1);

        let state = db.load_state("last_run").unwrap().unwrap();
        assert_eq!(state["clean"], json!(false));
    }
}
