// Weekly alternate records: all-play and stern, alongside the straight
// head-to-head record, accumulated week by week per franchise.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::franchise::FranchiseId;
use crate::game::{Game, GameRecords, Outcome, RecordSnapshot, WinLoss};

/// Most wins, losses or ties a stern record can collect in one week.
pub const STERN_WEEKLY_CAP: u32 = 2;

/// One week's all-play record for `score` against everyone who played that
/// week. `week_scores` includes `score` itself once.
pub fn all_play(score: f64, week_scores: &[f64]) -> WinLoss {
    let mut record = WinLoss::default();
    for other in week_scores {
        match Outcome::from_scores(score, *other) {
            Outcome::Win => record.wins += 1,
            Outcome::Loss => record.losses += 1,
            Outcome::Tie => record.ties += 1,
        }
    }
    // The team's own score.
    record.ties = record.ties.saturating_sub(1);
    record
}

/// One week's stern record: the actual result plus a bonus decision against
/// the field, each count capped at [`STERN_WEEKLY_CAP`].
pub fn stern(actual: Outcome, all_play: WinLoss) -> WinLoss {
    let mut record = WinLoss::default();
    record.record(actual);
    let field = match all_play.wins.cmp(&all_play.losses) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Less => Outcome::Loss,
        std::cmp::Ordering::Equal => Outcome::Tie,
    };
    record.record(field);
    WinLoss {
        wins: record.wins.min(STERN_WEEKLY_CAP),
        losses: record.losses.min(STERN_WEEKLY_CAP),
        ties: record.ties.min(STERN_WEEKLY_CAP),
    }
}

/// Season-to-date totals for one franchise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTotals {
    pub straight: WinLoss,
    pub all_play: WinLoss,
    pub stern: WinLoss,
}

/// Straight, all-play and stern snapshots for every franchise and week of a
/// season's played regular-season games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyRecords {
    snapshots: BTreeMap<(u8, FranchiseId), GameRecords>,
    totals: BTreeMap<FranchiseId, RecordTotals>,
}

impl WeeklyRecords {
    pub fn compute(games: &[Game]) -> Self {
        let mut weeks: BTreeMap<u8, BTreeMap<FranchiseId, (f64, Outcome)>> = BTreeMap::new();
        for game in games.iter().filter(|g| g.kind.is_regular()) {
            for side in [&game.away, &game.home] {
                let (Some(score), Some(outcome)) = (side.score, game.outcome_for(side.franchise))
                else {
                    continue;
                };
                match weeks.entry(game.week).or_default().entry(side.franchise) {
                    Entry::Vacant(slot) => {
                        slot.insert((score, outcome));
                    }
                    Entry::Occupied(_) => warn!(
                        "franchise {} has more than one game in season {} week {}; keeping the first",
                        side.franchise, game.season, game.week
                    ),
                }
            }
        }

        let mut records = WeeklyRecords::default();
        for (week, results) in &weeks {
            let scores: Vec<f64> = results.values().map(|(score, _)| *score).collect();
            for (&franchise, &(score, outcome)) in results {
                let mut straight = WinLoss::default();
                straight.record(outcome);
                let field = all_play(score, &scores);
                let bonus = stern(outcome, field);

                let totals = records.totals.entry(franchise).or_default();
                totals.straight += straight;
                totals.all_play += field;
                totals.stern += bonus;

                records.snapshots.insert(
                    (*week, franchise),
                    GameRecords {
                        straight: RecordSnapshot {
                            week: straight,
                            cumulative: totals.straight,
                        },
                        all_play: RecordSnapshot {
                            week: field,
                            cumulative: totals.all_play,
                        },
                        stern: RecordSnapshot {
                            week: bonus,
                            cumulative: totals.stern,
                        },
                    },
                );
            }
        }
        records
    }

    pub fn for_week(&self, week: u8, franchise: FranchiseId) -> Option<GameRecords> {
        self.snapshots.get(&(week, franchise)).copied()
    }

    /// Season totals; zero for franchises without a played game.
    pub fn totals(&self, franchise: FranchiseId) -> RecordTotals {
        self.totals.get(&franchise).copied().unwrap_or_default()
    }

    /// Copies of `games` with each regular-season side's records filled in.
    /// Playoff and unplayed games carry no records.
    pub fn annotate(&self, games: &[Game]) -> Vec<Game> {
        games
            .iter()
            .map(|game| {
                let mut game = game.clone();
                let regular = game.kind.is_regular();
                for side in [&mut game.away, &mut game.home] {
                    side.records = if regular {
                        self.for_week(game.week, side.franchise)
                    } else {
                        None
                    };
                }
                game
            })
            .collect()
    }
}

/// Computes weekly records for a season and returns annotated copies of its
/// games.
pub fn annotate_season(games: &[Game]) -> Vec<Game> {
    WeeklyRecords::compute(games).annotate(games)
}
