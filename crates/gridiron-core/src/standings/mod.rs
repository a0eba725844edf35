// Season standings: records, points, tiebreakers, seeds and playoff finishes.

pub mod seeding;
pub mod tiebreak;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::division::{division_of, Division};
use crate::franchise::{FranchiseId, RegimeBook};
use crate::game::{Game, GameType, WinLoss};
use crate::records::WeeklyRecords;
use crate::season::{Season, SeasonRules, TiebreakerStrategy};

pub use seeding::{division_standings, playoff_seeds, DivisionStandings};
pub use tiebreak::{break_ties, HeadToHead};

/// Regular-season aggregate for one franchise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub franchise: FranchiseId,
    pub record: WinLoss,
    pub points_for: f64,
    pub points_against: f64,
    pub games_played: u32,
}

impl TeamTotals {
    fn new(franchise: FranchiseId) -> Self {
        TeamTotals {
            franchise,
            record: WinLoss::default(),
            points_for: 0.0,
            points_against: 0.0,
            games_played: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayoffFinish {
    Champion,
    RunnerUp,
    ThirdPlace,
    FourthPlace,
}

impl PlayoffFinish {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayoffFinish::Champion => "champion",
            PlayoffFinish::RunnerUp => "runner-up",
            PlayoffFinish::ThirdPlace => "third-place",
            PlayoffFinish::FourthPlace => "fourth-place",
        }
    }

    pub fn from_str_finish(s: &str) -> Option<Self> {
        match s {
            "champion" => Some(PlayoffFinish::Champion),
            "runner-up" => Some(PlayoffFinish::RunnerUp),
            "third-place" => Some(PlayoffFinish::ThirdPlace),
            "fourth-place" => Some(PlayoffFinish::FourthPlace),
            _ => None,
        }
    }
}

/// One row of the standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsEntry {
    /// 1-based position in the final order.
    pub rank: u32,
    pub franchise: FranchiseId,
    pub name: Option<String>,
    pub record: WinLoss,
    pub points_for: f64,
    pub points_against: f64,
    pub all_play: WinLoss,
    pub stern: WinLoss,
    pub division: Option<Division>,
    pub seed: Option<u8>,
    pub finish: Option<PlayoffFinish>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub season: Season,
    pub entries: Vec<StandingsEntry>,
    pub divisions: Vec<DivisionStandings>,
}

impl Standings {
    pub fn order(&self) -> Vec<FranchiseId> {
        self.entries.iter().map(|e| e.franchise).collect()
    }

    pub fn entry(&self, franchise: FranchiseId) -> Option<&StandingsEntry> {
        self.entries.iter().find(|e| e.franchise == franchise)
    }

    pub fn seeds(&self) -> Vec<FranchiseId> {
        let mut seeded: Vec<&StandingsEntry> =
            self.entries.iter().filter(|e| e.seed.is_some()).collect();
        seeded.sort_by_key(|e| e.seed);
        seeded.into_iter().map(|e| e.franchise).collect()
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Order teams by record, breaking identical records with `strategy`.
///
/// Records are grouped by the exact win-loss-tie triple. Groups go by wins
/// descending, then ties descending. Teams within a group start in input
/// order, which is the final fallback.
pub fn rank(teams: &[TeamTotals], h2h: &HeadToHead, strategy: TiebreakerStrategy) -> Vec<FranchiseId> {
    let mut buckets: Vec<(WinLoss, Vec<&TeamTotals>)> = Vec::new();
    for team in teams {
        match buckets.iter_mut().find(|(record, _)| *record == team.record) {
            Some((_, members)) => members.push(team),
            None => buckets.push((team.record, vec![team])),
        }
    }
    buckets.sort_by(|(a, _), (b, _)| {
        b.wins
            .cmp(&a.wins)
            .then(b.ties.cmp(&a.ties))
            .then(a.losses.cmp(&b.losses))
    });

    buckets
        .into_iter()
        .flat_map(|(record, members)| {
            if members.len() > 1 {
                debug!("breaking {}-way tie at {}", members.len(), record);
                break_ties(&members, h2h, strategy)
            } else {
                members.iter().map(|t| t.franchise).collect()
            }
        })
        .collect()
}

/// Regular-season totals for every franchise appearing in the season's
/// regular-season schedule, in franchise order.
pub fn team_totals(games: &[Game]) -> Vec<TeamTotals> {
    let mut totals: BTreeMap<FranchiseId, TeamTotals> = BTreeMap::new();
    for game in games.iter().filter(|g| g.kind.is_regular()) {
        for (side, opponent) in [(&game.away, &game.home), (&game.home, &game.away)] {
            let entry = totals
                .entry(side.franchise)
                .or_insert_with(|| TeamTotals::new(side.franchise));
            let (Some(score), Some(against)) = (side.score, opponent.score) else {
                continue;
            };
            if let Some(outcome) = game.outcome_for(side.franchise) {
                entry.record.record(outcome);
            }
            entry.points_for += score;
            entry.points_against += against;
            entry.games_played += 1;
        }
    }
    totals.into_values().collect()
}

/// Finishes recorded by scored championship and third-place games.
pub fn playoff_finishes(games: &[Game]) -> BTreeMap<FranchiseId, PlayoffFinish> {
    let mut finishes = BTreeMap::new();
    for game in games {
        let (top, bottom) = match game.kind {
            GameType::Championship => (PlayoffFinish::Champion, PlayoffFinish::RunnerUp),
            GameType::ThirdPlace => (PlayoffFinish::ThirdPlace, PlayoffFinish::FourthPlace),
            _ => continue,
        };
        if !game.is_played() {
            continue;
        }
        match (game.winner(), game.loser()) {
            (Some(winner), Some(loser)) => {
                finishes.insert(winner, top);
                finishes.insert(loser, bottom);
            }
            _ => warn!(
                "{} game in season {} week {} ended tied; no finish recorded",
                game.kind.as_str(),
                game.season,
                game.week
            ),
        }
    }
    finishes
}

/// Full standings for `rules.season`. Games from other seasons are ignored.
pub fn compute(games: &[Game], rules: &SeasonRules, regimes: &RegimeBook) -> Standings {
    let season_games: Vec<Game> = games
        .iter()
        .filter(|g| g.season == rules.season)
        .cloned()
        .collect();

    let totals = team_totals(&season_games);
    let h2h = HeadToHead::from_games(&season_games);
    let weekly = WeeklyRecords::compute(&season_games);
    let overall = rank(&totals, &h2h, rules.tiebreaker);
    let seeds = playoff_seeds(&totals, &overall, &h2h, rules);
    let divisions = division_standings(&totals, &h2h, rules);
    let finishes = playoff_finishes(&season_games);

    // Finishers by finish, then everyone else in regular-season order.
    let mut order: Vec<FranchiseId> = Vec::with_capacity(overall.len());
    let mut finishers: Vec<(PlayoffFinish, FranchiseId)> = finishes
        .iter()
        .filter(|(franchise, _)| overall.contains(franchise))
        .map(|(&franchise, &finish)| (finish, franchise))
        .collect();
    finishers.sort();
    order.extend(finishers.into_iter().map(|(_, franchise)| franchise));
    let placed: BTreeSet<FranchiseId> = order.iter().copied().collect();
    order.extend(overall.iter().filter(|f| !placed.contains(*f)));

    let names = side_names(&season_games);
    let entries = order
        .iter()
        .enumerate()
        .filter_map(|(i, franchise)| {
            let team = totals.iter().find(|t| t.franchise == *franchise)?;
            let records = weekly.totals(*franchise);
            let seed = seeds
                .iter()
                .position(|s| s == franchise)
                .and_then(|p| u8::try_from(p + 1).ok());
            Some(StandingsEntry {
                rank: u32::try_from(i + 1).unwrap_or(u32::MAX),
                franchise: *franchise,
                name: regimes
                    .display_name(*franchise, rules.season)
                    .or_else(|| names.get(franchise).cloned()),
                record: team.record,
                points_for: team.points_for,
                points_against: team.points_against,
                all_play: records.all_play,
                stern: records.stern,
                division: division_of(*franchise, rules.season),
                seed,
                finish: finishes.get(franchise).copied(),
            })
        })
        .collect();

    Standings {
        season: rules.season,
        entries,
        divisions,
    }
}

/// Standings with the built-in rules for `season` and no owner names.
pub fn standings(games: &[Game], season: Season) -> Standings {
    compute(games, &SeasonRules::for_season(season), &RegimeBook::default())
}

/// Last name recorded on a game side for each franchise.
fn side_names(games: &[Game]) -> BTreeMap<FranchiseId, String> {
    let mut names = BTreeMap::new();
    for game in games {
        for side in [&game.away, &game.home] {
            if let Some(name) = &side.name {
                names.insert(side.franchise, name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::franchise::Tenure;
    use crate::game::GameSide;

    fn fid(slot: u8) -> FranchiseId {
        FranchiseId::new(slot).unwrap()
    }

    fn game(season: Season, week: u8, kind: GameType, away: (u8, f64), home: (u8, f64)) -> Game {
        Game {
            season,
            week,
            kind,
            away: GameSide::new(fid(away.0), Some(away.1)),
            home: GameSide::new(fid(home.0), Some(home.1)),
        }
    }

    fn regular(season: Season, week: u8, away: (u8, f64), home: (u8, f64)) -> Game {
        game(season, week, GameType::Regular, away, home)
    }

    fn slots(order: &[FranchiseId]) -> Vec<u8> {
        order.iter().map(|f| f.slot()).collect()
    }

    /// Four teams, three weeks. Team 1 sweeps, team 3 goes 2-1, team 2 goes
    /// 1-2 and team 4 is winless.
    fn four_team_season(season: Season) -> Vec<Game> {
        vec![
            regular(season, 1, (1, 120.0), (2, 100.0)),
            regular(season, 1, (3, 110.0), (4, 90.0)),
            regular(season, 2, (1, 105.0), (3, 95.0)),
            regular(season, 2, (2, 130.0), (4, 80.0)),
            regular(season, 3, (1, 101.0), (4, 99.0)),
            regular(season, 3, (3, 97.0), (2, 96.0)),
        ]
    }

    #[test]
    fn totals_count_only_played_regular_games() {
        let mut games = four_team_season(2022);
        games.push(game(2022, 15, GameType::Semifinal, (1, 150.0), (4, 10.0)));
        let mut pending = regular(2022, 4, (1, 0.0), (2, 0.0));
        pending.away.score = None;
        games.push(pending);

        let totals = team_totals(&games);
        assert_eq!(totals.len(), 4);
        assert_eq!(totals[0].record, WinLoss::new(3, 0, 0));
        assert_eq!(totals[0].games_played, 3);
        assert_eq!(totals[0].points_for, 326.0);
        assert_eq!(totals[3].points_for, 269.0);
        assert_eq!(totals[3].points_against, 341.0);
    }

    #[test]
    fn rank_orders_buckets_then_breaks_ties() {
        let games = four_team_season(2022);
        let totals = team_totals(&games);
        let h2h = HeadToHead::from_games(&games);
        let order = rank(&totals, &h2h, TiebreakerStrategy::HeadToHeadPercentage);
        assert_eq!(slots(&order), vec![1, 3, 2, 4]);
    }

    #[test]
    fn ties_rank_above_losses() {
        let mut a = TeamTotals::new(fid(1));
        a.record = WinLoss::new(8, 6, 0);
        let mut b = TeamTotals::new(fid(2));
        b.record = WinLoss::new(8, 5, 1);
        let order = rank(&[a, b], &HeadToHead::default(), TiebreakerStrategy::Graduation);
        assert_eq!(slots(&order), vec![2, 1]);
    }

    #[test]
    fn modern_two_team_tie_goes_to_points_for() {
        // 9-5-0 each, split the season series.
        let mut a = TeamTotals::new(fid(3));
        a.record = WinLoss::new(9, 5, 0);
        a.points_for = 1401.0;
        let mut b = TeamTotals::new(fid(8));
        b.record = WinLoss::new(9, 5, 0);
        b.points_for = 1455.5;
        let h2h = HeadToHead::from_games(&[
            regular(2023, 2, (3, 110.0), (8, 100.0)),
            regular(2023, 9, (8, 120.0), (3, 90.0)),
        ]);
        let order = rank(&[a, b], &h2h, TiebreakerStrategy::for_season(2023));
        assert_eq!(slots(&order), vec![8, 3]);
    }

    #[test]
    fn playoff_finishes_come_from_final_games() {
        let games = vec![
            game(2022, 16, GameType::Championship, (3, 130.0), (1, 120.0)),
            game(2022, 16, GameType::ThirdPlace, (2, 90.0), (4, 95.0)),
            game(2022, 16, GameType::Consolation, (5, 90.0), (6, 95.0)),
        ];
        let finishes = playoff_finishes(&games);
        assert_eq!(finishes.len(), 4);
        assert_eq!(finishes[&fid(3)], PlayoffFinish::Champion);
        assert_eq!(finishes[&fid(1)], PlayoffFinish::RunnerUp);
        assert_eq!(finishes[&fid(4)], PlayoffFinish::ThirdPlace);
        assert_eq!(finishes[&fid(2)], PlayoffFinish::FourthPlace);
    }

    #[test]
    fn finishes_sort_ahead_of_regular_season_order() {
        let mut games = four_team_season(2022);
        games.push(game(2022, 5, GameType::Championship, (3, 130.0), (4, 120.0)));
        games.push(game(2022, 5, GameType::ThirdPlace, (1, 90.0), (2, 95.0)));
        let rules = SeasonRules::for_season(2022).with_regular_season_weeks(3);
        let standings = compute(&games, &rules, &RegimeBook::default());

        assert_eq!(slots(&standings.order()), vec![3, 4, 2, 1]);
        let champion = standings.entry(fid(3)).unwrap();
        assert_eq!(champion.rank, 1);
        assert_eq!(champion.finish, Some(PlayoffFinish::Champion));
        assert_eq!(champion.seed, Some(2));
        assert_eq!(slots(&standings.seeds()), vec![1, 3, 2, 4]);
    }

    #[test]
    fn division_winner_keeps_its_regular_season_place() {
        // 2010, one week: every East team beats a West team, so the West
        // winner is seeded with a worse record than four unseeded teams.
        let games = vec![
            regular(2010, 1, (1, 110.0), (6, 90.0)),
            regular(2010, 1, (2, 111.0), (7, 91.0)),
            regular(2010, 1, (3, 112.0), (8, 92.0)),
            regular(2010, 1, (4, 113.0), (9, 93.0)),
            regular(2010, 1, (5, 114.0), (10, 94.0)),
        ];
        let rules = SeasonRules::for_season(2010)
            .with_regular_season_weeks(1)
            .with_playoff_teams(2);
        let standings = compute(&games, &rules, &RegimeBook::default());

        let seeds = standings.seeds();
        assert_eq!(seeds.len(), 2);
        let west_winner = standings.entry(seeds[1]).unwrap();
        assert_eq!(west_winner.division, Some(Division::West));
        assert_eq!(west_winner.seed, Some(2));
        assert_eq!(west_winner.rank, 6);

        let top_five: Vec<u8> = standings.entries[..5].iter().map(|e| e.franchise.slot()).collect();
        assert!(top_five.iter().all(|slot| (1..=5).contains(slot)));
        assert!(standings.entries[..5]
            .iter()
            .all(|e| e.record == WinLoss::new(1, 0, 0)));
    }

    #[test]
    fn entries_carry_alternate_records_and_names() {
        let mut games = four_team_season(2022);
        games[0].home.name = Some("Brett".into());
        let regimes = RegimeBook::new(vec![Tenure {
            name: "Keyon".into(),
            franchise: fid(1),
            from: 2008,
            to: None,
        }]);
        let standings = compute(&games, &SeasonRules::for_season(2022), &regimes);
        let first = standings.entry(fid(1)).unwrap();
        assert_eq!(first.name.as_deref(), Some("Keyon"));
        assert_eq!(first.all_play, WinLoss::new(8, 1, 0));
        assert_eq!(standings.entry(fid(2)).unwrap().name.as_deref(), Some("Brett"));
        // Three games against a 14-week season: no seeds yet.
        assert!(standings.seeds().is_empty());
    }

    #[test]
    fn ignores_other_seasons() {
        let mut games = four_team_season(2021);
        games.extend(four_team_season(2022));
        let standings = standings(&games, 2021);
        assert_eq!(standings.season, 2021);
        assert_eq!(standings.entries.len(), 4);
        assert_eq!(standings.entry(fid(1)).unwrap().record, WinLoss::new(3, 0, 0));
    }

    #[test]
    fn division_era_standings_report_divisions() {
        let games = vec![
            regular(2010, 1, (1, 100.0), (6, 90.0)),
            regular(2010, 1, (2, 100.0), (7, 110.0)),
        ];
        let standings = standings(&games, 2010);
        assert_eq!(standings.divisions.len(), 2);
        assert_eq!(standings.entry(fid(6)).unwrap().division, Some(Division::West));
        assert_eq!(slots(&standings.divisions[0].franchises), vec![1, 2]);
    }
}
