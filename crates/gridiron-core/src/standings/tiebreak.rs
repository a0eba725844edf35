// Tiebreakers for teams with identical records.
//
// Both strategies are pure: they take the tied teams in a stable order and
// return a new ordering. When everything is exhausted the input order wins.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::franchise::FranchiseId;
use crate::game::{Game, Outcome, WinLoss};
use crate::season::TiebreakerStrategy;

use super::TeamTotals;

/// Percentages are compared at six decimal places.
const PCT_SCALE: f64 = 1_000_000.0;

/// Regular-season results between every pair of franchises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadToHead {
    records: BTreeMap<(FranchiseId, FranchiseId), WinLoss>,
}

impl HeadToHead {
    /// Collects played regular-season games.
    pub fn from_games<'a>(games: impl IntoIterator<Item = &'a Game>) -> Self {
        let mut h2h = HeadToHead::default();
        for game in games {
            if !game.kind.is_regular() {
                continue;
            }
            let (away, home) = (game.away.franchise, game.home.franchise);
            if let Some(outcome) = game.outcome_for(away) {
                h2h.records.entry((away, home)).or_default().record(outcome);
                h2h.records
                    .entry((home, away))
                    .or_default()
                    .record(mirror(outcome));
            }
        }
        h2h
    }

    /// `team`'s record against `opponent`.
    pub fn record(&self, team: FranchiseId, opponent: FranchiseId) -> WinLoss {
        self.records
            .get(&(team, opponent))
            .copied()
            .unwrap_or_default()
    }

    /// `team`'s combined record against the other members of `group`.
    pub fn against(&self, team: FranchiseId, group: &[FranchiseId]) -> WinLoss {
        let mut total = WinLoss::default();
        for &opponent in group.iter().filter(|&&o| o != team) {
            total += self.record(team, opponent);
        }
        total
    }
}

fn mirror(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Win => Outcome::Loss,
        Outcome::Loss => Outcome::Win,
        Outcome::Tie => Outcome::Tie,
    }
}

/// Order a group of teams sharing one record with the season's strategy.
pub fn break_ties(
    tied: &[&TeamTotals],
    h2h: &HeadToHead,
    strategy: TiebreakerStrategy,
) -> Vec<FranchiseId> {
    match strategy {
        TiebreakerStrategy::Graduation => graduation(tied, h2h),
        TiebreakerStrategy::HeadToHeadPercentage => head_to_head_percentage(tied, h2h),
    }
}

/// Highest points-for first; equal points keep input order.
pub fn by_points_for(tied: &[&TeamTotals]) -> Vec<FranchiseId> {
    let mut ordered = tied.to_vec();
    ordered.sort_by(|a, b| b.points_for.total_cmp(&a.points_for));
    ordered.into_iter().map(|t| t.franchise).collect()
}

/// Legacy tiebreaker. Graduates one team at a time from the group:
/// when every remaining team played the same number of head-to-head games
/// among themselves, the most head-to-head wins goes first (points-for breaks
/// that), otherwise points-for alone decides. Head-to-head is recomputed for
/// the teams left after each graduation.
pub fn graduation(tied: &[&TeamTotals], h2h: &HeadToHead) -> Vec<FranchiseId> {
    if tied.len() <= 1 {
        return tied.iter().map(|t| t.franchise).collect();
    }

    let ids: Vec<FranchiseId> = tied.iter().map(|t| t.franchise).collect();
    let records: Vec<WinLoss> = ids.iter().map(|&id| h2h.against(id, &ids)).collect();
    let balanced = records
        .windows(2)
        .all(|pair| pair[0].decisions() == pair[1].decisions());

    let mut best = 0;
    for i in 1..tied.len() {
        let better = if balanced && records[i].wins != records[best].wins {
            records[i].wins > records[best].wins
        } else {
            tied[i].points_for.total_cmp(&tied[best].points_for).is_gt()
        };
        if better {
            best = i;
        }
    }

    let rest: Vec<&TeamTotals> = tied
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, t)| *t)
        .collect();
    let mut ordered = vec![tied[best].franchise];
    ordered.extend(graduation(&rest, h2h));
    ordered
}

/// Modern tiebreaker. Splits the group by head-to-head win percentage against
/// the rest of the group (ties count half). A single split falls back to
/// points-for; otherwise the splits are ordered by percentage and each split
/// with several teams is broken again on its own.
pub fn head_to_head_percentage(tied: &[&TeamTotals], h2h: &HeadToHead) -> Vec<FranchiseId> {
    if tied.len() <= 1 {
        return tied.iter().map(|t| t.franchise).collect();
    }

    let ids: Vec<FranchiseId> = tied.iter().map(|t| t.franchise).collect();
    let mut groups: BTreeMap<Reverse<i64>, Vec<&TeamTotals>> = BTreeMap::new();
    for team in tied {
        // No games among the group counts as an even split.
        let pct = h2h.against(team.franchise, &ids).win_pct().unwrap_or(0.5);
        let key = (pct * PCT_SCALE).round() as i64;
        groups.entry(Reverse(key)).or_default().push(team);
    }

    if groups.len() == 1 {
        return by_points_for(tied);
    }

    groups
        .into_values()
        .flat_map(|group| head_to_head_percentage(&group, h2h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameSide, GameType};

    fn fid(slot: u8) -> FranchiseId {
        FranchiseId::new(slot).unwrap()
    }

    fn team(slot: u8, points_for: f64) -> TeamTotals {
        TeamTotals {
            franchise: fid(slot),
            record: WinLoss::new(8, 6, 0),
            points_for,
            points_against: 0.0,
            games_played: 14,
        }
    }

    /// Regular-season game won by `winner`.
    fn beat(week: u8, winner: u8, loser: u8) -> Game {
        Game {
            season: 2018,
            week,
            kind: GameType::Regular,
            away: GameSide::new(fid(winner), Some(100.0)),
            home: GameSide::new(fid(loser), Some(90.0)),
        }
    }

    fn slots(order: Vec<FranchiseId>) -> Vec<u8> {
        order.into_iter().map(u8::from).collect()
    }

    #[test]
    fn head_to_head_counts_both_sides() {
        let h2h = HeadToHead::from_games(&[beat(1, 1, 2), beat(8, 2, 1), beat(9, 1, 2)]);
        assert_eq!(h2h.record(fid(1), fid(2)), WinLoss::new(2, 1, 0));
        assert_eq!(h2h.record(fid(2), fid(1)), WinLoss::new(1, 2, 0));
        assert_eq!(h2h.record(fid(1), fid(3)), WinLoss::default());
    }

    #[test]
    fn graduation_three_way_cycle_falls_to_points_for() {
        // 1 beat 2, 2 beat 3, 3 beat 1: everyone is 1-1 head to head.
        let h2h = HeadToHead::from_games(&[beat(1, 1, 2), beat(2, 2, 3), beat(3, 3, 1)]);
        let (a, b, c) = (team(1, 1500.0), team(2, 1400.0), team(3, 1600.0));
        // 3 graduates on points; then 1 beat 2 head to head.
        assert_eq!(slots(graduation(&[&a, &b, &c], &h2h)), vec![3, 1, 2]);

        // Same cycle, but 2 now leads the remaining pair on points and still
        // loses the head-to-head it has with 1.
        let b = team(2, 1550.0);
        assert_eq!(slots(graduation(&[&a, &b, &c], &h2h)), vec![3, 1, 2]);
    }

    #[test]
    fn graduation_uses_head_to_head_wins_when_balanced() {
        // Round robin: 2 swept both.
        let h2h = HeadToHead::from_games(&[beat(1, 2, 1), beat(2, 2, 3), beat(3, 1, 3)]);
        let (a, b, c) = (team(1, 1500.0), team(2, 1200.0), team(3, 1600.0));
        assert_eq!(slots(graduation(&[&a, &b, &c], &h2h)), vec![2, 1, 3]);
    }

    #[test]
    fn graduation_unequal_games_bypasses_head_to_head() {
        // 1 and 2 met twice, 3 never met anyone in the group.
        let h2h = HeadToHead::from_games(&[beat(1, 1, 2), beat(2, 1, 2)]);
        let (a, b, c) = (team(1, 1300.0), team(2, 1450.0), team(3, 1400.0));
        // Points decide the first graduate even though 1 is 2-0.
        // 1 and 3 never met, so points decide again.
        assert_eq!(slots(graduation(&[&a, &b, &c], &h2h)), vec![2, 3, 1]);
    }

    #[test]
    fn modern_two_way_split_falls_to_points_for() {
        let h2h = HeadToHead::from_games(&[beat(2, 4, 7), beat(10, 7, 4)]);
        let mut a = team(4, 1320.5);
        let mut b = team(7, 1402.25);
        a.record = WinLoss::new(9, 5, 0);
        b.record = WinLoss::new(9, 5, 0);
        assert_eq!(slots(head_to_head_percentage(&[&a, &b], &h2h)), vec![7, 4]);
    }

    #[test]
    fn modern_partitions_then_recurses() {
        // 5 beat 6 and 8; 6 beat 8 twice; 8 beat 6 once.
        let h2h = HeadToHead::from_games(&[
            beat(1, 5, 6),
            beat(2, 5, 8),
            beat(3, 6, 8),
            beat(4, 6, 8),
            beat(5, 8, 6),
        ]);
        let (a, b, c) = (team(5, 1000.0), team(6, 1100.0), team(8, 1200.0));
        // 5: 2-0 (1.000), 6: 2-2 (.500), 8: 1-3 (.250).
        assert_eq!(slots(head_to_head_percentage(&[&a, &b, &c], &h2h)), vec![5, 6, 8]);
    }

    #[test]
    fn modern_subgroup_recomputes_percentages() {
        // 1 beat 2 and 3; 2 and 3 split, so the pair goes to points.
        let h2h = HeadToHead::from_games(&[
            beat(1, 1, 2),
            beat(2, 1, 3),
            beat(3, 2, 3),
            beat(4, 3, 2),
        ]);
        let (a, b, c) = (team(1, 900.0), team(2, 1000.0), team(3, 1100.0));
        assert_eq!(slots(head_to_head_percentage(&[&a, &b, &c], &h2h)), vec![1, 3, 2]);
    }

    #[test]
    fn exhausted_tiebreakers_keep_input_order() {
        let h2h = HeadToHead::default();
        let (a, b, c) = (team(9, 1000.0), team(2, 1000.0), team(5, 1000.0));
        assert_eq!(slots(graduation(&[&a, &b, &c], &h2h)), vec![9, 2, 5]);
        assert_eq!(slots(head_to_head_percentage(&[&a, &b, &c], &h2h)), vec![9, 2, 5]);
    }

    #[test]
    fn both_strategies_return_every_team_once() {
        let h2h = HeadToHead::from_games(&[beat(1, 1, 2), beat(2, 3, 4), beat(3, 2, 3)]);
        let teams: Vec<TeamTotals> = (1..=6).map(|s| team(s, 1000.0 + f64::from(s % 3))).collect();
        let refs: Vec<&TeamTotals> = teams.iter().collect();
        for strategy in [
            TiebreakerStrategy::Graduation,
            TiebreakerStrategy::HeadToHeadPercentage,
        ] {
            let mut order = slots(break_ties(&refs, &h2h, strategy));
            order.sort_unstable();
            assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
        }
    }
}
