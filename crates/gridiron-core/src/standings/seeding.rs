// Playoff seeds and division standings.

use serde::{Deserialize, Serialize};

use crate::division::{division_of, Division};
use crate::franchise::FranchiseId;
use crate::season::SeasonRules;

use super::tiebreak::HeadToHead;
use super::{rank, TeamTotals};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionStandings {
    pub division: Division,
    /// Display name for the season.
    pub name: String,
    /// Best first.
    pub franchises: Vec<FranchiseId>,
}

impl DivisionStandings {
    pub fn winner(&self) -> Option<FranchiseId> {
        self.franchises.first().copied()
    }
}

/// Whether every team has played the full regular season.
pub fn regular_season_complete(teams: &[TeamTotals], rules: &SeasonRules) -> bool {
    !teams.is_empty()
        && teams
            .iter()
            .all(|t| t.games_played >= u32::from(rules.regular_season_weeks))
}

/// Each division's teams in tiebroken order. Empty outside the division era.
pub fn division_standings(
    teams: &[TeamTotals],
    h2h: &HeadToHead,
    rules: &SeasonRules,
) -> Vec<DivisionStandings> {
    if !rules.divisions {
        return Vec::new();
    }
    Division::ALL
        .into_iter()
        .map(|division| {
            let members: Vec<TeamTotals> = teams
                .iter()
                .filter(|t| division_of(t.franchise, rules.season) == Some(division))
                .cloned()
                .collect();
            DivisionStandings {
                division,
                name: division.name(rules.season).to_string(),
                franchises: rank(&members, h2h, rules.tiebreaker),
            }
        })
        .collect()
}

/// Playoff seeds, best first. Empty until the regular season is complete.
///
/// Division era: the division winners take the top seeds, ordered against
/// each other by record and tiebreaker, and the best remaining teams fill the
/// wild-card seeds. Otherwise the overall order decides.
pub fn playoff_seeds(
    teams: &[TeamTotals],
    overall: &[FranchiseId],
    h2h: &HeadToHead,
    rules: &SeasonRules,
) -> Vec<FranchiseId> {
    if !regular_season_complete(teams, rules) {
        return Vec::new();
    }
    let slots = usize::from(rules.playoff_teams);
    if !rules.divisions {
        return overall.iter().copied().take(slots).collect();
    }

    let winners: Vec<FranchiseId> = division_standings(teams, h2h, rules)
        .iter()
        .filter_map(DivisionStandings::winner)
        .collect();
    let winner_totals: Vec<TeamTotals> = teams
        .iter()
        .filter(|t| winners.contains(&t.franchise))
        .cloned()
        .collect();
    let wild_card_pool: Vec<TeamTotals> = teams
        .iter()
        .filter(|t| !winners.contains(&t.franchise))
        .cloned()
        .collect();

    let mut seeds = rank(&winner_totals, h2h, rules.tiebreaker);
    let wild_cards = slots.saturating_sub(seeds.len());
    seeds.extend(
        rank(&wild_card_pool, h2h, rules.tiebreaker)
            .into_iter()
            .take(wild_cards),
    );
    seeds.truncate(slots);
    seeds
}
