// Season-specific league rules: tiebreaker era, RFA eligibility, divisions,
// schedule length and draft shape.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A league season, identified by its calendar year.
pub type Season = u16;

/// First season decided by the head-to-head percentage tiebreaker.
pub const MODERN_TIEBREAKER_SINCE: Season = 2020;

/// First season in which every expiring contract confers RFA rights.
pub const OPEN_RFA_SINCE: Season = 2019;

/// Seasons played with two five-team divisions.
pub const DIVISION_ERA: RangeInclusive<Season> = 2008..=2011;

/// First season with a 15-week regular season.
pub const LONG_SCHEDULE_SINCE: Season = 2021;

pub const DEFAULT_DRAFT_ROUNDS: u8 = 10;
pub const DEFAULT_PLAYOFF_TEAMS: u8 = 4;

/// How a group of teams with identical records is put in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TiebreakerStrategy {
    /// Remove one team at a time: H2H wins among the still-tied teams when
    /// everyone played the same number of H2H games, points-for otherwise.
    Graduation,
    /// Partition by H2H win percentage within the group and recurse.
    HeadToHeadPercentage,
}

impl TiebreakerStrategy {
    pub fn for_season(season: Season) -> Self {
        if season >= MODERN_TIEBREAKER_SINCE {
            TiebreakerStrategy::HeadToHeadPercentage
        } else {
            TiebreakerStrategy::Graduation
        }
    }
}

/// Which expiring contracts give the holding franchise RFA rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RfaEligibility {
    /// Only contracts that came out of the auction or the rookie draft.
    AuctionOrDraftOnly,
    /// Every contract, including in-season free-agent signings.
    AllContracts,
}

impl RfaEligibility {
    pub fn for_season(season: Season) -> Self {
        if season >= OPEN_RFA_SINCE {
            RfaEligibility::AllContracts
        } else {
            RfaEligibility::AuctionOrDraftOnly
        }
    }

    /// Whether a contract with the given start year confers RFA rights when it
    /// expires. A missing start year marks a free-agent signing.
    pub fn confers_rights(self, start_year: Option<Season>) -> bool {
        match self {
            RfaEligibility::AuctionOrDraftOnly => start_year.is_some(),
            RfaEligibility::AllContracts => true,
        }
    }
}

/// The rules in force for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRules {
    pub season: Season,
    pub tiebreaker: TiebreakerStrategy,
    pub rfa_eligibility: RfaEligibility,
    pub divisions: bool,
    /// Number of franchise slots in play (10 during the division era, 12 after).
    pub franchise_count: u8,
    /// Games each franchise plays before playoff seeds are assigned.
    pub regular_season_weeks: u8,
    pub playoff_teams: u8,
    pub draft_rounds: u8,
}

impl SeasonRules {
    /// Built-in rules derived purely from the season year.
    pub fn for_season(season: Season) -> Self {
        let divisions = crate::division::has_divisions(season);
        SeasonRules {
            season,
            tiebreaker: TiebreakerStrategy::for_season(season),
            rfa_eligibility: RfaEligibility::for_season(season),
            divisions,
            franchise_count: if season <= *DIVISION_ERA.end() { 10 } else { 12 },
            regular_season_weeks: if season >= LONG_SCHEDULE_SINCE { 15 } else { 14 },
            playoff_teams: DEFAULT_PLAYOFF_TEAMS,
            draft_rounds: DEFAULT_DRAFT_ROUNDS,
        }
    }

    pub fn with_regular_season_weeks(mut self, weeks: u8) -> Self {
        self.regular_season_weeks = weeks;
        self
    }

    pub fn with_playoff_teams(mut self, teams: u8) -> Self {
        self.playoff_teams = teams;
        self
    }

    pub fn with_draft_rounds(mut self, rounds: u8) -> Self {
        self.draft_rounds = rounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiebreaker_switches_in_2020() {
        assert_eq!(
            TiebreakerStrategy::for_season(2019),
            TiebreakerStrategy::Graduation
        );
        assert_eq!(
            TiebreakerStrategy::for_season(2020),
            TiebreakerStrategy::HeadToHeadPercentage
        );
    }

    #[test]
    fn rfa_eligibility_opens_up_in_2019() {
        let legacy = RfaEligibility::for_season(2018);
        assert!(legacy.confers_rights(Some(2016)));
        assert!(!legacy.confers_rights(None));

        let open = RfaEligibility::for_season(2019);
        assert!(open.confers_rights(Some(2017)));
        assert!(open.confers_rights(None));
    }

    #[test]
    fn division_era_rules() {
        let rules = SeasonRules::for_season(2009);
        assert!(rules.divisions);
        assert_eq!(rules.franchise_count, 10);
        assert_eq!(rules.regular_season_weeks, 14);

        let rules = SeasonRules::for_season(2012);
        assert!(!rules.divisions);
        assert_eq!(rules.franchise_count, 12);
    }

    #[test]
    fn schedule_grows_in_2021() {
        assert_eq!(SeasonRules::for_season(2020).regular_season_weeks, 14);
        assert_eq!(SeasonRules::for_season(2021).regular_season_weeks, 15);
    }

    #[test]
    fn builders_override_defaults() {
        let rules = SeasonRules::for_season(2023)
            .with_regular_season_weeks(13)
            .with_playoff_teams(6)
            .with_draft_rounds(5);
        assert_eq!(rules.regular_season_weeks, 13);
        assert_eq!(rules.playoff_teams, 6);
        assert_eq!(rules.draft_rounds, 5);
        assert_eq!(rules.tiebreaker, TiebreakerStrategy::HeadToHeadPercentage);
    }
}
