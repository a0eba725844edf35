// Division lookup for the 2008-2011 era.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::franchise::FranchiseId;
use crate::season::{Season, DIVISION_ERA};

/// Season whose divisions carried alternate display names.
const RENAMED_SEASON: Season = 2009;

/// The two fixed five-team divisions. Membership is by franchise slot and
/// never changed during the era.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Division {
    East,
    West,
}

impl Division {
    pub const ALL: [Division; 2] = [Division::East, Division::West];

    /// Franchise slots belonging to this division.
    pub fn members(self) -> [FranchiseId; 5] {
        let first = match self {
            Division::East => 1,
            Division::West => 6,
        };
        std::array::from_fn(|i| FranchiseId::new_unchecked(first + i as u8))
    }

    pub fn contains(self, franchise: FranchiseId) -> bool {
        self.members().contains(&franchise)
    }

    /// Display name for the season. 2009 used different names for the same
    /// membership.
    pub fn name(self, season: Season) -> &'static str {
        match (self, season == RENAMED_SEASON) {
            (Division::East, false) => "East",
            (Division::West, false) => "West",
            (Division::East, true) => "Atlantic",
            (Division::West, true) => "Pacific",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Division::East => write!(f, "East"),
            Division::West => write!(f, "West"),
        }
    }
}

/// Whether the season was played with divisions.
pub fn has_divisions(season: Season) -> bool {
    DIVISION_ERA.contains(&season)
}

/// Division of a franchise in `season`, or `None` outside the division era
/// and for slots that were not active during it.
pub fn division_of(franchise: FranchiseId, season: Season) -> Option<Division> {
    if !has_divisions(season) {
        return None;
    }
    Division::ALL.into_iter().find(|d| d.contains(franchise))
}
