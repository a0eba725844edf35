// Rookie draft picks.

use serde::{Deserialize, Serialize};

use crate::franchise::FranchiseId;
use crate::season::Season;

/// Identity of a pick: the draft season, the round, and the franchise the
/// pick originally belonged to. The original owner never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PickKey {
    pub season: Season,
    pub round: u8,
    pub original_franchise: FranchiseId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Available,
    Used,
    Passed,
}

impl PickStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PickStatus::Available => "available",
            PickStatus::Used => "used",
            PickStatus::Passed => "passed",
        }
    }

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "available" => Some(PickStatus::Available),
            "used" => Some(PickStatus::Used),
            "passed" => Some(PickStatus::Passed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub season: Season,
    pub round: u8,
    pub original_franchise: FranchiseId,
    /// Changes only through trades.
    pub current_franchise: FranchiseId,
    pub status: PickStatus,
}

impl Pick {
    /// A fresh, untraded pick.
    pub fn new(key: PickKey) -> Self {
        Pick {
            season: key.season,
            round: key.round,
            original_franchise: key.original_franchise,
            current_franchise: key.original_franchise,
            status: PickStatus::Available,
        }
    }

    pub fn key(&self) -> PickKey {
        PickKey {
            season: self.season,
            round: self.round,
            original_franchise: self.original_franchise,
        }
    }

    pub fn is_traded(&self) -> bool {
        self.current_franchise != self.original_franchise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pick_is_available_and_untraded() {
        let key = PickKey {
            season: 2024,
            round: 2,
            original_franchise: FranchiseId::new(9).unwrap(),
        };
        let pick = Pick::new(key);
        assert_eq!(pick.key(), key);
        assert_eq!(pick.status, PickStatus::Available);
        assert!(!pick.is_traded());
    }

    #[test]
    fn status_string_mapping() {
        for status in [PickStatus::Available, PickStatus::Used, PickStatus::Passed] {
            assert_eq!(PickStatus::from_str_status(status.as_str()), Some(status));
        }
        assert_eq!(PickStatus::from_str_status("traded"), None);
    }
}
