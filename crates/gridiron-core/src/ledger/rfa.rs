// Restricted-free-agent rights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contract::PlayerId;
use crate::franchise::FranchiseId;
use crate::season::Season;

/// A franchise's first-refusal claim on a player whose contract expired after
/// `season`. Valid only through the following off-season's auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfaRight {
    pub player: PlayerId,
    pub franchise: FranchiseId,
    pub season: Season,
    /// When the expiring contract was converted into the right.
    pub converted_at: DateTime<Utc>,
}

impl RfaRight {
    /// The auction season at which the right is exercised or lapses.
    pub fn auction_season(&self) -> Season {
        self.season + 1
    }
}
