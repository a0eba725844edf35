// Player contracts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::franchise::FranchiseId;
use crate::season::Season;

/// Externally resolved player identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("contract for player {player} ends in {end_year}, before it starts in {start_year}")]
    InvertedContract {
        player: PlayerId,
        start_year: Season,
        end_year: Season,
    },
}

/// A player's contract with a franchise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub player: PlayerId,
    pub franchise: FranchiseId,
    pub salary: u32,
    /// `None` marks a free-agent signing (no auction or draft origin).
    pub start_year: Option<Season>,
    pub end_year: Season,
    /// When the contract was signed. Movements recorded before this instant
    /// belong to an earlier contract and do not apply to this one.
    pub signed_at: DateTime<Utc>,
}

impl Contract {
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self.start_year {
            Some(start) if self.end_year < start => Err(LedgerError::InvertedContract {
                player: self.player.clone(),
                start_year: start,
                end_year: self.end_year,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_free_agent_signing(&self) -> bool {
        self.start_year.is_none()
    }

    /// Whether the contract still runs in `season`.
    pub fn is_active_in(&self, season: Season) -> bool {
        self.end_year >= season
    }

    /// Whether a movement at `at` applies to this contract.
    pub fn predates(&self, at: DateTime<Utc>) -> bool {
        at < self.signed_at
    }
}
