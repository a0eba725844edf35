// Matchups, results and the win-loss records attached to each side.

use std::cmp::Ordering;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::franchise::FranchiseId;
use crate::season::Season;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameType {
    Regular,
    Semifinal,
    ThirdPlace,
    Championship,
    Consolation,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::Regular => "regular",
            GameType::Semifinal => "semifinal",
            GameType::ThirdPlace => "thirdPlace",
            GameType::Championship => "championship",
            GameType::Consolation => "consolation",
        }
    }

    /// Parse the game type column. Accepts camelCase, kebab-case and
    /// snake_case spellings.
    pub fn from_str_type(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "regular" => Some(GameType::Regular),
            "semifinal" => Some(GameType::Semifinal),
            "thirdplace" => Some(GameType::ThirdPlace),
            "championship" => Some(GameType::Championship),
            "consolation" => Some(GameType::Consolation),
            _ => None,
        }
    }

    pub fn is_regular(self) -> bool {
        self == GameType::Regular
    }

    /// Games that decide the top four. Consolation games do not count.
    pub fn is_playoff(self) -> bool {
        matches!(
            self,
            GameType::Semifinal | GameType::ThirdPlace | GameType::Championship
        )
    }
}

/// Win-loss-tie counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl WinLoss {
    pub fn new(wins: u32, losses: u32, ties: u32) -> Self {
        WinLoss { wins, losses, ties }
    }

    pub fn decisions(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Ties count as half a win. `None` when no games were decided.
    pub fn win_pct(&self) -> Option<f64> {
        let decisions = self.decisions();
        if decisions == 0 {
            return None;
        }
        Some((f64::from(self.wins) + f64::from(self.ties) / 2.0) / f64::from(decisions))
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }
}

impl AddAssign for WinLoss {
    fn add_assign(&mut self, rhs: WinLoss) {
        self.wins += rhs.wins;
        self.losses += rhs.losses;
        self.ties += rhs.ties;
    }
}

impl std::fmt::Display for WinLoss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.ties)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl Outcome {
    /// Result of scoring `score` against `opponent`.
    pub fn from_scores(score: f64, opponent: f64) -> Self {
        match score.total_cmp(&opponent) {
            Ordering::Greater => Outcome::Win,
            Ordering::Less => Outcome::Loss,
            Ordering::Equal => Outcome::Tie,
        }
    }
}

/// A record as of one week: that week's delta and the running total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub week: WinLoss,
    pub cumulative: WinLoss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecords {
    pub straight: RecordSnapshot,
    pub all_play: RecordSnapshot,
    pub stern: RecordSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSide {
    #[serde(rename = "franchiseId")]
    pub franchise: FranchiseId,
    #[serde(default)]
    pub name: Option<String>,
    /// `None` until the game is played.
    #[serde(default)]
    pub score: Option<f64>,
    /// Filled in by the weekly record calculator for regular-season games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<GameRecords>,
}

impl GameSide {
    pub fn new(franchise: FranchiseId, score: Option<f64>) -> Self {
        GameSide {
            franchise,
            name: None,
            score,
            records: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub season: Season,
    pub week: u8,
    #[serde(rename = "type")]
    pub kind: GameType,
    pub away: GameSide,
    pub home: GameSide,
}

impl Game {
    pub fn is_played(&self) -> bool {
        self.away.score.is_some() && self.home.score.is_some()
    }

    pub fn involves(&self, franchise: FranchiseId) -> bool {
        self.away.franchise == franchise || self.home.franchise == franchise
    }

    pub fn side(&self, franchise: FranchiseId) -> Option<&GameSide> {
        if self.away.franchise == franchise {
            Some(&self.away)
        } else if self.home.franchise == franchise {
            Some(&self.home)
        } else {
            None
        }
    }

    pub fn side_mut(&mut self, franchise: FranchiseId) -> Option<&mut GameSide> {
        if self.away.franchise == franchise {
            Some(&mut self.away)
        } else if self.home.franchise == franchise {
            Some(&mut self.home)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, franchise: FranchiseId) -> Option<FranchiseId> {
        if self.away.franchise == franchise {
            Some(self.home.franchise)
        } else if self.home.franchise == franchise {
            Some(self.away.franchise)
        } else {
            None
        }
    }

    /// Result for `franchise`, if it played in this game and the game has
    /// been scored.
    pub fn outcome_for(&self, franchise: FranchiseId) -> Option<Outcome> {
        let own = self.side(franchise)?.score?;
        let opponent = self.side(self.opponent_of(franchise)?)?.score?;
        Some(Outcome::from_scores(own, opponent))
    }

    /// Winner of a scored game; `None` for ties and unplayed games.
    pub fn winner(&self) -> Option<FranchiseId> {
        match self.outcome_for(self.away.franchise)? {
            Outcome::Win => Some(self.away.franchise),
            Outcome::Loss => Some(self.home.franchise),
            Outcome::Tie => None,
        }
    }

    pub fn loser(&self) -> Option<FranchiseId> {
        let winner = self.winner()?;
        self.opponent_of(winner)
    }
}
