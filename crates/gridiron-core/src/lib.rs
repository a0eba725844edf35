// League history engine: ledger replay and season standings.
//
// Everything here is pure and synchronous. Loading, persistence and the
// command-line runner live in gridiron-app.

pub mod division;
pub mod franchise;
pub mod game;
pub mod ledger;
pub mod records;
pub mod replay;
pub mod season;
pub mod standings;

pub use franchise::{FranchiseId, RegimeBook, ResolveError, Tenure};
pub use game::{Game, GameType, WinLoss};
pub use replay::{reconstruct, LeagueSnapshot, Replayer};
pub use season::{Season, SeasonRules, TiebreakerStrategy};
pub use standings::{compute, standings, Standings, StandingsEntry};
