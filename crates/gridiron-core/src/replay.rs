// State reconstruction: folds the transaction log into contracts, RFA rights,
// pick ownership and cash adjustments for a season.
//
// The fold is pure. Every call rebuilds the full snapshot from the log, so two
// runs over the same log produce identical output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::franchise::{FranchiseId, RegimeBook};
use crate::ledger::contract::{Contract, PlayerId};
use crate::ledger::pick::{Pick, PickKey, PickStatus};
use crate::ledger::rfa::RfaRight;
use crate::ledger::transaction::{
    FreeAgency, LoggedTransaction, Party, Trade, Transaction, TransactionKind, TransactionLog,
};
use crate::season::{Season, DEFAULT_DRAFT_ROUNDS};

/// Net auction budget moved to (positive) or away from (negative) a franchise
/// for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    pub franchise: FranchiseId,
    pub season: Season,
    pub amount: i64,
}

/// The derived league state for one season. Always a full replacement set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub season: Season,
    /// Sorted by player id.
    pub contracts: Vec<Contract>,
    /// Sorted by player id.
    pub rfa_rights: Vec<RfaRight>,
    /// Sorted by draft season, round, original franchise.
    pub picks: Vec<Pick>,
    /// Sorted by franchise, season. Zero balances are omitted.
    pub cash: Vec<CashBalance>,
}

impl LeagueSnapshot {
    pub fn contract(&self, player: &PlayerId) -> Option<&Contract> {
        self.contracts.iter().find(|c| &c.player == player)
    }

    pub fn rfa_right(&self, player: &PlayerId) -> Option<&RfaRight> {
        self.rfa_rights.iter().find(|r| &r.player == player)
    }

    pub fn pick(&self, key: PickKey) -> Option<&Pick> {
        self.picks.iter().find(|p| p.key() == key)
    }

    /// A player with neither a contract nor an RFA right held against them.
    pub fn is_ufa(&self, player: &PlayerId) -> bool {
        self.contract(player).is_none() && self.rfa_right(player).is_none()
    }

    /// Contracts held by a franchise.
    pub fn roster(&self, franchise: FranchiseId) -> Vec<&Contract> {
        self.contracts
            .iter()
            .filter(|c| c.franchise == franchise)
            .collect()
    }

    /// Picks currently owned by a franchise.
    pub fn picks_held_by(&self, franchise: FranchiseId) -> Vec<&Pick> {
        self.picks
            .iter()
            .filter(|p| p.current_franchise == franchise)
            .collect()
    }

    pub fn cash_for(&self, franchise: FranchiseId, season: Season) -> i64 {
        self.cash
            .iter()
            .find(|c| c.franchise == franchise && c.season == season)
            .map_or(0, |c| c.amount)
    }
}

/// Replays a transaction log against the season-aware owner lookup.
#[derive(Debug, Clone)]
pub struct Replayer<'a> {
    regimes: &'a RegimeBook,
    draft_rounds: u8,
}

impl<'a> Replayer<'a> {
    pub fn new(regimes: &'a RegimeBook) -> Self {
        Replayer {
            regimes,
            draft_rounds: DEFAULT_DRAFT_ROUNDS,
        }
    }

    pub fn with_draft_rounds(mut self, rounds: u8) -> Self {
        self.draft_rounds = rounds;
        self
    }

    /// State of the league for `as_of` after replaying every event up to and
    /// including that season.
    pub fn reconstruct(&self, as_of: Season, log: &TransactionLog) -> LeagueSnapshot {
        self.reconstruct_at(as_of, None, log)
    }

    /// State of the league for `as_of` considering only events logged for
    /// `as_of` or earlier seasons, at or before `instant` (no time limit when
    /// `None`).
    pub fn reconstruct_at(
        &self,
        as_of: Season,
        instant: Option<DateTime<Utc>>,
        log: &TransactionLog,
    ) -> LeagueSnapshot {
        let events: Vec<&LoggedTransaction> = log
            .chronological()
            .into_iter()
            .filter(|e| e.tx.season <= as_of)
            .filter(|e| instant.map_or(true, |cutoff| e.tx.timestamp <= cutoff))
            .collect();

        let mut state = ReplayState {
            as_of,
            contracts: self.seed_contracts(as_of, &events),
            rfa_rights: self.seed_rfa_rights(as_of, &events),
            picks: self.seed_picks(as_of),
            cash: BTreeMap::new(),
        };

        for entry in &events {
            let tx = &entry.tx;
            match &tx.kind {
                TransactionKind::Trade(trade) => self.apply_trade(&mut state, tx, trade),
                TransactionKind::Fa(fa) => self.apply_free_agency(&mut state, tx, fa),
                TransactionKind::DraftSelect(selection) => {
                    state.mark_pick(tx, selection.pick, PickStatus::Used)
                }
                TransactionKind::DraftPass(pass) => {
                    state.mark_pick(tx, pass.pick, PickStatus::Passed)
                }
                // Seeded before the walk.
                TransactionKind::Contract(_) | TransactionKind::RfaRightsConversion(_) => {}
                // Auctions resolve rights after the walk; expiries only feed
                // RFA conversions.
                TransactionKind::AuctionUfa(_)
                | TransactionKind::AuctionRfaMatched(_)
                | TransactionKind::AuctionRfaUnmatched(_)
                | TransactionKind::ContractExpiry(_) => {}
            }
        }

        let auction_held = events
            .iter()
            .any(|e| e.tx.season == as_of && e.tx.kind.is_auction());
        state.settle_rfa_rights(auction_held);
        state.into_snapshot()
    }

    fn resolve(&self, party: &Party, tx: &Transaction, subject: &str) -> Option<FranchiseId> {
        match party.resolve(self.regimes, tx.season) {
            Ok(franchise) => Some(franchise),
            Err(e) => {
                warn!(
                    "skipping {} ({}, season {}): {}",
                    subject,
                    tx.kind.label(),
                    tx.season,
                    e
                );
                None
            }
        }
    }

    /// Contracts still running in `as_of`. A later signing for the same
    /// player replaces an earlier one.
    fn seed_contracts(
        &self,
        as_of: Season,
        events: &[&LoggedTransaction],
    ) -> BTreeMap<PlayerId, Contract> {
        let mut contracts = BTreeMap::new();
        for entry in events {
            let tx = &entry.tx;
            let TransactionKind::Contract(signing) = &tx.kind else {
                continue;
            };
            if signing.end_year < as_of {
                continue;
            }
            let subject = format!("contract for player {}", signing.player);
            let Some(franchise) = self.resolve(&signing.franchise, tx, &subject) else {
                continue;
            };
            let contract = Contract {
                player: signing.player.clone(),
                franchise,
                salary: signing.salary,
                start_year: signing.start_year,
                end_year: signing.end_year,
                signed_at: tx.timestamp,
            };
            if let Err(e) = contract.validate() {
                warn!("skipping contract (season {}): {}", tx.season, e);
                continue;
            }
            contracts.insert(contract.player.clone(), contract);
        }
        contracts
    }

    /// Rights converted after the previous season.
    fn seed_rfa_rights(
        &self,
        as_of: Season,
        events: &[&LoggedTransaction],
    ) -> BTreeMap<PlayerId, RfaRight> {
        let mut rights = BTreeMap::new();
        let Some(rights_season) = as_of.checked_sub(1) else {
            return rights;
        };
        for entry in events {
            let tx = &entry.tx;
            let TransactionKind::RfaRightsConversion(conversion) = &tx.kind else {
                continue;
            };
            if tx.season != rights_season {
                continue;
            }
            let subject = format!("RFA conversion for player {}", conversion.player);
            let Some(franchise) = self.resolve(&conversion.franchise, tx, &subject) else {
                continue;
            };
            rights.insert(
                conversion.player.clone(),
                RfaRight {
                    player: conversion.player.clone(),
                    franchise,
                    season: rights_season,
                    converted_at: tx.timestamp,
                },
            );
        }
        rights
    }

    /// One pick per franchise per round for this season's and next season's
    /// drafts.
    fn seed_picks(&self, as_of: Season) -> BTreeMap<PickKey, Pick> {
        let mut picks = BTreeMap::new();
        for season in [as_of, as_of.saturating_add(1)] {
            let franchises = self.regimes.active_franchises(season);
            for round in 1..=self.draft_rounds {
                for &original_franchise in &franchises {
                    let key = PickKey {
                        season,
                        round,
                        original_franchise,
                    };
                    picks.insert(key, Pick::new(key));
                }
            }
        }
        picks
    }

    fn apply_trade(&self, state: &mut ReplayState, tx: &Transaction, trade: &Trade) {
        for party in &trade.parties {
            let Some(receiver) = self.resolve(&party.franchise, tx, "trade party") else {
                continue;
            };

            for player in &party.players {
                match state.contracts.get_mut(player) {
                    Some(contract) if contract.predates(tx.timestamp) => {
                        debug!(
                            "ignoring trade of player {} at {}: predates signing at {}",
                            player, tx.timestamp, contract.signed_at
                        );
                    }
                    Some(contract) => contract.franchise = receiver,
                    None => debug!(
                        "traded player {} has no contract running in {}",
                        player, state.as_of
                    ),
                }
            }

            for key in &party.picks {
                match state.picks.get_mut(key) {
                    Some(pick) => pick.current_franchise = receiver,
                    None => debug!(
                        "traded pick {}/{} (originally {}) is outside the {} pick grid",
                        key.season, key.round, key.original_franchise, state.as_of
                    ),
                }
            }

            for player in &party.rfa_rights {
                match state.rfa_rights.get_mut(player) {
                    Some(right) if tx.timestamp >= right.converted_at => right.franchise = receiver,
                    Some(_) => debug!(
                        "ignoring trade of RFA rights for player {}: predates conversion",
                        player
                    ),
                    None => debug!("traded RFA rights for player {} are not active", player),
                }
            }

            for transfer in &party.cash {
                if transfer.season < state.as_of {
                    continue;
                }
                let Some(giver) = self.resolve(&transfer.from, tx, "cash transfer") else {
                    continue;
                };
                *state.cash.entry((receiver, transfer.season)).or_insert(0) += transfer.amount;
                *state.cash.entry((giver, transfer.season)).or_insert(0) -= transfer.amount;
            }
        }
    }

    fn apply_free_agency(&self, state: &mut ReplayState, tx: &Transaction, fa: &FreeAgency) {
        let Some(franchise) = self.resolve(&fa.franchise, tx, "free-agency move") else {
            return;
        };

        for player in &fa.drops {
            let predates = state.contracts.get(player).map(|c| c.predates(tx.timestamp));
            match predates {
                Some(true) => debug!(
                    "ignoring drop of player {} at {}: predates signing",
                    player, tx.timestamp
                ),
                Some(false) => {
                    state.contracts.remove(player);
                }
                None => {}
            }
            if state
                .rfa_rights
                .get(player)
                .is_some_and(|right| tx.timestamp > right.converted_at)
            {
                debug!("RFA rights for player {} abandoned by drop", player);
                state.rfa_rights.remove(player);
            }
        }

        for add in &fa.adds {
            let end_year = add.end_year.unwrap_or(tx.season);
            if end_year < state.as_of {
                continue;
            }
            if let Some(existing) = state.contracts.get(&add.player) {
                if existing.predates(tx.timestamp) {
                    debug!(
                        "ignoring add of player {} at {}: a later contract exists",
                        add.player, tx.timestamp
                    );
                    continue;
                }
            }
            state.contracts.insert(
                add.player.clone(),
                Contract {
                    player: add.player.clone(),
                    franchise,
                    salary: add.salary,
                    start_year: None,
                    end_year,
                    signed_at: tx.timestamp,
                },
            );
        }
    }
}

/// Convenience wrapper: replays the whole log with default draft rounds.
pub fn reconstruct(as_of: Season, log: &TransactionLog, regimes: &RegimeBook) -> LeagueSnapshot {
    Replayer::new(regimes).reconstruct(as_of, log)
}

struct ReplayState {
    as_of: Season,
    contracts: BTreeMap<PlayerId, Contract>,
    rfa_rights: BTreeMap<PlayerId, RfaRight>,
    picks: BTreeMap<PickKey, Pick>,
    cash: BTreeMap<(FranchiseId, Season), i64>,
}

impl ReplayState {
    fn mark_pick(&mut self, tx: &Transaction, key: PickKey, status: PickStatus) {
        match self.picks.get_mut(&key) {
            Some(pick) => pick.status = status,
            None => debug!(
                "{} for pick {}/{} (originally {}) is outside the {} pick grid",
                tx.kind.label(),
                key.season,
                key.round,
                key.original_franchise,
                self.as_of
            ),
        }
    }

    /// Drop rights that were converted into a contract, and every remaining
    /// right once the season's auction has been held.
    fn settle_rfa_rights(&mut self, auction_held: bool) {
        let contracts = &self.contracts;
        self.rfa_rights
            .retain(|player, _| !contracts.contains_key(player));
        if auction_held && !self.rfa_rights.is_empty() {
            debug!(
                "{} unconverted RFA rights lapsed at the {} auction",
                self.rfa_rights.len(),
                self.as_of
            );
            self.rfa_rights.clear();
        }
    }

    fn into_snapshot(self) -> LeagueSnapshot {
        LeagueSnapshot {
            season: self.as_of,
            contracts: self.contracts.into_values().collect(),
            rfa_rights: self.rfa_rights.into_values().collect(),
            picks: self.picks.into_values().collect(),
            cash: self
                .cash
                .into_iter()
                .filter(|(_, amount)| *amount != 0)
                .map(|((franchise, season), amount)| CashBalance {
                    franchise,
                    season,
                    amount,
                })
                .collect(),
        }
    }
}
