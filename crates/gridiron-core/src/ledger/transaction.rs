// The append-only league transaction log.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::contract::PlayerId;
use super::pick::PickKey;
use crate::franchise::{FranchiseId, RegimeBook, ResolveError};
use crate::season::{Season, SeasonRules};

/// Who a transaction refers to: a franchise slot directly, or an owner
/// display name that has to be resolved for the transaction's season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Party {
    Franchise(FranchiseId),
    Owner(String),
}

impl Party {
    pub fn resolve(&self, regimes: &RegimeBook, season: Season) -> Result<FranchiseId, ResolveError> {
        match self {
            Party::Franchise(id) => Ok(*id),
            Party::Owner(name) => regimes.resolve(name, season),
        }
    }
}

impl From<FranchiseId> for Party {
    fn from(id: FranchiseId) -> Self {
        Party::Franchise(id)
    }
}

// ---------------------------------------------------------------------------
// Transaction payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub parties: Vec<TradeParty>,
}

/// Everything one side of a trade receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeParty {
    pub franchise: Party,
    #[serde(default)]
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub picks: Vec<PickKey>,
    #[serde(default)]
    pub cash: Vec<CashTransfer>,
    #[serde(default)]
    pub rfa_rights: Vec<PlayerId>,
}

/// Auction budget moved between franchises for a given season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashTransfer {
    pub from: Party,
    pub amount: i64,
    pub season: Season,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signing {
    pub player: PlayerId,
    pub franchise: Party,
    pub salary: u32,
    #[serde(default)]
    pub start_year: Option<Season>,
    pub end_year: Season,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionWin {
    pub player: PlayerId,
    pub franchise: Party,
    pub salary: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSelection {
    pub pick: PickKey,
    pub franchise: Party,
    pub player: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPass {
    pub pick: PickKey,
    pub franchise: Party,
}

/// In-season roster moves for one franchise at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeAgency {
    pub franchise: Party,
    #[serde(default)]
    pub adds: Vec<FreeAgentAdd>,
    #[serde(default)]
    pub drops: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeAgentAdd {
    pub player: PlayerId,
    #[serde(default)]
    pub salary: u32,
    /// Defaults to the transaction's season.
    #[serde(default)]
    pub end_year: Option<Season>,
}

/// An expiring contract turned into RFA rights. The transaction season is the
/// last season of the expired contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfaConversion {
    pub player: PlayerId,
    pub franchise: Party,
}

/// A contract reaching its end after the transaction season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractExpiry {
    pub player: PlayerId,
    pub franchise: Party,
    /// Start year of the expiring contract; absent for free-agent signings.
    #[serde(default)]
    pub start_year: Option<Season>,
}

/// Every kind of league event, distinguished by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransactionKind {
    Trade(Trade),
    Contract(Signing),
    AuctionUfa(AuctionWin),
    AuctionRfaMatched(AuctionWin),
    AuctionRfaUnmatched(AuctionWin),
    DraftSelect(DraftSelection),
    DraftPass(DraftPass),
    Fa(FreeAgency),
    RfaRightsConversion(RfaConversion),
    ContractExpiry(ContractExpiry),
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Trade(_) => "trade",
            TransactionKind::Contract(_) => "contract",
            TransactionKind::AuctionUfa(_) => "auction-ufa",
            TransactionKind::AuctionRfaMatched(_) => "auction-rfa-matched",
            TransactionKind::AuctionRfaUnmatched(_) => "auction-rfa-unmatched",
            TransactionKind::DraftSelect(_) => "draft-select",
            TransactionKind::DraftPass(_) => "draft-pass",
            TransactionKind::Fa(_) => "fa",
            TransactionKind::RfaRightsConversion(_) => "rfa-rights-conversion",
            TransactionKind::ContractExpiry(_) => "contract-expiry",
        }
    }

    pub fn is_auction(&self) -> bool {
        matches!(
            self,
            TransactionKind::AuctionUfa(_)
                | TransactionKind::AuctionRfaMatched(_)
                | TransactionKind::AuctionRfaUnmatched(_)
        )
    }
}

/// A single timestamped league event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub season: Season,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(timestamp: DateTime<Utc>, season: Season, kind: TransactionKind) -> Self {
        Transaction {
            timestamp,
            season,
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// A transaction together with its position in the original log. The
/// sequence number breaks timestamp ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedTransaction {
    pub seq: usize,
    pub tx: Transaction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLog {
    entries: Vec<LoggedTransaction>,
}

impl TransactionLog {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        transactions.into_iter().collect()
    }

    pub fn push(&mut self, tx: Transaction) {
        let seq = self.entries.len();
        self.entries.push(LoggedTransaction { seq, tx });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in log (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &LoggedTransaction> {
        self.entries.iter()
    }

    /// Entries ordered by timestamp, ties broken by log order.
    pub fn chronological(&self) -> Vec<&LoggedTransaction> {
        let mut ordered: Vec<&LoggedTransaction> = self.entries.iter().collect();
        ordered.sort_by(|a, b| a.tx.timestamp.cmp(&b.tx.timestamp).then(a.seq.cmp(&b.seq)));
        ordered
    }

    /// Returns a copy of the log with `rfa-rights-conversion` entries added for
    /// every contract expiry that confers RFA rights under its season's rule
    /// and has no explicit conversion recorded. The synthesized entries are
    /// appended, so explicit records keep their earlier sequence numbers.
    pub fn with_expiry_conversions(&self) -> TransactionLog {
        self.with_expiry_conversions_under(SeasonRules::for_season)
    }

    /// Like [`TransactionLog::with_expiry_conversions`], but each expiry is
    /// judged by the `rfa_eligibility` of `rules_for(season)`.
    pub fn with_expiry_conversions_under<F>(&self, rules_for: F) -> TransactionLog
    where
        F: Fn(Season) -> SeasonRules,
    {
        let explicit: BTreeSet<(Season, &PlayerId)> = self
            .entries
            .iter()
            .filter_map(|e| match &e.tx.kind {
                TransactionKind::RfaRightsConversion(c) => Some((e.tx.season, &c.player)),
                _ => None,
            })
            .collect();

        let synthesized: Vec<Transaction> = self
            .entries
            .iter()
            .filter_map(|e| match &e.tx.kind {
                TransactionKind::ContractExpiry(expiry) => Some((&e.tx, expiry)),
                _ => None,
            })
            .filter(|(tx, expiry)| {
                if explicit.contains(&(tx.season, &expiry.player)) {
                    return false;
                }
                let eligible = rules_for(tx.season)
                    .rfa_eligibility
                    .confers_rights(expiry.start_year);
                if !eligible {
                    debug!(
                        "contract expiry for player {} after {} confers no RFA rights",
                        expiry.player, tx.season
                    );
                }
                eligible
            })
            .map(|(tx, expiry)| {
                Transaction::new(
                    tx.timestamp,
                    tx.season,
                    TransactionKind::RfaRightsConversion(RfaConversion {
                        player: expiry.player.clone(),
                        franchise: expiry.franchise.clone(),
                    }),
                )
            })
            .collect();

        let mut log = self.clone();
        for tx in synthesized {
            log.push(tx);
        }
        log
    }
}

impl FromIterator<Transaction> for TransactionLog {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        let mut log = TransactionLog::default();
        for tx in iter {
            log.push(tx);
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, day, 12, 0, 0).unwrap()
    }

    fn fid(slot: u8) -> FranchiseId {
        FranchiseId::new(slot).unwrap()
    }

    fn expiry(day: u32, season: Season, player: &str, start_year: Option<Season>) -> Transaction {
        Transaction::new(
            ts(day),
            season,
            TransactionKind::ContractExpiry(ContractExpiry {
                player: PlayerId::new(player),
                franchise: fid(4).into(),
                start_year,
            }),
        )
    }

    #[test]
    fn deserializes_tagged_trade() {
        let value = json!({
            "type": "trade",
            "timestamp": "2023-03-02T18:30:00Z",
            "season": 2023,
            "parties": [
                { "franchise": 2, "players": ["1466"], "picks": [
                    { "season": 2024, "round": 1, "original_franchise": 7 }
                ] },
                { "franchise": "Keyon", "cash": [ { "from": 2, "amount": 15, "season": 2023 } ],
                  "rfa_rights": ["5012"] }
            ]
        });
        let tx: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(tx.season, 2023);
        assert_eq!(tx.kind.label(), "trade");
        let TransactionKind::Trade(trade) = &tx.kind else {
            panic!("expected trade, got {:?}", tx.kind);
        };
        assert_eq!(trade.parties.len(), 2);
        assert_eq!(trade.parties[0].franchise, Party::Franchise(fid(2)));
        assert_eq!(trade.parties[0].picks[0].original_franchise, fid(7));
        assert_eq!(trade.parties[1].franchise, Party::Owner("Keyon".into()));
        assert_eq!(trade.parties[1].cash[0].amount, 15);
        assert_eq!(trade.parties[1].rfa_rights, vec![PlayerId::new("5012")]);
    }

    #[test]
    fn deserializes_fa_with_defaults() {
        let value = json!({
            "type": "fa",
            "timestamp": "2023-10-04T09:00:00Z",
            "season": 2023,
            "franchise": 5,
            "adds": [ { "player": "8150" } ],
            "drops": ["4981"]
        });
        let tx: Transaction = serde_json::from_value(value).unwrap();
        let TransactionKind::Fa(fa) = tx.kind else {
            panic!("expected fa");
        };
        assert_eq!(fa.adds[0].salary, 0);
        assert_eq!(fa.adds[0].end_year, None);
        assert_eq!(fa.drops, vec![PlayerId::new("4981")]);
    }

    #[test]
    fn rejects_unknown_type_and_bad_franchise() {
        let unknown = json!({
            "type": "waiver-claim",
            "timestamp": "2023-10-04T09:00:00Z",
            "season": 2023
        });
        assert!(serde_json::from_value::<Transaction>(unknown).is_err());

        let bad_slot = json!({
            "type": "contract",
            "timestamp": "2023-08-20T09:00:00Z",
            "season": 2023,
            "player": "1",
            "franchise": 14,
            "salary": 3,
            "end_year": 2023
        });
        // 14 is not a valid slot, but it is not a string either.
        assert!(serde_json::from_value::<Transaction>(bad_slot).is_err());
    }

    #[test]
    fn serializes_with_type_tag() {
        let tx = Transaction::new(
            ts(1),
            2022,
            TransactionKind::DraftPass(DraftPass {
                pick: PickKey {
                    season: 2022,
                    round: 3,
                    original_franchise: fid(1),
                },
                franchise: fid(1).into(),
            }),
        );
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["type"], "draft-pass");
        assert_eq!(value["season"], 2022);
        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn chronological_breaks_ties_by_log_order() {
        let log = TransactionLog::new(vec![
            expiry(5, 2022, "a", Some(2020)),
            expiry(3, 2022, "b", Some(2020)),
            expiry(5, 2022, "c", Some(2020)),
        ]);
        let order: Vec<usize> = log.chronological().iter().map(|e| e.seq).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn expiry_conversions_follow_era_rule() {
        let log = TransactionLog::new(vec![
            // 2017: free-agent signing confers nothing, auction contract does.
            expiry(1, 2017, "fa-2017", None),
            expiry(1, 2017, "auction-2017", Some(2015)),
            // 2019 onwards: everything converts.
            expiry(1, 2019, "fa-2019", None),
        ]);
        let converted: Vec<(Season, String)> = log
            .with_expiry_conversions()
            .iter()
            .filter_map(|e| match &e.tx.kind {
                TransactionKind::RfaRightsConversion(c) => Some((e.tx.season, c.player.0.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            converted,
            vec![(2017, "auction-2017".to_string()), (2019, "fa-2019".to_string())]
        );
    }

    #[test]
    fn expiry_conversions_use_supplied_season_rules() {
        use crate::season::RfaEligibility;

        let log = TransactionLog::new(vec![expiry(1, 2017, "fa-2017", None)]);
        assert_eq!(log.with_expiry_conversions().len(), 1);

        let open = log.with_expiry_conversions_under(|season| SeasonRules {
            rfa_eligibility: RfaEligibility::AllContracts,
            ..SeasonRules::for_season(season)
        });
        assert_eq!(open.len(), 2);
        assert!(matches!(
            open.iter().last().map(|e| &e.tx.kind),
            Some(TransactionKind::RfaRightsConversion(c)) if c.player.0 == "fa-2017"
        ));
    }

    #[test]
    fn expiry_conversions_skip_explicit_records() {
        let explicit = Transaction::new(
            ts(2),
            2022,
            TransactionKind::RfaRightsConversion(RfaConversion {
                player: PlayerId::new("a"),
                franchise: fid(4).into(),
            }),
        );
        let log = TransactionLog::new(vec![expiry(1, 2022, "a", Some(2020)), explicit]);
        let expanded = log.with_expiry_conversions();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded, log);
    }
}
