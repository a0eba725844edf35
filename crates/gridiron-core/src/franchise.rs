// Franchise slots and the season-aware owner lookup (regimes).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::season::{Season, SeasonRules};

/// Highest franchise slot number in the league.
pub const MAX_FRANCHISES: u8 = 12;

/// A persistent league slot (1-12). Survives ownership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FranchiseId(u8);

impl FranchiseId {
    /// Returns `None` for slots outside 1..=12.
    pub fn new(slot: u8) -> Option<Self> {
        (1..=MAX_FRANCHISES).contains(&slot).then_some(FranchiseId(slot))
    }

    /// For slot tables known to be in range.
    pub(crate) const fn new_unchecked(slot: u8) -> Self {
        FranchiseId(slot)
    }

    pub fn slot(self) -> u8 {
        self.0
    }

    /// Slots 1..=count, clamped to the league maximum.
    pub fn first(count: u8) -> impl Iterator<Item = FranchiseId> {
        (1..=count.min(MAX_FRANCHISES)).map(FranchiseId)
    }
}

impl TryFrom<u8> for FranchiseId {
    type Error = String;

    fn try_from(slot: u8) -> Result<Self, Self::Error> {
        FranchiseId::new(slot)
            .ok_or_else(|| format!("franchise slot {slot} is outside 1..={MAX_FRANCHISES}"))
    }
}

impl From<FranchiseId> for u8 {
    fn from(id: FranchiseId) -> u8 {
        id.0
    }
}

impl fmt::Display for FranchiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Regimes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no franchise held by `{name}` in {season}")]
    Unknown { name: String, season: Season },

    #[error("`{name}` held several franchises in {season}: {franchises:?}")]
    Ambiguous {
        name: String,
        season: Season,
        franchises: Vec<FranchiseId>,
    },
}

/// One owner's (or ownership group's) stint on a franchise slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenure {
    /// Display name used in the source records for this owner.
    pub name: String,
    pub franchise: FranchiseId,
    /// First season of the stint.
    pub from: Season,
    /// Last season of the stint; open-ended when absent.
    #[serde(default)]
    pub to: Option<Season>,
}

impl Tenure {
    pub fn covers(&self, season: Season) -> bool {
        season >= self.from && self.to.map_or(true, |to| season <= to)
    }
}

/// Season-parameterized lookup from owner display names to franchise slots.
///
/// Owners move between slots, co-own slots, and slots change hands between
/// seasons, so every lookup is keyed by season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegimeBook {
    tenures: Vec<Tenure>,
}

impl RegimeBook {
    pub fn new(tenures: Vec<Tenure>) -> Self {
        RegimeBook { tenures }
    }

    pub fn is_empty(&self) -> bool {
        self.tenures.is_empty()
    }

    pub fn tenures(&self) -> &[Tenure] {
        &self.tenures
    }

    /// Resolve an owner display name to the franchise it held in `season`.
    ///
    /// Matching ignores case and surrounding whitespace. A name covering more
    /// than one slot in the season is ambiguous and is never guessed.
    pub fn resolve(&self, name: &str, season: Season) -> Result<FranchiseId, ResolveError> {
        let wanted = name.trim();
        let matches: BTreeSet<FranchiseId> = self
            .tenures
            .iter()
            .filter(|t| t.covers(season) && t.name.trim().eq_ignore_ascii_case(wanted))
            .map(|t| t.franchise)
            .collect();

        let mut iter = matches.iter();
        match (iter.next(), iter.next()) {
            (Some(&only), None) => Ok(only),
            (None, _) => Err(ResolveError::Unknown {
                name: wanted.to_string(),
                season,
            }),
            (Some(_), Some(_)) => Err(ResolveError::Ambiguous {
                name: wanted.to_string(),
                season,
                franchises: matches.into_iter().collect(),
            }),
        }
    }

    /// Display name of a franchise in `season`. Co-owners are joined with `/`
    /// in tenure order.
    pub fn display_name(&self, franchise: FranchiseId, season: Season) -> Option<String> {
        let names: Vec<&str> = self
            .tenures
            .iter()
            .filter(|t| t.franchise == franchise && t.covers(season))
            .map(|t| t.name.as_str())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join("/"))
        }
    }

    /// Franchise slots with an owner in `season`. Falls back to the built-in
    /// slot count for that season when no tenure covers it.
    pub fn active_franchises(&self, season: Season) -> BTreeSet<FranchiseId> {
        let active: BTreeSet<FranchiseId> = self
            .tenures
            .iter()
            .filter(|t| t.covers(season))
            .map(|t| t.franchise)
            .collect();
        if active.is_empty() {
            FranchiseId::first(SeasonRules::for_season(season).franchise_count).collect()
        } else {
            active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(slot: u8) -> FranchiseId {
        FranchiseId::new(slot).unwrap()
    }

    fn tenure(name: &str, slot: u8, from: Season, to: Option<Season>) -> Tenure {
        Tenure {
            name: name.to_string(),
            franchise: fid(slot),
            from,
            to,
        }
    }

    fn sample_book() -> RegimeBook {
        RegimeBook::new(vec![
            tenure("Keyon", 1, 2008, None),
            tenure("Brett", 2, 2008, Some(2013)),
            tenure("Luke", 2, 2014, None),
            tenure("Schex", 3, 2008, Some(2011)),
            tenure("Schex", 4, 2011, Some(2011)),
            tenure("Jeff", 5, 2012, None),
            tenure("Mitch", 5, 2012, None),
        ])
    }

    #[test]
    fn franchise_id_rejects_out_of_range_slots() {
        assert!(FranchiseId::new(0).is_none());
        assert!(FranchiseId::new(13).is_none());
        assert_eq!(FranchiseId::new(12).map(FranchiseId::slot), Some(12));
        assert!(FranchiseId::try_from(99).is_err());
    }

    #[test]
    fn franchise_id_serde_validates() {
        let ok: FranchiseId = serde_json::from_str("7").unwrap();
        assert_eq!(ok.slot(), 7);
        assert!(serde_json::from_str::<FranchiseId>("13").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "7");
    }

    #[test]
    fn resolve_respects_tenure_boundaries() {
        let book = sample_book();
        assert_eq!(book.resolve("Brett", 2013), Ok(fid(2)));
        assert_eq!(book.resolve("Luke", 2014), Ok(fid(2)));
        assert!(matches!(
            book.resolve("Brett", 2014),
            Err(ResolveError::Unknown { .. })
        ));
    }

    #[test]
    fn resolve_is_case_and_whitespace_insensitive() {
        let book = sample_book();
        assert_eq!(book.resolve("  keyon ", 2020), Ok(fid(1)));
    }

    #[test]
    fn resolve_reports_ambiguous_owner() {
        let book = sample_book();
        match book.resolve("Schex", 2011) {
            Err(ResolveError::Ambiguous { franchises, .. }) => {
                assert_eq!(franchises, vec![fid(3), fid(4)]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
        assert_eq!(book.resolve("Schex", 2010), Ok(fid(3)));
    }

    #[test]
    fn display_name_joins_co_owners() {
        let book = sample_book();
        assert_eq!(book.display_name(fid(5), 2015).as_deref(), Some("Jeff/Mitch"));
        assert_eq!(book.display_name(fid(2), 2010).as_deref(), Some("Brett"));
        assert!(book.display_name(fid(9), 2010).is_none());
    }

    #[test]
    fn active_franchises_falls_back_to_rules() {
        let empty = RegimeBook::default();
        assert_eq!(empty.active_franchises(2010).len(), 10);
        assert_eq!(empty.active_franchises(2015).len(), 12);

        let book = sample_book();
        let active: Vec<u8> = book.active_franchises(2015).into_iter().map(u8::from).collect();
        assert_eq!(active, vec![1, 2, 5]);
    }
}
