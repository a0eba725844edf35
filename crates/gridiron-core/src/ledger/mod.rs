// League ledger: contracts, draft picks, RFA rights and the transaction log
// they are derived from.

pub mod contract;
pub mod pick;
pub mod rfa;
pub mod transaction;

pub use contract::{Contract, LedgerError, PlayerId};
pub use pick::{Pick, PickKey, PickStatus};
pub use rfa::RfaRight;
pub use transaction::{LoggedTransaction, Party, Transaction, TransactionKind, TransactionLog};
