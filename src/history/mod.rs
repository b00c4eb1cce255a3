//! Observed-state history: the audit ledger and the noise channel that
//! writes to it.

pub mod channel;
pub mod ledger;

pub use channel::EnvironmentChannel;
pub use ledger::{EntryKind, HistoryEntry, HistoryLedger};
