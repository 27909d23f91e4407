//! Ledger domain model, keyed entry store, and monthly aggregation.

pub mod entry;
pub mod store;
pub mod summary;

pub use entry::{EntryError, MilkEntry};
pub use store::EntryStore;
pub use summary::{summarize, BalancePosition, MonthlySummary};
