//! Usage ledger backends.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlUsageLedger;
pub use memory::InMemoryUsageLedger;
