//! Store implementations
//!
//! Contains DryRunStore and MemoryStore.

mod dry_run;
mod memory;

pub use self::dry_run::DryRunStore;
pub use self::memory::{MemoryStore, RecordedBatch};
