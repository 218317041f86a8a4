//! Signed Root Persistence
//!
//! Sinks that receive signed root records once a batch has been sealed.
//! Writes are best-effort from the signer's point of view: a signature stays
//! valid whether or not it was stored.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlRootStore;
pub use memory::MemoryRootStore;

use crate::crypto::SignedRoot;
use crate::error::Result;

/// Destination for signed root records.
pub trait RootStore: Send + Sync {
    fn store(&self, record: &SignedRoot) -> Result<()>;
}
