//! Event Batching
//!
//! Groups incoming event hashes into batches that close on size or time,
//! builds the batch Merkle tree, and has the root signed.

pub mod batch;
pub mod service;

pub use batch::{Batch, BatchConfig, CloseFailure, CloseTrigger, SealedBatch};
pub use service::Batcher;
