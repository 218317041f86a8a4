//! Tamper-evidence for append-only event ledgers.
//!
//! Events are batched, each batch is summarized by a Merkle root, and the
//! root is signed so any party can later prove inclusion of an event and
//! detect modification of a sealed batch.

pub mod batcher;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod store;

pub use batcher::{Batch, BatchConfig, Batcher, CloseFailure, CloseTrigger, SealedBatch};
pub use config::SealConfig;
pub use crypto::{
    BatchMetadata, PublicKeyVerifier, RootSigner, SignatureVerifier, SignedRoot, SignerBackend,
    SoftwareSigner,
};
pub use error::{Result, SealError};
pub use hash::{sha256, Hash};
pub use merkle::{verify_proof, Direction, MerkleProof, MerkleTree};
pub use store::{JsonlRootStore, MemoryRootStore, RootStore};
