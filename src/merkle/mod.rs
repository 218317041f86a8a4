//! Merkle Tree Engine
//!
//! Builds a binary SHA-256 tree over an ordered batch of leaves and produces
//! compact inclusion proofs that can be checked without the tree.

pub mod proof;
pub mod tree;

pub use proof::{verify_proof, Direction, MerkleProof};
pub use tree::MerkleTree;
