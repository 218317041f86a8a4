//! Merkle Inclusion Proofs
//!
//! Proofs are plain values: once generated they no longer reference the tree
//! and can be serialized, stored, and verified by a third party.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};
use crate::hash::{hash_pair, sha256, Hash};

/// Position of a sibling relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sibling is on the left: `H(sibling ++ current)`.
    Left,
    /// Sibling is on the right: `H(current ++ sibling)`.
    Right,
}

/// Inclusion witness for one leaf of a batch tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    #[serde(with = "crate::hash::hex_hash")]
    pub leaf_hash: Hash,
    /// Sibling hashes ordered from the leaf level upwards.
    #[serde(with = "crate::hash::hex_hashes")]
    pub siblings: Vec<Hash>,
    pub directions: Vec<Direction>,
    #[serde(with = "crate::hash::hex_hash")]
    pub root: Hash,
}

impl MerkleProof {
    /// Check `leaf_data` against the root carried by the proof itself.
    pub fn verify(&self, leaf_data: &[u8]) -> Result<bool> {
        verify_proof(leaf_data, self, &self.root)
    }

    pub fn size(&self) -> usize {
        self.siblings.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Merkle proof for leaf {}: {} siblings, root: {}",
            self.leaf_index,
            self.siblings.len(),
            hex::encode(self.root)
        )
    }
}

/// Verify that `leaf_data` is included under `expected_root`.
///
/// Returns `Ok(false)` for any mismatch. Only a proof whose sibling and
/// direction lists differ in length is reported as an error.
pub fn verify_proof(leaf_data: &[u8], proof: &MerkleProof, expected_root: &Hash) -> Result<bool> {
    if proof.siblings.len() != proof.directions.len() {
        return Err(SealError::InvalidInput(format!(
            "Malformed proof: {} siblings but {} directions",
            proof.siblings.len(),
            proof.directions.len()
        )));
    }

    let mut current = sha256(leaf_data);
    if current != proof.leaf_hash {
        return Ok(false);
    }

    for (sibling, direction) in proof.siblings.iter().zip(&proof.directions) {
        current = match direction {
            Direction::Left => hash_pair(sibling, &current),
            Direction::Right => hash_pair(&current, sibling),
        };
    }

    Ok(current == *expected_root)
}
