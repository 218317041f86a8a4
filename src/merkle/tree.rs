//! Merkle Tree Construction
//!
//! Level-by-level tree over a fixed leaf sequence. Every level is cached so
//! proofs can be generated after the root is taken.

use tracing::debug;

use crate::error::{Result, SealError};
use crate::hash::{hash_pair, sha256, Hash};
use crate::merkle::proof::{Direction, MerkleProof};

/// Immutable Merkle tree over one batch.
///
/// `levels[0]` holds the hashed leaves and the last level holds only the root.
/// An odd-length level pairs its final node with itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree from raw leaf bytes. Each leaf is hashed before pairing.
    pub fn build<L: AsRef<[u8]>>(leaves: &[L]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(SealError::InvalidInput(
                "Cannot build Merkle tree from empty leaf sequence".to_string(),
            ));
        }

        let leaf_level: Vec<Hash> = leaves.iter().map(|leaf| sha256(leaf.as_ref())).collect();
        let mut levels = vec![leaf_level];

        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        debug!(
            "Built Merkle tree: {} leaves, {} levels",
            leaves.len(),
            levels.len()
        );

        Ok(Self { levels })
    }

    /// Root hash of the tree.
    pub fn root(&self) -> Hash {
        // build() guarantees at least one level with exactly one node on top
        self.levels[self.levels.len() - 1][0]
    }

    /// Alias of [`MerkleTree::root`].
    pub fn get_root(&self) -> Hash {
        self.root()
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels including the leaf level and the root level.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Hashes stored at `index`, where level 0 is the hashed leaves.
    pub fn level(&self, index: usize) -> Option<&[Hash]> {
        self.levels.get(index).map(Vec::as_slice)
    }

    /// Hashed leaf at `leaf_index`.
    pub fn leaf_hash(&self, leaf_index: usize) -> Option<Hash> {
        self.levels[0].get(leaf_index).copied()
    }

    /// Generate an inclusion proof for the leaf at `leaf_index`.
    pub fn generate_proof(&self, leaf_index: usize) -> Result<MerkleProof> {
        let leaf_count = self.leaf_count();
        if leaf_index >= leaf_count {
            return Err(SealError::IndexOutOfRange {
                index: leaf_index,
                leaf_count,
            });
        }

        let path_len = self.levels.len() - 1;
        let mut siblings = Vec::with_capacity(path_len);
        let mut directions = Vec::with_capacity(path_len);
        let mut index = leaf_index;

        for level in &self.levels[..path_len] {
            if index % 2 == 0 {
                // Unpaired last node is its own sibling
                let sibling = level.get(index + 1).unwrap_or(&level[index]);
                siblings.push(*sibling);
                directions.push(Direction::Right);
            } else {
                siblings.push(level[index - 1]);
                directions.push(Direction::Left);
            }
            index /= 2;
        }

        Ok(MerkleProof {
            leaf_index,
            leaf_hash: self.levels[0][leaf_index],
            siblings,
            directions,
            root: self.root(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!("event-{}", i).into_bytes()).collect()
    }

    #[test]
    fn test_empty_leaves_rejected() {
        let empty: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(
            MerkleTree::build(&empty),
            Err(SealError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let tree = MerkleTree::build(&[b"only".to_vec()]).unwrap();
        assert_eq!(tree.root(), sha256(b"only"));
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_level_sizes_for_five_leaves() {
        let tree = MerkleTree::build(&leaves(5)).unwrap();
        let sizes: Vec<usize> = (0..tree.depth())
            .map(|i| tree.level(i).unwrap().len())
            .collect();
        assert_eq!(sizes, vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_proof_path_length_matches_depth() {
        let tree = MerkleTree::build(&leaves(8)).unwrap();
        let proof = tree.generate_proof(5).unwrap();
        assert_eq!(proof.siblings.len(), 3);
        assert_eq!(proof.directions.len(), 3);
        assert_eq!(proof.root, tree.root());
    }

    #[test]
    fn test_last_odd_leaf_uses_itself_as_sibling() {
        let tree = MerkleTree::build(&leaves(3)).unwrap();
        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(proof.siblings[0], tree.leaf_hash(2).unwrap());
        assert_eq!(proof.directions[0], Direction::Right);
    }

    #[test]
    fn test_out_of_range_index() {
        let tree = MerkleTree::build(&leaves(4)).unwrap();
        assert!(matches!(
            tree.generate_proof(4),
            Err(SealError::IndexOutOfRange {
                index: 4,
                leaf_count: 4
            })
        ));
    }
}
