//! Hash primitives
//!
//! Fixed 32-byte SHA-256 digests shared by the tree, batcher and signer,
//! plus hex helpers used wherever hashes cross a text boundary.

use sha2::{Digest, Sha256};

use crate::error::{Result, SealError};

/// Length in bytes of every leaf, node and root hash.
pub const HASH_LEN: usize = 32;

/// A SHA-256 digest.
pub type Hash = [u8; HASH_LEN];

/// Hash arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hash of `left ++ right`. Order is part of the wire format.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Copy a slice into a `Hash`, rejecting anything that is not 32 bytes.
pub fn hash_from_slice(bytes: &[u8], what: &str) -> Result<Hash> {
    <Hash>::try_from(bytes).map_err(|_| SealError::wrong_hash_length(what, bytes.len()))
}

/// Parse a lowercase or uppercase hex string into a `Hash`.
pub fn parse_hash(hex_str: &str) -> Result<Hash> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| SealError::InvalidInput(format!("Invalid hash hex: {}", e)))?;
    hash_from_slice(&bytes, "hash")
}

/// Serde adapter encoding a single `Hash` as hex.
pub mod hex_hash {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Hash;

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hash(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter encoding a `Vec<Hash>` as a list of hex strings.
pub mod hex_hashes {
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use super::Hash;

    pub fn serialize<S: Serializer>(hashes: &[Hash], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(hashes.len()))?;
        for hash in hashes {
            seq.serialize_element(&hex::encode(hash))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Hash>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| super::parse_hash(s).map_err(D::Error::custom))
            .collect()
    }
}

/// Serde adapter encoding variable-length bytes (signatures) as hex.
pub mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}
