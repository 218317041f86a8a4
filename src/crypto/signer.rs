//! Root Signing Contract
//!
//! Backend-independent types and traits for binding a batch root to a
//! signature. The software backend lives in `software.rs`; a hardware module
//! backend implements the same traits outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SealError};
use crate::hash::Hash;

/// Which kind of key performed the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerBackend {
    Software,
    Hsm,
}

impl SignerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerBackend::Software => "software",
            SignerBackend::Hsm => "hsm",
        }
    }
}

impl std::fmt::Display for SignerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignerBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "software" => Ok(SignerBackend::Software),
            "hsm" => Ok(SignerBackend::Hsm),
            _ => Err(format!("Unknown signer backend: {}", s)),
        }
    }
}

/// Batch facts a signer needs to build its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetadata {
    pub batch_id: Uuid,
    /// Event ids in assignment order.
    pub event_ids: Vec<i64>,
}

impl BatchMetadata {
    pub fn new(batch_id: Uuid, event_ids: Vec<i64>) -> Self {
        Self {
            batch_id,
            event_ids,
        }
    }

    pub fn event_count(&self) -> usize {
        self.event_ids.len()
    }
}

/// A batch root bound to a signature. Produced once per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRoot {
    pub id: Uuid,
    #[serde(with = "crate::hash::hex_hash")]
    pub root: Hash,
    #[serde(with = "crate::hash::hex_bytes")]
    pub signature: Vec<u8>,
    pub batch_id: Uuid,
    pub event_count: usize,
    pub first_event_id: i64,
    pub last_event_id: i64,
    pub signed_at: DateTime<Utc>,
    pub backend: SignerBackend,
}

impl SignedRoot {
    /// Assemble a record for `metadata`, stamping a fresh id and the current time.
    ///
    /// Fails with `InvalidInput` when the batch carries no event ids, since the
    /// first/last range cannot be derived.
    pub fn new(
        root: Hash,
        signature: Vec<u8>,
        metadata: &BatchMetadata,
        backend: SignerBackend,
    ) -> Result<Self> {
        let (first_event_id, last_event_id) =
            match (metadata.event_ids.first(), metadata.event_ids.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => {
                    return Err(SealError::InvalidInput(format!(
                        "Batch {} has no event ids to sign",
                        metadata.batch_id
                    )))
                }
            };

        Ok(Self {
            id: Uuid::new_v4(),
            root,
            signature,
            batch_id: metadata.batch_id,
            event_count: metadata.event_count(),
            first_event_id,
            last_event_id,
            signed_at: Utc::now(),
            backend,
        })
    }

    /// Re-check the stored signature with any verifier.
    pub fn verify_with(&self, verifier: &dyn SignatureVerifier) -> bool {
        verifier.verify_signature(&self.root, &self.signature)
    }

    pub fn summary(&self) -> String {
        format!(
            "Signed root {} for batch {}: events {}..={} ({}), backend: {}",
            hex::encode(self.root),
            self.batch_id,
            self.first_event_id,
            self.last_event_id,
            self.event_count,
            self.backend
        )
    }
}

/// Verification half of the signing contract.
pub trait SignatureVerifier: Send + Sync {
    /// Check `signature` over `root`. Malformed input yields `false`.
    fn verify_signature(&self, root: &[u8], signature: &[u8]) -> bool;

    /// Public key as PEM SubjectPublicKeyInfo.
    fn get_public_key(&self) -> Result<String>;
}

/// A signing backend able to attest batch roots.
pub trait RootSigner: SignatureVerifier {
    /// Sign exactly the 32-byte `root` and build the record for `metadata`.
    fn sign_root(&self, root: &[u8], metadata: &BatchMetadata) -> Result<SignedRoot>;

    fn backend(&self) -> SignerBackend;
}
