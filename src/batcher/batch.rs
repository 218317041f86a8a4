//! Batch Records
//!
//! Immutable results of closing a batch, and the thresholds that decide when
//! a batch closes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::SignedRoot;
use crate::error::{Result, SealError};
use crate::hash::Hash;
use crate::merkle::{MerkleProof, MerkleTree};

/// Size and time thresholds for closing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub size_limit: usize,
    pub timeout: Duration,
}

impl BatchConfig {
    /// Both thresholds must be at least 1.
    pub fn new(size_limit: usize, timeout_seconds: u64) -> Result<Self> {
        let config = Self {
            size_limit,
            timeout: Duration::from_secs(timeout_seconds),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_limit < 1 {
            return Err(SealError::InvalidConfiguration(format!(
                "batch size limit must be at least 1, got {}",
                self.size_limit
            )));
        }
        if self.timeout.as_secs() < 1 {
            return Err(SealError::InvalidConfiguration(format!(
                "batch timeout must be at least 1 second, got {:?}",
                self.timeout
            )));
        }
        Ok(())
    }
}

/// What caused a batch to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseTrigger {
    Size,
    Timeout,
    Manual,
    Shutdown,
}

impl CloseTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseTrigger::Size => "size",
            CloseTrigger::Timeout => "timeout",
            CloseTrigger::Manual => "manual",
            CloseTrigger::Shutdown => "shutdown",
        }
    }
}

/// A closed group of events sharing one Merkle root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub event_ids: Vec<i64>,
    /// Leaf inputs in the same order as `event_ids`.
    #[serde(with = "crate::hash::hex_hashes")]
    pub event_hashes: Vec<Hash>,
    pub event_count: usize,
    #[serde(with = "crate::hash::hex_hash")]
    pub root: Hash,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Position of `event_id` within the batch.
    pub fn position(&self, event_id: i64) -> Option<usize> {
        self.event_ids.iter().position(|id| *id == event_id)
    }

    /// Rebuild the tree and produce an inclusion proof for `event_id`.
    ///
    /// Returns `Ok(None)` when the event is not part of this batch.
    pub fn proof_for_event(&self, event_id: i64) -> Result<Option<MerkleProof>> {
        let Some(index) = self.position(event_id) else {
            return Ok(None);
        };
        let tree = MerkleTree::build(&self.event_hashes)?;
        tree.generate_proof(index).map(Some)
    }
}

/// A batch together with its signed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBatch {
    pub batch: Batch,
    pub signed_root: SignedRoot,
    pub trigger: CloseTrigger,
}

impl SealedBatch {
    pub fn summary(&self) -> String {
        format!(
            "Batch {} sealed by {}: {} events, root: {}",
            self.batch.id,
            self.trigger.as_str(),
            self.batch.event_count,
            hex::encode(self.batch.root)
        )
    }
}

/// A close attempt that failed; its events are still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    pub trigger: CloseTrigger,
    /// Event ids left in the open batch, in insertion order.
    pub event_ids: Vec<i64>,
    pub error: SealError,
}

impl CloseFailure {
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch close by {} failed, {} events remain pending: {}",
            self.trigger.as_str(),
            self.event_ids.len(),
            self.error
        )
    }
}
