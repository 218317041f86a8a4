//! Shared test helpers

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ledger_seal::{
    sha256, BatchMetadata, Hash, RootSigner, SealError, SignatureVerifier, SignedRoot,
    SignerBackend, SoftwareSigner,
};

pub const FIXTURE_PASSPHRASE: &str = "correct-horse";
pub const FIXTURE_PUBLIC_KEY_HEX: &str =
    "034f7e3df2910eaa969c6bb680e4578edb7dab65d01eacdf19955b4328e828412e";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("fixture should be readable")
}

/// Deterministic event hash for `event_id`.
pub fn event_hash(event_id: i64) -> Hash {
    sha256(format!("ledger-event-{}", event_id).as_bytes())
}

pub fn test_signer() -> Arc<SoftwareSigner> {
    Arc::new(SoftwareSigner::ephemeral())
}

/// Signer that fails a configurable number of times before delegating.
pub struct FlakySigner {
    inner: SoftwareSigner,
    failures_left: AtomicUsize,
}

impl FlakySigner {
    pub fn failing(times: usize) -> Self {
        Self {
            inner: SoftwareSigner::ephemeral(),
            failures_left: AtomicUsize::new(times),
        }
    }
}

impl SignatureVerifier for FlakySigner {
    fn verify_signature(&self, root: &[u8], signature: &[u8]) -> bool {
        self.inner.verify_signature(root, signature)
    }

    fn get_public_key(&self) -> ledger_seal::Result<String> {
        self.inner.get_public_key()
    }
}

impl RootSigner for FlakySigner {
    fn sign_root(&self, root: &[u8], metadata: &BatchMetadata) -> ledger_seal::Result<SignedRoot> {
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(SealError::SigningFailure("key unavailable".to_string()));
        }
        self.inner.sign_root(root, metadata)
    }

    fn backend(&self) -> SignerBackend {
        SignerBackend::Software
    }
}
