//! Software Signing Backend
//!
//! ECDSA over secp256k1 with a private key loaded from PEM. Nonces follow
//! RFC 6979, so signing the same root with the same key is deterministic.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey};
use tracing::{info, warn};

use crate::crypto::keys;
use crate::crypto::signer::{BatchMetadata, RootSigner, SignatureVerifier, SignedRoot, SignerBackend};
use crate::crypto::verifier::verify_root_signature;
use crate::error::{Result, SealError};
use crate::hash::{hash_from_slice, sha256};
use crate::store::RootStore;

/// Signs batch roots with a locally held secp256k1 key.
pub struct SoftwareSigner {
    secp: Secp256k1<All>,
    secret_key: SecretKey,
    public_key: PublicKey,
    store: Option<Arc<dyn RootStore>>,
    store_failures: AtomicU64,
}

impl std::fmt::Debug for SoftwareSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSigner")
            .field("public_key", &self.public_key_hex())
            .field("store", &self.store.is_some())
            .field("store_failures", &self.store_failures())
            .finish()
    }
}

impl SoftwareSigner {
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secp,
            secret_key,
            public_key,
            store: None,
            store_failures: AtomicU64::new(0),
        }
    }

    /// Load the signing key from PEM text.
    pub fn from_pem(pem: &str, passphrase: Option<&str>) -> Result<Self> {
        let secret_key = keys::load_private_key_pem(pem, passphrase)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Load the signing key from a PEM file.
    pub fn from_key_file(path: &Path, passphrase: Option<&str>) -> Result<Self> {
        let secret_key = keys::load_private_key_file(path, passphrase)?;
        let signer = Self::from_secret_key(secret_key);
        info!("Loaded signing key {} from {:?}", signer.public_key_hex(), path);
        Ok(signer)
    }

    /// Signer with a fresh random key. Intended for tests and local runs.
    pub fn ephemeral() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    /// Persist every produced record to `store` on a best-effort basis.
    pub fn with_store(mut self, store: Arc<dyn RootStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Compressed SEC1 public key as hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Number of records whose persistence failed after signing.
    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    fn sign_digest(&self, root: &[u8; 32]) -> Result<Signature> {
        let digest = sha256(root);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| SealError::SigningFailure(format!("Invalid message digest: {}", e)))?;
        Ok(self.secp.sign_ecdsa(&message, &self.secret_key))
    }

    fn persist(&self, record: &SignedRoot) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.store(record) {
            self.store_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Signed root {} for batch {} was not persisted: {}",
                record.id, record.batch_id, e
            );
        }
    }
}

impl SignatureVerifier for SoftwareSigner {
    fn verify_signature(&self, root: &[u8], signature: &[u8]) -> bool {
        verify_root_signature(&self.secp, &self.public_key, root, signature)
    }

    fn get_public_key(&self) -> Result<String> {
        keys::public_key_to_pem(&self.public_key)
    }
}

impl RootSigner for SoftwareSigner {
    fn sign_root(&self, root: &[u8], metadata: &BatchMetadata) -> Result<SignedRoot> {
        let root = hash_from_slice(root, "Merkle root")?;
        let signature = self.sign_digest(&root)?;

        let record = SignedRoot::new(
            root,
            signature.serialize_der().to_vec(),
            metadata,
            SignerBackend::Software,
        )?;

        self.persist(&record);
        Ok(record)
    }

    fn backend(&self) -> SignerBackend {
        SignerBackend::Software
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SealError;
    use crate::store::MemoryRootStore;

    struct FailingStore;

    impl RootStore for FailingStore {
        fn store(&self, _record: &SignedRoot) -> Result<()> {
            Err(SealError::StorageError("disk full".to_string()))
        }
    }

    fn metadata() -> BatchMetadata {
        BatchMetadata::new(uuid::Uuid::new_v4(), vec![4, 5, 6])
    }

    #[test]
    fn test_signature_is_deterministic_per_key() {
        let signer = SoftwareSigner::ephemeral();
        let root = [9u8; 32];

        let first = signer.sign_root(&root, &metadata()).unwrap();
        let second = signer.sign_root(&root, &metadata()).unwrap();

        assert_eq!(first.signature, second.signature);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_rejects_wrong_length_root() {
        let signer = SoftwareSigner::ephemeral();
        assert!(matches!(
            signer.sign_root(&[1u8; 31], &metadata()),
            Err(SealError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_records_are_persisted() {
        let store = Arc::new(MemoryRootStore::new());
        let signer = SoftwareSigner::ephemeral().with_store(store.clone());

        let record = signer.sign_root(&[2u8; 32], &metadata()).unwrap();

        assert_eq!(store.records(), vec![record]);
    }

    #[test]
    fn test_store_failure_does_not_fail_signing() {
        let signer = SoftwareSigner::ephemeral().with_store(Arc::new(FailingStore));

        let record = signer.sign_root(&[3u8; 32], &metadata()).unwrap();

        assert!(signer.verify_signature(&record.root, &record.signature));
        assert_eq!(signer.store_failures(), 1);
    }

    #[test]
    fn test_malformed_inputs_do_not_verify() {
        let signer = SoftwareSigner::ephemeral();
        let record = signer.sign_root(&[4u8; 32], &metadata()).unwrap();

        assert!(!signer.verify_signature(&record.root[..16], &record.signature));
        assert!(!signer.verify_signature(&record.root, &[]));
        assert!(!signer.verify_signature(&record.root, b"garbage"));
    }

    #[test]
    fn test_debug_hides_secret_key() {
        let signer = SoftwareSigner::ephemeral();
        let rendered = format!("{:?}", signer);
        assert!(!rendered.contains(&hex::encode(signer.secret_key.secret_bytes())));
        assert!(rendered.contains(&signer.public_key_hex()));
    }
}
