//! Verification-only key holder for parties that never see the private key.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, Verification, VerifyOnly};

use crate::crypto::keys;
use crate::crypto::signer::SignatureVerifier;
use crate::error::Result;
use crate::hash::{sha256, HASH_LEN};

/// Check a DER signature over `SHA-256(root)`. Any malformed input is `false`.
pub(crate) fn verify_root_signature<C: Verification>(
    secp: &Secp256k1<C>,
    public_key: &PublicKey,
    root: &[u8],
    signature: &[u8],
) -> bool {
    if root.len() != HASH_LEN || signature.is_empty() {
        return false;
    }

    let Ok(signature) = Signature::from_der(signature) else {
        return false;
    };
    let Ok(message) = Message::from_digest_slice(&sha256(root)) else {
        return false;
    };

    secp.verify_ecdsa(&message, &signature, public_key).is_ok()
}

/// Verifies signed roots against a distributed public key.
#[derive(Debug, Clone)]
pub struct PublicKeyVerifier {
    secp: Secp256k1<VerifyOnly>,
    public_key: PublicKey,
}

impl PublicKeyVerifier {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            secp: Secp256k1::verification_only(),
            public_key,
        }
    }

    /// Build from a PEM SubjectPublicKeyInfo as returned by `get_public_key`.
    pub fn from_public_key_pem(pem: &str) -> Result<Self> {
        Ok(Self::new(keys::parse_public_key_pem(pem)?))
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl SignatureVerifier for PublicKeyVerifier {
    fn verify_signature(&self, root: &[u8], signature: &[u8]) -> bool {
        verify_root_signature(&self.secp, &self.public_key, root, signature)
    }

    fn get_public_key(&self) -> Result<String> {
        keys::public_key_to_pem(&self.public_key)
    }
}
