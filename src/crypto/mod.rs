//! Root Signing
//!
//! Pluggable signing of Merkle roots. `RootSigner` is the contract every
//! backend implements; `SoftwareSigner` is the in-process secp256k1 backend.

pub mod keys;
pub mod signer;
pub mod software;
pub mod verifier;

pub use signer::{BatchMetadata, RootSigner, SignatureVerifier, SignedRoot, SignerBackend};
pub use software::SoftwareSigner;
pub use verifier::PublicKeyVerifier;
