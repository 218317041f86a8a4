//! Property-based tests for tree and signature invariants.

use ledger_seal::{
    verify_proof, BatchMetadata, MerkleTree, RootSigner, SignatureVerifier, SoftwareSigner,
};
use proptest::{prelude::*, test_runner::Config as ProptestConfig};

/// Case count from `PROPTEST_CASES`, defaulting higher on CI.
fn proptest_config() -> ProptestConfig {
    let is_ci = std::env::var("CI").unwrap_or_default() == "true";
    let default_cases = if is_ci { 128 } else { 32 };

    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default_cases);

    ProptestConfig::with_cases(cases)
}

fn leaf_sets() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..40)
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn roots_are_deterministic(leaves in leaf_sets()) {
        let first = MerkleTree::build(&leaves).unwrap();
        let second = MerkleTree::build(&leaves).unwrap();
        prop_assert_eq!(first.root(), second.root());
    }

    #[test]
    fn every_proof_verifies(leaves in leaf_sets()) {
        let tree = MerkleTree::build(&leaves).unwrap();
        for (index, leaf) in leaves.iter().enumerate() {
            let proof = tree.generate_proof(index).unwrap();
            prop_assert!(verify_proof(leaf, &proof, &tree.root()).unwrap());
        }
    }

    #[test]
    fn changing_a_leaf_changes_the_root(
        leaves in leaf_sets(),
        index_seed in any::<usize>(),
        suffix in any::<u8>(),
    ) {
        let index = index_seed % leaves.len();
        let mut tampered = leaves.clone();
        tampered[index].push(suffix);

        let original = MerkleTree::build(&leaves).unwrap();
        let changed = MerkleTree::build(&tampered).unwrap();
        prop_assert_ne!(original.root(), changed.root());
    }

    #[test]
    fn swapping_distinct_leaves_changes_the_root(
        leaves in prop::collection::hash_set(prop::collection::vec(any::<u8>(), 1..16), 2..20),
        a_seed in any::<usize>(),
        b_seed in any::<usize>(),
    ) {
        let leaves: Vec<Vec<u8>> = leaves.into_iter().collect();
        let a = a_seed % leaves.len();
        let b = b_seed % leaves.len();
        prop_assume!(a != b);

        let mut swapped = leaves.clone();
        swapped.swap(a, b);

        let original = MerkleTree::build(&leaves).unwrap();
        let reordered = MerkleTree::build(&swapped).unwrap();
        prop_assert_ne!(original.root(), reordered.root());
    }

    #[test]
    fn corrupted_siblings_never_verify(
        leaves in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..16), 2..32),
        index_seed in any::<usize>(),
        sibling_seed in any::<usize>(),
        byte in 0usize..32,
    ) {
        let index = index_seed % leaves.len();
        let tree = MerkleTree::build(&leaves).unwrap();
        let mut proof = tree.generate_proof(index).unwrap();

        let sibling = sibling_seed % proof.siblings.len();
        proof.siblings[sibling][byte] ^= 0x80;

        prop_assert!(!verify_proof(&leaves[index], &proof, &tree.root()).unwrap());
    }

    #[test]
    fn signatures_verify_only_for_the_signed_root(
        root in prop::array::uniform32(any::<u8>()),
        flip in 0usize..32,
    ) {
        let signer = SoftwareSigner::ephemeral();
        let metadata = BatchMetadata::new(uuid::Uuid::new_v4(), vec![1, 2]);
        let record = signer.sign_root(&root, &metadata).unwrap();

        prop_assert!(signer.verify_signature(&root, &record.signature));

        let mut altered = root;
        altered[flip] ^= 0x01;
        prop_assert!(!signer.verify_signature(&altered, &record.signature));
    }
}
