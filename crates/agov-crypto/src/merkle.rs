//! # Membership Merkle Root
//!
//! Deterministic fingerprint of a group's commitment set.
//!
//! ## Algorithm
//!
//! 1. Sort the commitments lexicographically (and drop duplicates), so the
//!    root depends only on the set, never on insertion order.
//! 2. Build bottom-up: pair adjacent leaves and hash each pair with
//!    `H("agov.merkle-node.v1", left, right)`.
//! 3. An odd trailing element is carried to the next level unhashed. It is
//!    not padded with a zero leaf.
//!
//! Empty set gives [`MerkleRoot::zero()`]. A single member's root is that
//! member's commitment.
//!
//! ## Interoperability
//!
//! The carry-forward rule differs from the zero-padding used by most
//! on-chain incremental trees. A verifier that recomputes roots with a
//! padded tree will disagree with these roots for every odd-sized level.

use agov_core::{bytes_to_hex, tagged_sha256, Commitment, MerkleRoot};

const NODE_TAG: &str = "agov.merkle-node.v1";

/// Parent hash of two adjacent nodes.
pub fn node_hash(left: &str, right: &str) -> String {
    bytes_to_hex(&tagged_sha256(NODE_TAG, &[left.as_bytes(), right.as_bytes()]))
}

/// Compute the root of a commitment set.
pub fn merkle_root<'a, I>(commitments: I) -> MerkleRoot
where
    I: IntoIterator<Item = &'a Commitment>,
{
    let mut leaves: Vec<&str> = commitments.into_iter().map(Commitment::as_str).collect();
    leaves.sort_unstable();
    leaves.dedup();

    match leaves.len() {
        0 => return MerkleRoot::zero(),
        1 => return MerkleRoot::from(Commitment::new(leaves[0])),
        _ => {}
    }

    let mut level: Vec<String> = leaves.into_iter().map(str::to_string).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut pairs = level.chunks_exact(2);
        for pair in pairs.by_ref() {
            next.push(node_hash(&pair[0], &pair[1]));
        }
        if let [odd] = pairs.remainder() {
            next.push(odd.clone());
        }
        level = next;
    }

    let root = level.pop().unwrap_or_default();
    MerkleRoot::from_hex(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn c(s: &str) -> Commitment {
        Commitment::new(s)
    }

    #[test]
    fn empty_set_is_zero_root() {
        assert_eq!(merkle_root(std::iter::empty()), MerkleRoot::zero());
    }

    #[test]
    fn single_member_root_is_commitment() {
        let root = merkle_root(&[c("abc123")]);
        assert_eq!(root.as_str(), "abc123");
    }

    #[test]
    fn two_members_hash_sorted_pair() {
        let root = merkle_root(&[c("b"), c("a")]);
        assert_eq!(root.as_str(), node_hash("a", "b"));
    }

    #[test]
    fn odd_leaf_is_carried_unhashed() {
        // level 0: a b c -> level 1: H(a,b) c -> root: H(H(a,b), c)
        let root = merkle_root(&[c("c"), c("a"), c("b")]);
        let expected = node_hash(&node_hash("a", "b"), "c");
        assert_eq!(root.as_str(), expected);
    }

    #[test]
    fn five_leaves() {
        // a b c d e -> H(ab) H(cd) e -> H(H(ab),H(cd)) e -> root
        let root = merkle_root(&[c("e"), c("d"), c("c"), c("b"), c("a")]);
        let ab = node_hash("a", "b");
        let cd = node_hash("c", "d");
        let expected = node_hash(&node_hash(&ab, &cd), "e");
        assert_eq!(root.as_str(), expected);
    }

    #[test]
    fn membership_change_changes_root() {
        let before = merkle_root(&[c("a"), c("b")]);
        let after = merkle_root(&[c("a"), c("b"), c("x")]);
        assert_ne!(before, after);
    }

    #[test]
    fn duplicates_do_not_affect_root() {
        assert_eq!(merkle_root(&[c("a"), c("b"), c("a")]), merkle_root(&[c("a"), c("b")]));
    }

    proptest! {
        #[test]
        fn root_is_order_independent(mut leaves in proptest::collection::vec("[0-9a-f]{8}", 0..24)) {
            let forward: Vec<Commitment> = leaves.iter().map(|s| c(s)).collect();
            leaves.reverse();
            let backward: Vec<Commitment> = leaves.iter().map(|s| c(s)).collect();
            prop_assert_eq!(merkle_root(&forward), merkle_root(&backward));
        }
    }
}
