//! # Commitment Group Store
//!
//! Owns each group's set of public commitments and its current Merkle root.
//!
//! ## Invariants
//!
//! - No duplicate commitment within a group (the set enforces it).
//! - The cached root always equals `merkle_root(members)`. It is recomputed
//!   inside the same write lock as every membership change, so a reader
//!   never sees members and root out of step.
//! - Identical membership sets give identical roots regardless of the
//!   order in which members were added.
//!
//! Membership mutation is optimistic: nothing here locks against proofs
//! that are still being generated. A proof built against a root that has
//! since changed is rejected by the verifier's freshness check.

use std::collections::BTreeSet;

use agov_core::{Commitment, GovernanceError, GroupId, MerkleRoot};
use agov_crypto::merkle_root;
use serde::{Deserialize, Serialize};

use crate::store::Store;

/// A group's membership and its current root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    members: BTreeSet<Commitment>,
    root: MerkleRoot,
}

impl Group {
    fn new(id: GroupId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            root: MerkleRoot::zero(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &Commitment> {
        self.members.iter()
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn root(&self) -> &MerkleRoot {
        &self.root
    }

    fn refresh_root(&mut self) {
        self.root = merkle_root(&self.members);
    }
}

/// Per-group commitment sets keyed by group id.
#[derive(Debug, Clone, Default)]
pub struct CommitmentGroupStore {
    groups: Store<GroupId, Group>,
}

impl CommitmentGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty group. Returns `false` if it already exists.
    pub fn create_group(&self, group_id: &GroupId) -> bool {
        let created = self
            .groups
            .insert_if_absent(group_id.clone(), Group::new(group_id.clone()));
        if created {
            tracing::info!(group_id = %group_id, "group created");
        }
        created
    }

    pub fn exists(&self, group_id: &GroupId) -> bool {
        self.groups.contains(group_id)
    }

    /// Add a commitment. A commitment that is already present is a no-op
    /// and returns `Ok(false)`.
    pub fn add_member(
        &self,
        group_id: &GroupId,
        commitment: Commitment,
    ) -> Result<bool, GovernanceError> {
        let added = self
            .groups
            .try_update(group_id, |group| {
                if !group.members.insert(commitment) {
                    return Ok::<_, GovernanceError>(false);
                }
                group.refresh_root();
                Ok(true)
            })
            .ok_or_else(|| not_found(group_id))??;
        if added {
            tracing::info!(group_id = %group_id, "member added");
        }
        Ok(added)
    }

    /// Add a commitment that must not already be present.
    pub fn add_new_member(
        &self,
        group_id: &GroupId,
        commitment: Commitment,
    ) -> Result<(), GovernanceError> {
        if self.add_member(group_id, commitment)? {
            Ok(())
        } else {
            Err(GovernanceError::AlreadyMember {
                group_id: group_id.to_string(),
            })
        }
    }

    /// Remove a commitment. Fails with `MemberNotFound` if absent.
    pub fn remove_member(
        &self,
        group_id: &GroupId,
        commitment: &Commitment,
    ) -> Result<(), GovernanceError> {
        self.groups
            .try_update(group_id, |group| {
                if !group.members.remove(commitment) {
                    return Err(GovernanceError::MemberNotFound {
                        group_id: group_id.to_string(),
                    });
                }
                group.refresh_root();
                Ok(())
            })
            .ok_or_else(|| not_found(group_id))??;
        tracing::info!(group_id = %group_id, "member removed");
        Ok(())
    }

    /// Current root of the group.
    pub fn merkle_root(&self, group_id: &GroupId) -> Result<MerkleRoot, GovernanceError> {
        self.groups
            .read(group_id, |g| g.root.clone())
            .ok_or_else(|| not_found(group_id))
    }

    /// Plaintext set membership. `false` for unknown groups.
    pub fn contains(&self, group_id: &GroupId, commitment: &Commitment) -> bool {
        self.groups
            .read(group_id, |g| g.members.contains(commitment))
            .unwrap_or(false)
    }

    /// Number of members, `None` for unknown groups.
    pub fn group_size(&self, group_id: &GroupId) -> Option<usize> {
        self.groups.read(group_id, Group::size)
    }

    pub fn get(&self, group_id: &GroupId) -> Option<Group> {
        self.groups.get(group_id)
    }
}

fn not_found(group_id: &GroupId) -> GovernanceError {
    GovernanceError::GroupNotFound {
        group_id: group_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CommitmentGroupStore, GroupId) {
        let store = CommitmentGroupStore::new();
        let gid = GroupId::from("dao-1");
        assert!(store.create_group(&gid));
        (store, gid)
    }

    #[test]
    fn create_group_is_idempotent() {
        let (store, gid) = setup();
        assert!(!store.create_group(&gid));
        assert!(store.exists(&gid));
    }

    #[test]
    fn new_group_has_zero_root() {
        let (store, gid) = setup();
        assert_eq!(store.merkle_root(&gid).unwrap(), MerkleRoot::zero());
        assert_eq!(store.group_size(&gid), Some(0));
    }

    #[test]
    fn add_member_is_noop_when_present() {
        let (store, gid) = setup();
        assert!(store.add_member(&gid, Commitment::new("a")).unwrap());
        let root = store.merkle_root(&gid).unwrap();
        assert!(!store.add_member(&gid, Commitment::new("a")).unwrap());
        assert_eq!(store.merkle_root(&gid).unwrap(), root);
        assert_eq!(store.group_size(&gid), Some(1));
    }

    #[test]
    fn add_new_member_rejects_duplicate() {
        let (store, gid) = setup();
        store.add_new_member(&gid, Commitment::new("a")).unwrap();
        let err = store.add_new_member(&gid, Commitment::new("a")).unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyMember { .. }));
    }

    #[test]
    fn unknown_group_errors() {
        let store = CommitmentGroupStore::new();
        let gid = GroupId::from("nope");
        assert!(matches!(
            store.add_member(&gid, Commitment::new("a")),
            Err(GovernanceError::GroupNotFound { .. })
        ));
        assert!(matches!(
            store.merkle_root(&gid),
            Err(GovernanceError::GroupNotFound { .. })
        ));
        assert!(!store.contains(&gid, &Commitment::new("a")));
        assert_eq!(store.group_size(&gid), None);
    }

    #[test]
    fn remove_missing_member_errors() {
        let (store, gid) = setup();
        let err = store.remove_member(&gid, &Commitment::new("x")).unwrap_err();
        assert!(matches!(err, GovernanceError::MemberNotFound { .. }));
    }

    #[test]
    fn single_member_root_is_commitment() {
        let (store, gid) = setup();
        store.add_member(&gid, Commitment::new("abc")).unwrap();
        assert_eq!(store.merkle_root(&gid).unwrap().as_str(), "abc");
    }

    #[test]
    fn insertion_order_does_not_change_root() {
        let (s1, g1) = setup();
        let (s2, g2) = setup();
        s1.add_member(&g1, Commitment::new("A")).unwrap();
        s1.add_member(&g1, Commitment::new("B")).unwrap();
        s2.add_member(&g2, Commitment::new("B")).unwrap();
        s2.add_member(&g2, Commitment::new("A")).unwrap();
        assert_eq!(s1.merkle_root(&g1).unwrap(), s2.merkle_root(&g2).unwrap());
    }

    #[test]
    fn remove_restores_previous_root() {
        let (store, gid) = setup();
        store.add_member(&gid, Commitment::new("a")).unwrap();
        store.add_member(&gid, Commitment::new("b")).unwrap();
        let before = store.merkle_root(&gid).unwrap();
        store.add_member(&gid, Commitment::new("c")).unwrap();
        assert_ne!(store.merkle_root(&gid).unwrap(), before);
        store.remove_member(&gid, &Commitment::new("c")).unwrap();
        assert_eq!(store.merkle_root(&gid).unwrap(), before);
        assert!(!store.contains(&gid, &Commitment::new("c")));
    }

    #[test]
    fn groups_are_isolated() {
        let (store, g1) = setup();
        let g2 = GroupId::from("dao-2");
        store.create_group(&g2);
        store.add_member(&g1, Commitment::new("a")).unwrap();
        assert!(!store.contains(&g2, &Commitment::new("a")));
        assert_eq!(store.merkle_root(&g2).unwrap(), MerkleRoot::zero());
    }
}
