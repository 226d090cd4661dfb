//! Consistent hashing ring.
//!
//! Maps an unbounded set of request keys onto a small, changing set of
//! members (cache shards, storage replicas, worker servers) so that adding
//! or removing one member only remaps the keys that member owned, not the
//! whole keyspace. Each member is expanded into [DEFAULT_REPLICAS] virtual
//! nodes to smooth the distribution.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crc::{Crc, CRC_32_ISO_HDLC};
use tracing::debug;

/// Default number of virtual nodes generated per member.
pub const DEFAULT_REPLICAS: usize = 20;

/// The IEEE-polynomial CRC32 used for every ring position.
///
/// Fast and uniform enough for load spreading; collision resistance is not
/// required here.
const IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("empty ring")]
/// Returned by lookups when no members are registered.
pub struct EmptyRing;

#[derive(Debug, Default)]
struct Inner {
    /// Sorted ring positions, rebuilt from `virtual_nodes` on every
    /// membership change. Derived index, never patched in place.
    positions: Vec<u32>,
    /// Ring position -> owning member.
    virtual_nodes: HashMap<u32, String>,
    /// Registered members.
    members: HashSet<String>,
}

/// A consistent hashing ring.
///
/// All lookups take a shared lock and run concurrently; membership changes
/// take an exclusive lock and rebuild the sorted position index, so readers
/// always observe either the pre- or post-mutation ring, never a partial
/// rebuild.
///
/// Two distinct virtual-node keys hashing to the same 32-bit position is
/// not detected: the later insertion overwrites the earlier one. With a
/// 32-bit hash and tens of thousands of virtual nodes this is a known,
/// accepted limitation.
#[derive(Debug)]
pub struct Ring {
    replicas: usize,
    inner: RwLock<Inner>,
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

impl Ring {
    /// Create an empty ring with [DEFAULT_REPLICAS] virtual nodes per member.
    pub fn new() -> Ring {
        Ring::with_replicas(DEFAULT_REPLICAS)
    }

    /// Create an empty ring with a custom virtual-node count.
    ///
    /// The count is fixed for the lifetime of the ring. Rings built with
    /// different counts assign keys differently even for identical
    /// membership.
    pub fn with_replicas(replicas: usize) -> Ring {
        Ring {
            replicas,
            inner: RwLock::new(Inner::default()),
        }
    }

    // === Public Methods ===

    /// Register a member. Adding a member that is already present is a no-op.
    ///
    /// Inserts `replicas` virtual nodes for the member and rebuilds the
    /// position index, which remaps the keys falling between the new
    /// positions and their predecessors.
    pub fn add(&self, member: &str) {
        let mut inner = self.write();
        self.insert_member(&mut inner, member);
    }

    /// Deregister a member. Removing an absent member is a no-op.
    pub fn remove(&self, member: &str) {
        let mut inner = self.write();
        self.delete_member(&mut inner, member);
    }

    /// Reconcile membership to exactly `members`.
    ///
    /// Current members absent from the input are removed first, then input
    /// members not yet registered are added. Members present in both are
    /// untouched, so their keys do not move.
    pub fn set<S: AsRef<str>>(&self, members: &[S]) {
        let mut inner = self.write();

        let stale: Vec<String> = inner
            .members
            .iter()
            .filter(|current| !members.iter().any(|m| m.as_ref() == current.as_str()))
            .cloned()
            .collect();

        for member in stale {
            self.delete_member(&mut inner, &member);
        }

        for member in members {
            self.insert_member(&mut inner, member.as_ref());
        }
    }

    /// Return the member owning `key`: the one whose virtual node is the
    /// first ring position at or clockwise of `hash(key)`, wrapping past the
    /// maximum position back to the minimum.
    pub fn get(&self, key: &str) -> Result<String, EmptyRing> {
        let inner = self.read();

        if inner.members.is_empty() {
            return Err(EmptyRing);
        }

        let i = search(&inner.positions, hash(key.as_bytes()));

        Ok(inner.virtual_nodes[&inner.positions[i]].clone())
    }

    /// Return the member owning `key` and the next distinct member clockwise.
    ///
    /// The second member is `None` when exactly one member is registered;
    /// that is a valid terminal state, not an error.
    pub fn get_two(&self, key: &str) -> Result<(String, Option<String>), EmptyRing> {
        let inner = self.read();

        if inner.members.is_empty() {
            return Err(EmptyRing);
        }

        let start = search(&inner.positions, hash(key.as_bytes()));
        let first = inner.virtual_nodes[&inner.positions[start]].clone();

        if inner.members.len() == 1 {
            return Ok((first, None));
        }

        let mut i = start;
        loop {
            i = (i + 1) % inner.positions.len();
            if i == start {
                // Full traversal without a second owner; possible only if a
                // position collision swallowed a member's virtual nodes.
                return Ok((first, None));
            }

            let candidate = &inner.virtual_nodes[&inner.positions[i]];
            if *candidate != first {
                return Ok((first, Some(candidate.clone())));
            }
        }
    }

    /// Return up to `n` distinct members in clockwise order starting from the
    /// position nearest to `key`.
    ///
    /// A member with several virtual nodes is emitted once, at its first
    /// clockwise occurrence. `n` is silently capped at the number of
    /// registered members.
    pub fn get_n(&self, key: &str, n: usize) -> Result<Vec<String>, EmptyRing> {
        let inner = self.read();

        if inner.members.is_empty() {
            return Err(EmptyRing);
        }

        let n = n.min(inner.members.len());
        let mut found: Vec<String> = Vec::with_capacity(n);
        if n == 0 {
            return Ok(found);
        }

        let start = search(&inner.positions, hash(key.as_bytes()));
        let mut i = start;

        loop {
            let member = &inner.virtual_nodes[&inner.positions[i]];
            if !found.iter().any(|m| m == member) {
                found.push(member.clone());
                if found.len() == n {
                    break;
                }
            }

            i = (i + 1) % inner.positions.len();
            if i == start {
                break;
            }
        }

        Ok(found)
    }

    /// Return all registered members, in no particular order.
    pub fn members(&self) -> Vec<String> {
        self.read().members.iter().cloned().collect()
    }

    /// Return the number of registered members.
    pub fn len(&self) -> usize {
        self.read().members.len()
    }

    /// Returns `true` if no members are registered.
    pub fn is_empty(&self) -> bool {
        self.read().members.is_empty()
    }

    /// Return the virtual-node count this ring was built with.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    // === Private Methods ===

    fn insert_member(&self, inner: &mut Inner, member: &str) {
        if inner.members.contains(member) {
            return;
        }

        for i in 0..self.replicas {
            inner
                .virtual_nodes
                .insert(hash(vnode_key(member, i).as_bytes()), member.to_string());
        }
        inner.members.insert(member.to_string());
        inner.rebuild_positions();

        debug!(member, "added member to ring");
    }

    fn delete_member(&self, inner: &mut Inner, member: &str) {
        if !inner.members.remove(member) {
            return;
        }

        for i in 0..self.replicas {
            inner
                .virtual_nodes
                .remove(&hash(vnode_key(member, i).as_bytes()));
        }
        inner.rebuild_positions();

        debug!(member, "removed member from ring");
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn rebuild_positions(&mut self) {
        self.positions.clear();
        self.positions.extend(self.virtual_nodes.keys());
        self.positions.sort_unstable();
    }
}

/// Virtual-node key for a member: the decimal replica index prefixed to the
/// member identity, with no separator.
///
/// This exact layout is kept for compatibility with rings built by other
/// implementations of the same scheme. Adversarially chosen member names can
/// make two virtual-node keys coincide (the index/name boundary is
/// ambiguous); changing the layout would silently re-shard every key, so the
/// risk is documented instead of fixed.
fn vnode_key(member: &str, index: usize) -> String {
    format!("{}{}", index, member)
}

fn hash(bytes: &[u8]) -> u32 {
    IEEE.checksum(bytes)
}

/// Index of the first position `>=` key, wrapping to 0 past the end.
///
/// The comparator must stay `>=`: a key hashing exactly onto a virtual node
/// belongs to that node's owner, not the next one.
fn search(positions: &[u32], key: u32) -> usize {
    let i = positions.partition_point(|&p| p < key);
    if i >= positions.len() {
        0
    } else {
        i
    }
}
