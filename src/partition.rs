//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use roaring::RoaringBitmap;
use std::collections::BTreeMap;
use std::fmt;

/// A dense shard identifier for the key/value store.
pub type PartitionId = u32;

/// The cluster member currently believed to host a partition's primary
/// replica. Opaque to the executor beyond equality and ordering (used only
/// to group partitions by owner and to address fetch requests).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Address {
    Member(String),
    /// Sentinel used when `PartitionOracle::owner()` cannot name an owner for
    /// a partition during resplit. A fetch issued against this address is
    /// expected to fail fast, per the §11 open-question resolution documented
    /// in `DESIGN.md`.
    Unknown,
}

impl Address {
    pub fn member(name: impl Into<String>) -> Address {
        Address::Member(name.into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Member(s) => write!(f, "{}", s),
            Address::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// A set of partition ids, represented as a bitmap over `[0, P)`.
///
/// An empty `PartitionSet` is the split-level sentinel for "this split is
/// done" (see `Split`).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PartitionSet {
    bits: RoaringBitmap,
}

impl PartitionSet {
    pub fn new() -> PartitionSet {
        PartitionSet::default()
    }

    pub fn from_iter(ids: impl IntoIterator<Item = PartitionId>) -> PartitionSet {
        let mut bits = RoaringBitmap::new();
        for id in ids {
            bits.insert(id);
        }
        PartitionSet { bits }
    }

    pub fn single(id: PartitionId) -> PartitionSet {
        PartitionSet::from_iter([id])
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn contains(&self, id: PartitionId) -> bool {
        self.bits.contains(id)
    }

    pub fn insert(&mut self, id: PartitionId) {
        self.bits.insert(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.bits.iter()
    }

    pub fn union(&self, other: &PartitionSet) -> PartitionSet {
        PartitionSet {
            bits: &self.bits | &other.bits,
        }
    }

    /// Partitions this set by the owner each partition maps to, preserving
    /// ascending partition-id order within each group. Used by resplit
    /// (§4.3) to turn one failing split into a family of new ones.
    pub fn group_by<F>(&self, mut owner_of: F) -> Vec<(Address, PartitionSet)>
    where
        F: FnMut(PartitionId) -> Address,
    {
        let mut groups: BTreeMap<Address, PartitionSet> = BTreeMap::new();
        for id in self.iter() {
            groups.entry(owner_of(id)).or_default().insert(id);
        }
        groups.into_iter().collect()
    }
}

impl fmt::Display for PartitionSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_preserves_partition_order_within_group() {
        let set = PartitionSet::from_iter([3, 1, 2, 5, 4]);
        let groups = set.group_by(|p| {
            if p % 2 == 0 {
                Address::member("even")
            } else {
                Address::member("odd")
            }
        });
        assert_eq!(groups.len(), 2);
        let even: Vec<_> = groups
            .iter()
            .find(|(a, _)| *a == Address::member("even"))
            .unwrap()
            .1
            .iter()
            .collect();
        assert_eq!(even, vec![2, 4]);
    }

    #[test]
    fn empty_set_means_done() {
        let set = PartitionSet::new();
        assert!(set.is_empty());
    }
}
