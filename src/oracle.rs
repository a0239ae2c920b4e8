//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::partition::{Address, PartitionId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Maps a partition id to its current owner. An external collaborator: the
/// executor consults it only during resplit (§4.3), never on the hot path of
/// an unmigrated scan.
pub trait PartitionOracle: Send + Sync {
    /// Returns `None` when ownership is transiently unknown (§4.3 policies,
    /// §9 open question). This crate's resplit always creates a group for
    /// [`Address::Unknown`] in that case rather than parking the partition.
    fn owner(&self, partition_id: PartitionId) -> Option<Address>;

    fn partition_count(&self) -> usize;
}

/// A `PartitionOracle` backed by an in-memory map, mutable at runtime so
/// tests can simulate a migration mid-scan by calling
/// [`TestPartitionOracle::reassign`] between `pump()` calls.
pub struct TestPartitionOracle {
    assignments: RwLock<HashMap<PartitionId, Address>>,
    partition_count: usize,
}

impl TestPartitionOracle {
    pub fn new(assignments: HashMap<PartitionId, Address>, partition_count: usize) -> TestPartitionOracle {
        TestPartitionOracle {
            assignments: RwLock::new(assignments),
            partition_count,
        }
    }

    pub fn reassign(&self, partition_id: PartitionId, new_owner: Address) {
        self.assignments
            .write()
            .expect("oracle lock poisoned")
            .insert(partition_id, new_owner);
    }
}

impl PartitionOracle for TestPartitionOracle {
    fn owner(&self, partition_id: PartitionId) -> Option<Address> {
        self.assignments
            .read()
            .expect("oracle lock poisoned")
            .get(&partition_id)
            .cloned()
    }

    fn partition_count(&self) -> usize {
        self.partition_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassign_changes_subsequent_owner_lookups() {
        let mut initial = HashMap::new();
        initial.insert(0, Address::member("a"));
        let oracle = TestPartitionOracle::new(initial, 1);
        assert_eq!(oracle.owner(0), Some(Address::member("a")));
        oracle.reassign(0, Address::member("b"));
        assert_eq!(oracle.owner(0), Some(Address::member("b")));
    }

    #[test]
    fn unknown_partition_yields_none() {
        let oracle = TestPartitionOracle::new(HashMap::new(), 4);
        assert_eq!(oracle.owner(7), None);
    }
}
