//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//

//! A migration-tolerant, parallel index-scan executor for a partitioned
//! in-memory key/value store that carries a secondary index.
//!
//! Given a set of locally owned partitions, an index selection, an optional
//! residual filter, a projection, and an optional ordering, a
//! [`ScanExecutor`] streams matching rows to a downstream [`Sink`] while:
//!
//! - issuing batched index-fetch requests to remote members in parallel
//!   (via [`IndexFetchClient`]),
//! - tolerating partition migrations mid-scan by splitting in-flight work
//!   along the new ownership boundary and resuming from the last emitted
//!   point (see the `scan_executor` module's resplit logic),
//! - preserving a total ordering across partitions when the index is sorted,
//! - respecting a cooperative scheduling contract: [`ScanExecutor::pump`]
//!   never blocks and bounds its own work per activation.
//!
//! Query planning, expression compilation, the key/value store and its
//! secondary index, wire serialization and transport, and the downstream
//! scheduler are all out of scope for this crate; they are represented here
//! only as the collaborator traits [`IndexFetchClient`], [`PartitionOracle`],
//! [`RowShaper`], and [`Sink`].
//!
//! ```no_run
//! use partition_scan_executor::{
//!     Address, PartitionSet, PassThroughShaper, ScanExecutorBuilder, VecSink,
//! };
//! # use partition_scan_executor::{Cursor, IndexFetchClient, FetchHandle, ReadyFetchHandle, PartitionOracle, PartitionId};
//! # struct DemoClient;
//! # impl IndexFetchClient for DemoClient {
//! #     fn read(&self, _: &Address, _: &PartitionSet, _: &Cursor) -> Box<dyn FetchHandle> {
//! #         Box::new(ReadyFetchHandle::new(Ok((Vec::new(), Cursor::terminal()))))
//! #     }
//! # }
//! # struct DemoOracle;
//! # impl PartitionOracle for DemoOracle {
//! #     fn owner(&self, _: PartitionId) -> Option<Address> { None }
//! #     fn partition_count(&self) -> usize { 0 }
//! # }
//! let mut executor = ScanExecutorBuilder::new(PartitionSet::from_iter([0, 1, 2]))
//!     .local_address(Address::member("local"))
//!     .client(Box::new(DemoClient))
//!     .oracle(Box::new(DemoOracle))
//!     .shaper(Box::new(PassThroughShaper))
//!     .sink(Box::new(VecSink::default()))
//!     .build();
//!
//! loop {
//!     match executor.pump() {
//!         Ok(partition_scan_executor::PumpResult::Done) => break,
//!         Ok(partition_scan_executor::PumpResult::Blocked) => break, // re-invoke once unblocked
//!         Err(e) => panic!("scan failed: {e}"),
//!     }
//! }
//! ```

mod cursor;
mod error;
mod fetch;
mod metrics;
mod oracle;
mod partition;
mod row;
mod scan_executor;
mod sink;
mod sort;
mod split;

pub use cursor::Cursor;
pub use error::{ScanError, ScanErrorKind};
pub use fetch::{FetchFailure, FetchHandle, FetchResult, IndexFetchClient, ReadyFetchHandle, SpawnedFetchHandle};
pub use metrics::{ScanMetrics, ScanMetricsSnapshot};
pub use oracle::{PartitionOracle, TestPartitionOracle};
pub use partition::{Address, PartitionId, PartitionSet};
pub use row::{
    compare_values, ClosureRowShaper, Entry, PassThroughShaper, Row, RowShaper, Tri, Value,
};
pub use scan_executor::{PumpResult, ScanExecutor, ScanExecutorBuilder};
pub use sink::{AlternatingSink, Sink, VecSink};
pub use sort::{Direction, SortSpec};
pub use split::{MissingPartition, Split};
