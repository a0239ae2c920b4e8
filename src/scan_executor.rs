//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::cursor::Cursor;
use crate::error::{ScanError, ScanErrorKind};
use crate::fetch::{FetchFailure, IndexFetchClient};
use crate::metrics::ScanMetrics;
use crate::oracle::PartitionOracle;
use crate::partition::{Address, PartitionSet};
use crate::row::{Row, RowShaper};
use crate::sink::Sink;
use crate::sort::SortSpec;
use crate::split::Split;
use tracing::{debug, trace, warn};

/// Emission discipline selected at construction (§9: "resolve statically by
/// branching in pump() on a boolean flag captured at init").
enum Mode {
    Hash,
    Sorted(SortSpec),
}

/// The outcome of one `pump()` activation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PumpResult {
    /// All splits are exhausted and nothing remains pending-emit.
    Done,
    /// No further progress is possible without downstream capacity or
    /// outstanding I/O; the driver should re-invoke `pump()` once either is
    /// available.
    Blocked,
}

/// Builds a [`ScanExecutor`]. Mirrors the collaborator-assembly step the
/// teacher's handle construction performs, but for one scan invocation
/// rather than a long-lived client handle.
pub struct ScanExecutorBuilder {
    local_partitions: PartitionSet,
    local_address: Option<Address>,
    seed_cursors: Vec<Cursor>,
    client: Option<Box<dyn IndexFetchClient>>,
    oracle: Option<Box<dyn PartitionOracle>>,
    shaper: Option<Box<dyn RowShaper>>,
    sink: Option<Box<dyn Sink>>,
    mode: Mode,
    max_rows_per_pump: Option<usize>,
}

impl ScanExecutorBuilder {
    pub fn new(local_partitions: PartitionSet) -> ScanExecutorBuilder {
        ScanExecutorBuilder {
            local_partitions,
            local_address: None,
            seed_cursors: vec![Cursor::default()],
            client: None,
            oracle: None,
            shaper: None,
            sink: None,
            mode: Mode::Hash,
            max_rows_per_pump: None,
        }
    }

    pub fn local_address(mut self, address: Address) -> ScanExecutorBuilder {
        self.local_address = Some(address);
        self
    }

    /// One seed cursor per disjoint key range the index filter decomposes
    /// into (§4.4). Defaults to a single default-seeded cursor.
    pub fn seed_cursors(mut self, cursors: Vec<Cursor>) -> ScanExecutorBuilder {
        assert!(!cursors.is_empty(), "initialization requires at least one seed cursor");
        self.seed_cursors = cursors;
        self
    }

    pub fn client(mut self, client: Box<dyn IndexFetchClient>) -> ScanExecutorBuilder {
        self.client = Some(client);
        self
    }

    pub fn oracle(mut self, oracle: Box<dyn PartitionOracle>) -> ScanExecutorBuilder {
        self.oracle = Some(oracle);
        self
    }

    pub fn shaper(mut self, shaper: Box<dyn RowShaper>) -> ScanExecutorBuilder {
        self.shaper = Some(shaper);
        self
    }

    pub fn sink(mut self, sink: Box<dyn Sink>) -> ScanExecutorBuilder {
        self.sink = Some(sink);
        self
    }

    /// Switches to sorted mode (merge-sort across splits, §4.2.2). Hash mode
    /// (§4.2.1, unordered concatenation) is the default.
    pub fn sorted(mut self, comparator: SortSpec) -> ScanExecutorBuilder {
        self.mode = Mode::Sorted(comparator);
        self
    }

    /// Defensive cap on rows emitted per `pump()` activation, guarding
    /// against one hot split starving the cooperative scheduler (§9 open
    /// question). Unset by default: a pump runs until `Blocked` or `Done`.
    pub fn max_rows_per_pump(mut self, limit: usize) -> ScanExecutorBuilder {
        self.max_rows_per_pump = Some(limit);
        self
    }

    pub fn build(self) -> ScanExecutor {
        let owner = self
            .local_address
            .expect("ScanExecutorBuilder requires a local_address");
        let client = self.client.expect("ScanExecutorBuilder requires a client");
        let oracle = self.oracle.expect("ScanExecutorBuilder requires an oracle");
        let shaper = self.shaper.expect("ScanExecutorBuilder requires a shaper");
        let sink = self.sink.expect("ScanExecutorBuilder requires a sink");

        // §4.4: no I/O performed during initialization, just split creation.
        let splits = if self.local_partitions.is_empty() {
            Vec::new()
        } else {
            self.seed_cursors
                .into_iter()
                .map(|cursor| Split::new(self.local_partitions.clone(), owner.clone(), cursor))
                .collect()
        };

        debug!(splits = splits.len(), "scan executor initialized");

        ScanExecutor {
            splits,
            pending_emit: None,
            mode: self.mode,
            client,
            oracle,
            shaper,
            sink,
            metrics: ScanMetrics::new(),
            max_rows_per_pump: self.max_rows_per_pump,
            errored: false,
        }
    }
}

/// The top-level state machine: owns the active splits, drives emission, and
/// performs migration recovery (§4.2).
pub struct ScanExecutor {
    splits: Vec<Split>,
    pending_emit: Option<Row>,
    mode: Mode,
    client: Box<dyn IndexFetchClient>,
    oracle: Box<dyn PartitionOracle>,
    shaper: Box<dyn RowShaper>,
    sink: Box<dyn Sink>,
    metrics: ScanMetrics,
    max_rows_per_pump: Option<usize>,
    errored: bool,
}

impl ScanExecutor {
    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Number of currently active splits. Exposed for observability and
    /// tests; not part of the scheduling contract.
    pub fn active_splits(&self) -> usize {
        self.splits.len()
    }

    /// Performs at most one cooperative scheduling activation (§4.2, §5). A
    /// single call performs as much work as the downstream sink will accept
    /// and outstanding I/O has ready, then returns.
    pub fn pump(&mut self) -> Result<PumpResult, ScanError> {
        if self.errored {
            return Err(ScanError::internal("pump() called after a fatal error"));
        }

        if self.splits.is_empty() && self.pending_emit.is_none() {
            return Ok(PumpResult::Done);
        }

        let mut rows_emitted_this_pump = 0usize;
        let is_sorted = matches!(self.mode, Mode::Sorted(_));
        let result = if is_sorted {
            self.pump_sorted(&mut rows_emitted_this_pump)
        } else {
            self.pump_hash(&mut rows_emitted_this_pump)
        };

        if result.is_err() {
            self.errored = true;
            self.splits.clear();
        }
        result
    }

    fn row_budget_exhausted(&self, rows_emitted_this_pump: usize) -> bool {
        matches!(self.max_rows_per_pump, Some(limit) if rows_emitted_this_pump >= limit)
    }

    fn try_emit(&mut self, row: Row) -> bool {
        let accepted = self.sink.try_emit(row);
        if accepted {
            self.metrics.row_emitted();
        }
        accepted
    }

    fn pump_hash(&mut self, rows_emitted_this_pump: &mut usize) -> Result<PumpResult, ScanError> {
        if let Some(row) = self.pending_emit.take() {
            if !self.try_emit(row.clone()) {
                self.pending_emit = Some(row);
                self.metrics.blocked_tick();
                return Ok(PumpResult::Blocked);
            }
            *rows_emitted_this_pump += 1;
        }

        let mut index = 0;
        while index < self.splits.len() {
            if self.row_budget_exhausted(*rows_emitted_this_pump) {
                self.metrics.blocked_tick();
                return Ok(PumpResult::Blocked);
            }

            match self.advance_split(index)? {
                AdvanceOutcome::Resplit(count) => {
                    // Continue iteration at the first descendant; do not
                    // advance `index` past the freshly inserted splits.
                    let _ = count;
                    continue;
                }
                AdvanceOutcome::Advanced => {}
            }

            if let Some(row) = self.splits[index].peek_lookahead().cloned() {
                if self.try_emit(row) {
                    self.splits[index].take_lookahead();
                    *rows_emitted_this_pump += 1;
                } else {
                    let row = self.splits[index].take_lookahead();
                    self.pending_emit = Some(row);
                    self.metrics.blocked_tick();
                    return Ok(PumpResult::Blocked);
                }
            }

            if self.splits[index].is_done() {
                self.splits.remove(index);
                continue;
            }

            index += 1;
        }

        if self.splits.is_empty() {
            Ok(PumpResult::Done)
        } else {
            self.metrics.blocked_tick();
            Ok(PumpResult::Blocked)
        }
    }

    fn pump_sorted(&mut self, rows_emitted_this_pump: &mut usize) -> Result<PumpResult, ScanError> {
        loop {
            if let Some(row) = self.pending_emit.take() {
                if !self.try_emit(row.clone()) {
                    self.pending_emit = Some(row);
                    self.metrics.blocked_tick();
                    return Ok(PumpResult::Blocked);
                }
                *rows_emitted_this_pump += 1;
            }

            if self.row_budget_exhausted(*rows_emitted_this_pump) {
                self.metrics.blocked_tick();
                return Ok(PumpResult::Blocked);
            }

            let mut index = 0;
            while index < self.splits.len() {
                match self.advance_split(index)? {
                    AdvanceOutcome::Resplit(_) => continue,
                    AdvanceOutcome::Advanced => {}
                }
                index += 1;
            }

            // §4.2.2 step 3: cannot pick a global minimum without full
            // information from every live, non-done split.
            let any_missing_lookahead = self
                .splits
                .iter()
                .any(|s| s.peek_lookahead().is_none() && !s.is_done());
            if any_missing_lookahead {
                self.metrics.blocked_tick();
                return Ok(PumpResult::Blocked);
            }

            self.splits.retain(|s| !s.is_done());
            if self.splits.is_empty() {
                return Ok(PumpResult::Done);
            }

            let comparator = match &self.mode {
                Mode::Sorted(spec) => spec.clone(),
                Mode::Hash => unreachable!("pump_sorted only runs in sorted mode"),
            };

            let winner = self
                .splits
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.peek_lookahead().map(|row| (i, row)))
                .min_by(|(_, a), (_, b)| comparator.compare(a, b))
                .map(|(i, _)| i)
                .expect("at least one split has a lookahead (checked above)");

            let row = self.splits[winner].take_lookahead();
            self.pending_emit = Some(row);
            // loop back to the top to attempt the emit
        }
    }

    /// Advances one split by index, performing resplit in place if it fails
    /// with `MissingPartition`, and surfacing any other fatal failure as a
    /// `ScanError`. Returns whether the split at `index` was replaced.
    fn advance_split(&mut self, index: usize) -> Result<AdvanceOutcome, ScanError> {
        let client = self.client.as_ref();
        let shaper = self.shaper.as_ref();
        let advance_result = self.splits[index].advance(client, shaper, &self.metrics);

        match advance_result {
            Ok(()) => {
                if let Some(failure) = self.splits[index].take_fatal() {
                    return Err(fatal_to_scan_error(failure));
                }
                Ok(AdvanceOutcome::Advanced)
            }
            Err(_missing) => {
                self.metrics.resplit_performed();
                let failing = self.splits.remove(index);
                let descendants = resplit(failing, self.oracle.as_ref());
                let count = descendants.len();
                warn!(count, "resplit after MissingPartition");
                for (offset, split) in descendants.into_iter().enumerate() {
                    self.splits.insert(index + offset, split);
                }
                Ok(AdvanceOutcome::Resplit(count))
            }
        }
    }
}

enum AdvanceOutcome {
    Advanced,
    Resplit(usize),
}

fn fatal_to_scan_error(failure: FetchFailure) -> ScanError {
    match failure {
        FetchFailure::MissingPartition(_) => {
            ScanError::internal("MissingPartition reached fatal path; this is a resplit bug")
        }
        FetchFailure::StaleIndexStamp(msg) => ScanError::new(ScanErrorKind::StaleIndexStamp, msg),
        FetchFailure::IndexNotFound(msg) => ScanError::new(ScanErrorKind::IndexNotFound, msg),
        FetchFailure::Serialization(msg) => ScanError::new(ScanErrorKind::Serialization, msg),
    }
}

/// Replaces one failing split with a family of descendants grouped by new
/// owner (§4.3). Always regroups the failing split's own `partitions` — the
/// set reported alongside `MissingPartition` is opaque and may name only a
/// subset of what actually moved (fetch.rs's `FetchFailure::MissingPartition`
/// doc comment), so it is never used to narrow what gets redistributed; doing
/// so would silently drop the unreported partitions from `ScanState.splits`.
/// The failing split's cursor is preserved exactly; no deduplication is
/// performed, relying solely on disjointness of the descendant partition
/// subsets.
fn resplit(failing: Split, oracle: &dyn PartitionOracle) -> Vec<Split> {
    let partitions = failing.partitions().clone();
    let cursor = failing.cursor().clone();

    let groups = partitions.group_by(|p| oracle.owner(p).unwrap_or(Address::Unknown));

    trace!(groups = groups.len(), "resplit grouped partitions by owner");

    groups
        .into_iter()
        .map(|(owner, set)| Split::new(set, owner, cursor.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ReadyFetchHandle;
    use crate::row::{Entry, PassThroughShaper, Value};
    use crate::sink::VecSink;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    fn entry(key: i64) -> Entry {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), Value::Integer(key));
        Entry::new(vec![Value::Integer(key)], fields)
    }

    type Script = HashMap<Address, Vec<Result<(Vec<Entry>, Cursor), FetchFailure>>>;

    struct ScriptedClient {
        script: Mutex<Script>,
    }

    impl IndexFetchClient for ScriptedClient {
        fn read(
            &self,
            owner: &Address,
            _partitions: &PartitionSet,
            _cursor: &Cursor,
        ) -> Box<dyn crate::fetch::FetchHandle> {
            let mut script = self.script.lock().unwrap();
            let queue = script.get_mut(owner).expect("no script for owner");
            let result = queue.remove(0);
            Box::new(ReadyFetchHandle::new(result))
        }
    }

    #[test]
    fn empty_local_partitions_is_immediately_done() {
        let client = ScriptedClient {
            script: Mutex::new(HashMap::new()),
        };
        let oracle = crate::oracle::TestPartitionOracle::new(HashMap::new(), 0);
        let mut exec = ScanExecutorBuilder::new(PartitionSet::new())
            .local_address(Address::member("local"))
            .client(Box::new(client))
            .oracle(Box::new(oracle))
            .shaper(Box::new(PassThroughShaper))
            .sink(Box::new(VecSink::default()))
            .build();
        assert_eq!(exec.pump().unwrap(), PumpResult::Done);
    }

    #[test]
    fn hash_mode_emits_every_row_across_three_partitions() {
        let a = Address::member("a");
        let mut script = HashMap::new();
        script.insert(
            a.clone(),
            vec![Ok((
                vec![entry(10), entry(20), entry(30), entry(11), entry(22), entry(33)],
                Cursor::terminal(),
            ))],
        );
        let client = ScriptedClient {
            script: Mutex::new(script),
        };
        let oracle = crate::oracle::TestPartitionOracle::new(HashMap::new(), 3);
        let mut exec = ScanExecutorBuilder::new(PartitionSet::from_iter([0, 1, 2]))
            .local_address(a)
            .client(Box::new(client))
            .oracle(Box::new(oracle))
            .shaper(Box::new(PassThroughShaper))
            .sink(Box::new(VecSink::default()))
            .build();

        let mut guard = 0;
        loop {
            match exec.pump().unwrap() {
                PumpResult::Done => break,
                PumpResult::Blocked => {
                    guard += 1;
                    assert!(guard < 1000, "pump loop did not converge");
                }
            }
        }
        assert_eq!(exec.metrics().snapshot().rows_emitted, 6);
    }
}
