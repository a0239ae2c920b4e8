//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::cursor::Cursor;
use crate::fetch::{FetchFailure, FetchHandle, IndexFetchClient};
use crate::metrics::ScanMetrics;
use crate::partition::{Address, PartitionSet};
use crate::row::{Entry, Row, RowShaper};
use std::task::Poll;
use tracing::trace;

/// The single unit of in-flight work the executor schedules: a partition
/// subset, a target member, a resume cursor, at most one outstanding fetch,
/// the unread tail of the most recent response, and a one-row lookahead
/// buffer (§3 "Split").
pub struct Split {
    partitions: PartitionSet,
    owner: Address,
    cursor: Cursor,
    pending: Option<Box<dyn FetchHandle>>,
    batch: Vec<Entry>,
    batch_pos: usize,
    lookahead: Option<Row>,
    fatal: Option<FetchFailure>,
}

/// Raised by [`Split::advance`] when the harvested fetch reports that the
/// target no longer owns some partition in this split's set. The split is
/// poisoned after this: the executor discards it in favor of resplit
/// descendants (§4.1, §4.3).
pub struct MissingPartition(pub PartitionSet);

impl Split {
    /// Creates a fresh split. Used both at scan initialization (§4.4) and by
    /// resplit (§4.3), which always starts a descendant with an empty batch,
    /// no pending fetch and no lookahead.
    pub fn new(partitions: PartitionSet, owner: Address, cursor: Cursor) -> Split {
        Split {
            partitions,
            owner,
            cursor,
            pending: None,
            batch: Vec::new(),
            batch_pos: 0,
            lookahead: None,
            fatal: None,
        }
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// True iff exhausted: terminal cursor, empty unread batch, no lookahead.
    pub fn is_done(&self) -> bool {
        self.lookahead.is_none() && self.batch_pos == self.batch.len() && self.cursor.is_terminal()
    }

    /// True iff a fetch is outstanding and no lookahead is available yet.
    pub fn is_waiting(&self) -> bool {
        self.pending.is_some() && self.lookahead.is_none()
    }

    pub fn peek_lookahead(&self) -> Option<&Row> {
        self.lookahead.as_ref()
    }

    /// Returns the buffered row and clears the slot. Panics if `lookahead` is
    /// `None`, matching the "undefined if empty" contract in §4.1 with a
    /// loud failure instead of silent corruption.
    pub fn take_lookahead(&mut self) -> Row {
        self.lookahead
            .take()
            .expect("take_lookahead called with no buffered row")
    }

    /// Performs at most one unit of useful work and never blocks (§4.1). On
    /// `MissingPartition` the split is considered poisoned; the caller must
    /// not call `advance` again.
    pub fn advance(
        &mut self,
        client: &dyn IndexFetchClient,
        shaper: &dyn RowShaper,
        metrics: &ScanMetrics,
    ) -> Result<(), MissingPartition> {
        // Step 1: idempotent if a row is already buffered.
        if self.lookahead.is_some() {
            return Ok(());
        }

        // Step 2: issue a fetch if the batch is exhausted, nothing is
        // outstanding, and there may be more data.
        if self.batch_pos == self.batch.len() && self.pending.is_none() && !self.cursor.is_terminal() {
            trace!(owner = %self.owner, partitions = %self.partitions, "issuing fetch");
            self.pending = Some(client.read(&self.owner, &self.partitions, &self.cursor));
            metrics.fetch_issued();
            return Ok(());
        }

        // Step 3: harvest a completed fetch if one is ready.
        if let Some(handle) = self.pending.as_mut() {
            if let Poll::Ready(result) = handle.poll_fetch() {
                self.pending = None;
                match result {
                    Ok((entries, next_cursor)) => {
                        debug_assert!(
                            !(entries.is_empty() && !next_cursor.is_terminal()),
                            "non-terminal cursor accompanied by an empty batch (§4.1 edge case)"
                        );
                        self.batch = entries;
                        self.batch_pos = 0;
                        self.cursor = next_cursor;
                    }
                    Err(FetchFailure::MissingPartition(set)) => {
                        return Err(MissingPartition(set));
                    }
                    Err(other) => {
                        // Every other failure is fatal and surfaces through
                        // pump(); the split carries it back via the executor's
                        // advance-call site rather than panicking here.
                        self.pending = None;
                        self.batch = Vec::new();
                        self.batch_pos = 0;
                        self.cursor = Cursor::terminal();
                        self.fatal = Some(other);
                        return Ok(());
                    }
                }
            } else {
                return Ok(());
            }
        }

        // Step 4: materialize the next survivor from the current batch.
        while self.batch_pos < self.batch.len() && self.lookahead.is_none() {
            let entry = &self.batch[self.batch_pos];
            self.batch_pos += 1;
            if let Some(row) = shaper.shape(entry) {
                self.lookahead = Some(row);
            }
        }

        Ok(())
    }

    /// Takes and clears a fatal error recorded by a previous `advance` call,
    /// if any. The executor checks this immediately after calling `advance`.
    pub fn take_fatal(&mut self) -> Option<FetchFailure> {
        self.fatal.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ReadyFetchHandle;
    use crate::row::{PassThroughShaper, Value};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn entry(key: i64) -> Entry {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), Value::Integer(key));
        Entry::new(vec![Value::Integer(key)], fields)
    }

    struct ScriptedClient {
        responses: Mutex<Vec<Result<(Vec<Entry>, Cursor), FetchFailure>>>,
    }

    impl IndexFetchClient for ScriptedClient {
        fn read(
            &self,
            _owner: &Address,
            _partitions: &PartitionSet,
            _cursor: &Cursor,
        ) -> Box<dyn FetchHandle> {
            let result = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .expect("ScriptedClient exhausted");
            Box::new(ReadyFetchHandle::new(result))
        }
    }

    #[test]
    fn advance_materializes_rows_one_at_a_time() {
        let client = ScriptedClient {
            responses: Mutex::new(vec![Ok((vec![entry(1), entry(2)], Cursor::terminal()))]),
        };
        let shaper = PassThroughShaper;
        let metrics = ScanMetrics::new();
        let mut split = Split::new(PartitionSet::single(0), Address::member("a"), Cursor::start(b"x".to_vec()));

        split.advance(&client, &shaper, &metrics).unwrap(); // issues fetch
        assert!(split.is_waiting());
        split.advance(&client, &shaper, &metrics).unwrap(); // harvests + materializes first row
        assert_eq!(split.peek_lookahead().unwrap().field("key"), Some(&Value::Integer(1)));

        let row = split.take_lookahead();
        assert_eq!(row.field("key"), Some(&Value::Integer(1)));
        assert!(!split.is_done());

        split.advance(&client, &shaper, &metrics).unwrap();
        assert_eq!(split.peek_lookahead().unwrap().field("key"), Some(&Value::Integer(2)));
        split.take_lookahead();

        split.advance(&client, &shaper, &metrics).unwrap();
        assert!(split.is_done());
    }

    #[test]
    fn missing_partition_poisons_the_split() {
        let client = ScriptedClient {
            responses: Mutex::new(vec![Err(FetchFailure::MissingPartition(PartitionSet::single(0)))]),
        };
        let shaper = PassThroughShaper;
        let metrics = ScanMetrics::new();
        let mut split = Split::new(PartitionSet::single(0), Address::member("a"), Cursor::start(b"x".to_vec()));
        split.advance(&client, &shaper, &metrics).unwrap();
        let err = split.advance(&client, &shaper, &metrics);
        assert!(err.is_err());
    }

    #[test]
    fn terminal_empty_batch_marks_split_done_without_another_fetch() {
        let client = ScriptedClient {
            responses: Mutex::new(vec![Ok((Vec::new(), Cursor::terminal()))]),
        };
        let shaper = PassThroughShaper;
        let metrics = ScanMetrics::new();
        let mut split = Split::new(PartitionSet::single(0), Address::member("a"), Cursor::start(b"x".to_vec()));
        split.advance(&client, &shaper, &metrics).unwrap();
        split.advance(&client, &shaper, &metrics).unwrap();
        assert!(split.is_done());
    }
}
