//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::row::Row;

/// The downstream consumer ("outbox"). An external collaborator: the
/// executor only needs a non-blocking acceptance signal (§6).
pub trait Sink {
    /// Non-blocking. `true` on acceptance; `false` means backpressure and the
    /// row must be retried later (the executor buffers it in `pending_emit`).
    fn try_emit(&mut self, row: Row) -> bool;
}

/// A sink that accepts everything and records emitted rows in order, for
/// tests that just want the resulting multiset or sequence.
#[derive(Default)]
pub struct VecSink {
    pub rows: Vec<Row>,
}

impl Sink for VecSink {
    fn try_emit(&mut self, row: Row) -> bool {
        self.rows.push(row);
        true
    }
}

/// A sink that accepts every other `try_emit`, for exercising the backpressure
/// path (§8 scenario 3).
pub struct AlternatingSink {
    pub rows: Vec<Row>,
    accept_next: bool,
}

impl AlternatingSink {
    pub fn new() -> AlternatingSink {
        AlternatingSink {
            rows: Vec::new(),
            accept_next: true,
        }
    }
}

impl Default for AlternatingSink {
    fn default() -> AlternatingSink {
        AlternatingSink::new()
    }
}

impl Sink for AlternatingSink {
    fn try_emit(&mut self, row: Row) -> bool {
        let accept = self.accept_next;
        self.accept_next = !self.accept_next;
        if accept {
            self.rows.push(row);
        }
        accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row() -> Row {
        Row {
            index_key: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn alternating_sink_rejects_every_other_row() {
        let mut sink = AlternatingSink::new();
        assert!(sink.try_emit(row()));
        assert!(!sink.try_emit(row()));
        assert!(sink.try_emit(row()));
        assert_eq!(sink.rows.len(), 2);
    }
}
