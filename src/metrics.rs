//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracking one scan's lifetime, exposed for callers that want to
/// log or export them; the executor never reads these back to make
/// decisions.
#[derive(Default)]
pub struct ScanMetrics {
    pub rows_emitted: AtomicU64,
    pub fetches_issued: AtomicU64,
    pub resplits: AtomicU64,
    pub blocked_ticks: AtomicU64,
}

impl ScanMetrics {
    pub fn new() -> ScanMetrics {
        ScanMetrics::default()
    }

    pub fn row_emitted(&self) {
        self.rows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_issued(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resplit_performed(&self) {
        self.resplits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocked_tick(&self) {
        self.blocked_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanMetricsSnapshot {
        ScanMetricsSnapshot {
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            fetches_issued: self.fetches_issued.load(Ordering::Relaxed),
            resplits: self.resplits.load(Ordering::Relaxed),
            blocked_ticks: self.blocked_ticks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ScanMetricsSnapshot {
    pub rows_emitted: u64,
    pub fetches_issued: u64,
    pub resplits: u64,
    pub blocked_ticks: u64,
}
