//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use num_enum::TryFromPrimitive;

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, Clone)]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "kind={:?} message=\"{}\"", self.kind, self.message)
    }
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, msg: impl Into<String>) -> ScanError {
        ScanError {
            kind,
            message: msg.into(),
        }
    }

    pub(crate) fn internal(msg: impl Into<String>) -> ScanError {
        ScanError::new(ScanErrorKind::Internal, msg.into())
    }
}

/// The taxonomy of fatal failures the executor can surface through `pump()`.
///
/// `MissingPartition` is the only kind handled internally by the executor (via
/// resplit, see the `scan_executor` module); every other kind transitions the
/// scan to a terminal errored state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum ScanErrorKind {
    /// The target member no longer owns at least one partition in the
    /// requested subset. Recovered locally via resplit; callers of this
    /// crate should never observe it escape `pump()`.
    MissingPartition = 1,

    /// The target member's index view changed incompatibly under the scan.
    /// The planner must retry the query end-to-end.
    StaleIndexStamp = 2,

    /// The target member no longer has the requested index at all.
    IndexNotFound = 3,

    /// The fetch response could not be decoded.
    Serialization = 4,

    /// A self-check inside the executor or a split failed: a bug, not a
    /// recoverable runtime condition.
    Internal = 5,
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
