//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::cursor::Cursor;
use crate::partition::{Address, PartitionSet};
use crate::row::Entry;
use std::future::Future;
use std::task::Poll;
use tokio::sync::oneshot;

/// The failure a fetch can report in place of a batch. Everything besides
/// `MissingPartition` is fatal to the scan (§4.5, §7).
#[derive(Debug, Clone)]
pub enum FetchFailure {
    /// The target no longer owns at least one partition in the requested
    /// set. The set reported is opaque to the executor (§4.1); callers may
    /// leave it empty if the client cannot name the offending partitions.
    MissingPartition(PartitionSet),
    StaleIndexStamp(String),
    IndexNotFound(String),
    Serialization(String),
}

pub type FetchResult = Result<(Vec<Entry>, Cursor), FetchFailure>;

/// A handle to one outstanding fetch request, modeled as an external future
/// with an `is_ready` / `take_result` contract rather than something the
/// executor awaits (§9: "Coroutines / async"). `Split::advance` polls this
/// exactly once per activation and never blocks on it.
pub trait FetchHandle: Send {
    /// Non-blocking poll. Once this returns `Poll::Ready`, it must keep
    /// returning the same outcome (or panic) if polled again — callers take
    /// the result at most once, immediately after observing readiness.
    fn poll_fetch(&mut self) -> Poll<FetchResult>;
}

/// Issues fetch requests against remote members. An external collaborator:
/// this crate only depends on the trait, never on a concrete transport
/// (§2 item 1, §6).
pub trait IndexFetchClient: Send + Sync {
    /// Issues one asynchronous "fetch next batch" request. Must not block;
    /// the returned handle is polled later by the owning split.
    fn read(&self, owner: &Address, partitions: &PartitionSet, cursor: &Cursor)
        -> Box<dyn FetchHandle>;
}

/// A `FetchHandle` backed by a tokio task, for `IndexFetchClient`
/// implementations that do real (or simulated) async work. Polling drains a
/// oneshot channel without blocking; if the task hasn't finished, `poll_fetch`
/// reports `Poll::Pending`.
pub struct SpawnedFetchHandle {
    rx: oneshot::Receiver<FetchResult>,
}

impl SpawnedFetchHandle {
    /// Spawns `fut` on the current tokio runtime and returns a handle that
    /// can be polled from non-async code.
    pub fn spawn<F>(fut: F) -> SpawnedFetchHandle
    where
        F: Future<Output = FetchResult> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = fut.await;
            // The receiver may have been dropped if the split was torn down
            // (cancellation, §5); a failed send is not an error here.
            let _ = tx.send(result);
        });
        SpawnedFetchHandle { rx }
    }
}

impl FetchHandle for SpawnedFetchHandle {
    fn poll_fetch(&mut self) -> Poll<FetchResult> {
        match self.rx.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(oneshot::error::TryRecvError::Empty) => Poll::Pending,
            Err(oneshot::error::TryRecvError::Closed) => Poll::Ready(Err(
                FetchFailure::Serialization("fetch task dropped without a reply".to_string()),
            )),
        }
    }
}

/// A `FetchHandle` that is ready on its first poll, for tests and for
/// clients that can answer synchronously.
pub struct ReadyFetchHandle {
    result: Option<FetchResult>,
}

impl ReadyFetchHandle {
    pub fn new(result: FetchResult) -> ReadyFetchHandle {
        ReadyFetchHandle {
            result: Some(result),
        }
    }
}

impl FetchHandle for ReadyFetchHandle {
    fn poll_fetch(&mut self) -> Poll<FetchResult> {
        match self.result.take() {
            Some(result) => Poll::Ready(result),
            None => panic!("ReadyFetchHandle polled after yielding its result"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_handle_yields_once() {
        let mut h = ReadyFetchHandle::new(Ok((Vec::new(), Cursor::terminal())));
        assert!(matches!(h.poll_fetch(), Poll::Ready(Ok(_))));
    }

    #[tokio::test]
    async fn spawned_handle_eventually_becomes_ready() {
        let mut h = SpawnedFetchHandle::spawn(async {
            tokio::task::yield_now().await;
            Ok((Vec::new(), Cursor::terminal()))
        });
        let mut ready = false;
        for _ in 0..100 {
            if let Poll::Ready(result) = h.poll_fetch() {
                assert!(result.is_ok());
                ready = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(ready, "handle never became ready");
    }
}
