//! Sequenced snapshot reconciliation.
//!
//! Poll cycles are issued in order but may complete in any order. Each cycle
//! carries a [`PollSeq`]; a completion is applied only if it is newer than
//! the snapshot already in place, so an old response that arrives late can
//! never overwrite a fresher one. A failed cycle leaves the previous
//! snapshot untouched. A failure from a cycle older than the applied
//! snapshot is stale like any other late completion and is not reported.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwatch_proto::{MonitorStatusResponse, MonitorSummary};
use tracing::{debug, warn};

use crate::MonitorSnapshot;

/// Message recorded when a cycle fails.
pub const POLL_FAILED_MESSAGE: &str = "Failed to load monitor data";

/// Issuance order of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PollSeq(u64);

impl PollSeq {
    /// Raw value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PollSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poll#{}", self.0)
    }
}

/// Both halves of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// `GET /monitors/`
    pub monitors: Vec<MonitorSummary>,
    /// `GET /monitors/status`
    pub status: MonitorStatusResponse,
}

/// What happened to a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Snapshot replaced
    Applied(Arc<MonitorSnapshot>),
    /// A newer cycle was already applied; dropped
    Stale {
        /// Completed cycle
        seq: PollSeq,
        /// Cycle currently applied
        applied: PollSeq,
    },
    /// Cycle failed; previous snapshot kept
    Failed {
        /// Failure description
        error: String,
    },
    /// Sequence was never issued
    Ignored,
}

/// Owns the authoritative snapshot.
#[derive(Debug, Clone, Default)]
pub struct PollReconciler {
    next_seq: u64,
    applied: Option<PollSeq>,
    snapshot: Option<Arc<MonitorSnapshot>>,
    failures: u64,
}

impl PollReconciler {
    /// Create a reconciler with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the sequence number for a new cycle.
    pub fn issue(&mut self) -> PollSeq {
        let seq = PollSeq(self.next_seq);
        self.next_seq += 1;
        seq
    }

    /// Reconcile the completion of cycle `seq`.
    pub fn complete(
        &mut self,
        seq: PollSeq,
        result: Result<PollResponse, String>,
        fetched_at: DateTime<Utc>,
    ) -> PollOutcome {
        if seq.0 >= self.next_seq {
            return PollOutcome::Ignored;
        }
        if let Some(applied) = self.applied.filter(|applied| seq <= *applied) {
            debug!(%seq, %applied, "discarding stale poll");
            return PollOutcome::Stale { seq, applied };
        }

        match result {
            Ok(response) => {
                let snapshot = Arc::new(MonitorSnapshot {
                    active_monitor: response.status.active(),
                    monitors: response.monitors,
                    seq,
                    fetched_at,
                });
                self.applied = Some(seq);
                self.snapshot = Some(Arc::clone(&snapshot));
                PollOutcome::Applied(snapshot)
            },
            Err(error) => {
                self.failures += 1;
                warn!(%seq, %error, "poll cycle failed");
                PollOutcome::Failed { error }
            },
        }
    }

    /// Latest applied snapshot.
    pub fn snapshot(&self) -> Option<Arc<MonitorSnapshot>> {
        self.snapshot.clone()
    }

    /// Sequence of the latest applied snapshot.
    pub fn applied(&self) -> Option<PollSeq> {
        self.applied
    }

    /// Whether a monitor is running according to the latest snapshot.
    pub fn is_monitoring(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.is_monitoring())
    }

    /// Failed cycles since creation.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
