use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic start order of a request. Later requests always compare greater.
pub type RequestSeq = u64;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Succeeded,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("request {seq} already settled")]
    AlreadySettled { seq: RequestSeq },
}

/// Lifecycle of one attempt of an asynchronous operation.
///
/// A tracker is never reset. The next operation of the same kind gets a fresh
/// tracker, and only the tracker the store currently holds for that kind may
/// commit its result.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    seq: RequestSeq,
    started_at: Instant,
    status: RequestStatus,
}

impl RequestTracker {
    pub fn start() -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            started_at: Instant::now(),
            status: RequestStatus::Pending,
        }
    }

    pub fn seq(&self) -> RequestSeq {
        self.seq
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn succeed(&mut self) -> Result<(), TrackerError> {
        self.settle(RequestStatus::Succeeded)
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TrackerError> {
        self.settle(RequestStatus::Failed {
            error: error.into(),
        })
    }

    fn settle(&mut self, next: RequestStatus) -> Result<(), TrackerError> {
        if !self.is_pending() {
            return Err(TrackerError::AlreadySettled { seq: self.seq });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn succeeded(&self) -> bool {
        self.status == RequestStatus::Succeeded
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, RequestStatus::Failed { .. })
    }

    /// Present iff the request failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RequestStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// True when `slot` holds this very attempt.
    pub fn is_current_in(seq: RequestSeq, slot: Option<&RequestTracker>) -> bool {
        slot.is_some_and(|t| t.seq == seq)
    }
}
