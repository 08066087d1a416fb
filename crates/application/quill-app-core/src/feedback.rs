//! Button feedback for tracked requests: a minimum visible loading time, then
//! a result indicator that reverts on its own.

use std::time::{Duration, Instant};

use quill_config::{FEEDBACK_HOLD_MS, MIN_LOADING_MS};
use quill_core::{RequestStatus, RequestTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTimings {
    pub min_loading: Duration,
    pub hold: Duration,
}

impl Default for FeedbackTimings {
    fn default() -> Self {
        Self {
            min_loading: Duration::from_millis(MIN_LOADING_MS),
            hold: Duration::from_millis(FEEDBACK_HOLD_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonState {
    Normal,
    Loading,
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Still running; call again once the tracker settles.
    Pending,
    /// The host should leave edit mode now.
    Saved,
    Failed,
}

/// Sleeps until at least `min` has passed since `started`.
pub async fn sleep_min(started: Instant, min: Duration) {
    if let Some(rest) = min.checked_sub(started.elapsed()) {
        tokio::time::sleep(rest).await;
    }
}

/// Drives a save button from `tracker`.
pub async fn save_feedback(
    tracker: &RequestTracker,
    timings: &FeedbackTimings,
    sink: &mut impl FnMut(ButtonState),
) -> FeedbackOutcome {
    let (shown, outcome) = match tracker.status() {
        RequestStatus::Pending => {
            sink(ButtonState::Loading);
            return FeedbackOutcome::Pending;
        }
        RequestStatus::Succeeded => (ButtonState::Succeeded, FeedbackOutcome::Saved),
        RequestStatus::Failed { error } => (
            ButtonState::Failed {
                message: error.clone(),
            },
            FeedbackOutcome::Failed,
        ),
    };
    sleep_min(tracker.started_at(), timings.min_loading).await;
    sink(shown);
    tokio::time::sleep(timings.hold).await;
    sink(ButtonState::Normal);
    outcome
}

/// Drives a login button: loading for at least the minimum time, then back
/// to normal. The login page shows the error itself.
pub async fn login_feedback(
    tracker: &RequestTracker,
    timings: &FeedbackTimings,
    sink: &mut impl FnMut(ButtonState),
) -> FeedbackOutcome {
    let outcome = match tracker.status() {
        RequestStatus::Pending => {
            sink(ButtonState::Loading);
            return FeedbackOutcome::Pending;
        }
        RequestStatus::Succeeded => FeedbackOutcome::Saved,
        RequestStatus::Failed { .. } => FeedbackOutcome::Failed,
    };
    sleep_min(tracker.started_at(), timings.min_loading).await;
    sink(ButtonState::Normal);
    outcome
}
