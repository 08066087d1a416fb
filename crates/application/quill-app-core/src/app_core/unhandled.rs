use quill_core::ApiError;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// An API error whose effects were already applied to state.
    Swallowed,
    /// Unexpected; recorded and logged.
    Escalated,
}

/// Central inspection point for failures that escaped request handling.
pub fn inspect_unhandled(err: &anyhow::Error) -> Disposition {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        debug!("already handled api error: {api}");
        return Disposition::Swallowed;
    }
    error!("unhandled error: {err:#}");
    Disposition::Escalated
}
