//! Per-entry scroll positions, saved through the history UI-state hook and
//! restored once the page has grown tall enough to honor them.

use std::sync::Arc;
use std::time::Duration;

use quill_config::{
    SCROLL_HEIGHT_RATIO, SCROLL_POLL_INTERVAL_MS, SCROLL_POLL_TIMEOUT_MS, SCROLL_SETTLE_MS,
    SCROLL_UI_STATE_KEY,
};
use quill_core::Route;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::{UiStateBag, UiStateListener};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollInfo {
    pub x: f64,
    pub y: f64,
    /// Content height when the position was taken.
    pub height: f64,
}

/// The scrollable document.
pub trait ScrollSurface: Send + Sync {
    fn scroll_info(&self) -> ScrollInfo;
    fn content_height(&self) -> f64;
    fn scroll_to(&self, x: f64, y: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTimings {
    /// Pause before measuring, so layout can catch up.
    pub settle: Duration,
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
    /// Share of the saved height the content must reach before scrolling.
    pub height_ratio: f64,
}

impl Default for ScrollTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(SCROLL_SETTLE_MS),
            poll_timeout: Duration::from_millis(SCROLL_POLL_TIMEOUT_MS),
            poll_interval: Duration::from_millis(SCROLL_POLL_INTERVAL_MS),
            height_ratio: SCROLL_HEIGHT_RATIO,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("condition not met within {0:?}")]
pub struct PollTimeout(pub Duration);

/// Re-checks `condition` every `interval` until it holds or `timeout` passes.
pub async fn poll(
    mut condition: impl FnMut() -> bool,
    timeout: Duration,
    interval: Duration,
) -> Result<(), PollTimeout> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(PollTimeout(timeout));
        }
        tokio::time::sleep(interval).await;
    }
}

pub async fn restore_scroll(surface: &dyn ScrollSurface, info: ScrollInfo, timings: &ScrollTimings) {
    tokio::time::sleep(timings.settle).await;
    let wanted = info.height * timings.height_ratio;
    if let Err(e) = poll(
        || surface.content_height() >= wanted,
        timings.poll_timeout,
        timings.poll_interval,
    )
    .await
    {
        debug!("content did not grow back ({e}), scrolling anyway");
    }
    surface.scroll_to(info.x, info.y);
}

/// Connects a [`ScrollSurface`] to the history's UI-state bags.
#[derive(Clone)]
pub struct ScrollKeeper {
    surface: Arc<dyn ScrollSurface>,
    timings: ScrollTimings,
}

impl ScrollKeeper {
    pub fn new(surface: Arc<dyn ScrollSurface>) -> Self {
        Self::with_timings(surface, ScrollTimings::default())
    }

    pub fn with_timings(surface: Arc<dyn ScrollSurface>, timings: ScrollTimings) -> Self {
        Self { surface, timings }
    }

    /// Listener that records the position of the route being left.
    pub fn listener(&self) -> UiStateListener {
        let surface = self.surface.clone();
        Box::new(move |_: &Route| {
            let info = serde_json::to_value(surface.scroll_info()).ok()?;
            Some((SCROLL_UI_STATE_KEY.to_string(), info))
        })
    }

    pub fn saved(bag: Option<&UiStateBag>) -> Option<ScrollInfo> {
        let value = bag?.get(SCROLL_UI_STATE_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Restores the position saved in `bag`. Returns false if there was none.
    pub async fn restore(&self, bag: Option<&UiStateBag>) -> bool {
        let Some(info) = Self::saved(bag) else {
            return false;
        };
        restore_scroll(self.surface.as_ref(), info, &self.timings).await;
        true
    }
}
