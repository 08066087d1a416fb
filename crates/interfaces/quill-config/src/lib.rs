//! Central configuration constants for storage keys, timings and defaults.

/// Session storage key holding the serialized route stack.
pub const ROUTES_KEY: &str = "routes";

/// Session storage key holding the history cursor.
pub const HISTORY_CURSOR_KEY: &str = "historyCur";

/// Session storage key holding per-entry UI state bags.
pub const UI_STATES_KEY: &str = "uiStates";

/// Confirmation shown when leaving a post with unsaved edits.
pub const UNSAVED_POST_MESSAGE: &str = "Post not saved yet. Do you really want to leave?";

/// Minimum time a loading indicator stays visible (milliseconds).
pub const MIN_LOADING_MS: u64 = 500;

/// How long a success/failure indicator is held before reverting (milliseconds).
pub const FEEDBACK_HOLD_MS: u64 = 1500;

/// Delay before measuring layout for scroll restoration (milliseconds).
pub const SCROLL_SETTLE_MS: u64 = 20;

/// Give up waiting for layout after this long (milliseconds).
pub const SCROLL_POLL_TIMEOUT_MS: u64 = 2000;

/// Layout polling interval during scroll restoration (milliseconds).
pub const SCROLL_POLL_INTERVAL_MS: u64 = 20;

/// Fraction of the saved content height that must be laid out before scrolling.
pub const SCROLL_HEIGHT_RATIO: f64 = 0.9;

/// Capacity of the store's completion channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Default base URL of the posts API.
pub const DEFAULT_API_HOST: &str = "http://127.0.0.1:8080";

/// UI state key used by the scroll-position keeper.
pub const SCROLL_UI_STATE_KEY: &str = "scroll";
