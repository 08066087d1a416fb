use quill_core::{PostId, RequestSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    // Navigation
    GoNotFound,
    GoLogin,
    /// `None` reads the search text from the current location.
    GoSearch(Option<String>),
    GoNewPost,
    GoPost { id: PostId, title: Option<String> },
    Back,
    GoToIndex(usize),

    // Session
    Login { username: String, password: String },
    Logout,

    // Posts
    RefreshPostSummaries,
    SaveCurrentPost,
    ResetCurrentPost,
    SetEditing(bool),
}

/// What a dispatched command started, for hosts that track feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Navigation(crate::history::Navigation),
    Request(RequestSeq),
    Nothing,
}
