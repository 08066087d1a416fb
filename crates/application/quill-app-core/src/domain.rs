use std::collections::HashMap;

use quill_core::{Post, PostId, RequestTracker, Route, User};

/// Everything the store owns. Read-only outside the store; mutate through
/// `AppStore` actions.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub route: Route,
    pub unauthorized: bool,
    pub me: Option<User>,

    /// Working copy of the post being viewed or drafted.
    pub post: Option<Post>,
    pub post_cache: HashMap<PostId, Post>,

    pub post_summaries: Vec<Post>,
    pub post_summaries_initialized: bool,
    /// Bumped whenever `post_summaries` is replaced.
    pub post_summaries_version: u64,

    pub get_post_request: Option<RequestTracker>,
    pub post_summaries_request: Option<RequestTracker>,
    pub login_request: Option<RequestTracker>,
    pub save_post_request: Option<RequestTracker>,

    /// Unexpected failures reported to the central inspector.
    pub unhandled_errors: Vec<String>,
}

impl AppState {
    pub fn clear_cache(&mut self) {
        self.me = None;
        self.post_summaries_initialized = false;
        self.post_summaries.clear();
        self.post_summaries_version += 1;
        self.post = None;
        self.post_cache.clear();
    }

    pub fn current_post_id(&self) -> Option<PostId> {
        match &self.route {
            Route::Post(p) => Some(p.id),
            _ => None,
        }
    }
}
