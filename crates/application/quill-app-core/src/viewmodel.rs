use quill_core::{Post, Route};

use crate::domain::AppState;
use crate::history::HistoryCoordinator;

/// What the post page should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDataState {
    Normal,
    Loading,
    /// A cached copy is shown while the fresh one loads.
    LoadingWithCacheHit,
    Error,
    NotFound,
}

pub fn post_data_state(state: &AppState) -> PostDataState {
    let Route::Post(route) = &state.route else {
        return if state.post.is_some() {
            PostDataState::Normal
        } else {
            PostDataState::Loading
        };
    };
    let request = state.get_post_request.as_ref();
    let pending = request.is_some_and(|r| r.is_pending());
    let failed = request.is_some_and(|r| r.failed());

    if route.not_found {
        PostDataState::NotFound
    } else if !route.cache_hit && (route.error || failed) {
        PostDataState::Error
    } else if route.cache_hit && pending {
        PostDataState::LoadingWithCacheHit
    } else if pending || state.post.is_none() {
        PostDataState::Loading
    } else {
        PostDataState::Normal
    }
}

/// What the search page should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummariesState {
    Loading,
    /// First load failed; offer a retry.
    Failed,
    NoPosts,
    NoMatches,
    Ready,
}

pub fn summaries_state(state: &AppState, matching: usize) -> SummariesState {
    if !state.post_summaries_initialized {
        let failed = state
            .post_summaries_request
            .as_ref()
            .is_some_and(|r| r.failed());
        return if failed {
            SummariesState::Failed
        } else {
            SummariesState::Loading
        };
    }
    if state.post_summaries.is_empty() {
        SummariesState::NoPosts
    } else if matching == 0 {
        SummariesState::NoMatches
    } else {
        SummariesState::Ready
    }
}

/// Title filter over the post summaries, recomputed only when the
/// summaries or the search text change.
#[derive(Debug, Default)]
pub struct SummaryFilter {
    key: Option<(u64, String)>,
    matches: Vec<Post>,
    recomputed: usize,
}

impl SummaryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(&mut self, state: &AppState) -> &[Post] {
        let search = match &state.route {
            Route::Search(s) => s.search.trim().to_lowercase(),
            _ => String::new(),
        };
        let key = (state.post_summaries_version, search);
        if self.key.as_ref() != Some(&key) {
            self.matches = state
                .post_summaries
                .iter()
                .filter(|p| key.1.is_empty() || p.title.to_lowercase().contains(&key.1))
                .cloned()
                .collect();
            self.key = Some(key);
            self.recomputed += 1;
        }
        &self.matches
    }

    /// How many times the filter actually ran.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntryVm {
    pub index: usize,
    pub title: String,
    pub is_current: bool,
}

/// Entries for a history strip. Clicking one maps to `go_to_index(index)`.
pub fn history_entries(history: &HistoryCoordinator, state: &AppState) -> Vec<HistoryEntryVm> {
    history
        .entries()
        .iter()
        .enumerate()
        .map(|(index, route)| {
            let is_current = index == history.cursor();
            let title = match route {
                Some(_) if is_current => state.route.page_title(state.post.as_ref()),
                Some(route) => route.page_title(None),
                None => "…".to_string(),
            };
            HistoryEntryVm {
                index,
                title,
                is_current,
            }
        })
        .collect()
}
