use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::ports::NavigationPlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SimEntry {
    token: Option<usize>,
    url: String,
}

#[derive(Debug)]
struct SimState {
    entries: Vec<SimEntry>,
    index: usize,
    notifications: VecDeque<Option<usize>>,
    confirm_answers: VecDeque<bool>,
    default_confirm: bool,
    prompts: Vec<String>,
    title: String,
}

/// In-memory session history with browser-like semantics: relative moves
/// apply immediately but are only reported when the host drains
/// [`SimulatedPlatform::next_notification`].
#[derive(Debug)]
pub struct SimulatedPlatform {
    inner: Mutex<SimState>,
}

impl SimulatedPlatform {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(SimState {
                entries: vec![SimEntry {
                    token: None,
                    url: initial_url.into(),
                }],
                index: 0,
                notifications: VecDeque::new(),
                confirm_answers: VecDeque::new(),
                default_confirm: true,
                prompts: Vec::new(),
                title: String::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the answer for the next confirmation prompt.
    pub fn answer_confirm(&self, answer: bool) {
        self.state().confirm_answers.push_back(answer);
    }

    /// Answer used once scripted answers run out.
    pub fn set_default_confirm(&self, answer: bool) {
        self.state().default_confirm = answer;
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Back/forward buttons.
    pub fn user_go(&self, delta: isize) {
        self.go(delta);
    }

    /// Typing a URL: a new entry without a token.
    pub fn user_visit(&self, url: impl Into<String>) {
        let mut s = self.state();
        let next = s.index + 1;
        s.entries.truncate(next);
        s.entries.push(SimEntry {
            token: None,
            url: url.into(),
        });
        s.index = next;
    }

    /// Token of the next settled navigation, oldest first.
    pub fn next_notification(&self) -> Option<Option<usize>> {
        self.state().notifications.pop_front()
    }

    pub fn pending_notifications(&self) -> usize {
        self.state().notifications.len()
    }

    pub fn index(&self) -> usize {
        self.state().index
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    pub fn urls(&self) -> Vec<String> {
        self.state().entries.iter().map(|e| e.url.clone()).collect()
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }
}

impl NavigationPlatform for SimulatedPlatform {
    fn push_state(&self, token: usize, url: Option<&str>) {
        let mut s = self.state();
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| s.entries[s.index].url.clone());
        let next = s.index + 1;
        s.entries.truncate(next);
        s.entries.push(SimEntry {
            token: Some(token),
            url,
        });
        s.index = next;
    }

    fn replace_state(&self, token: usize, url: Option<&str>) {
        let mut s = self.state();
        let index = s.index;
        let entry = &mut s.entries[index];
        entry.token = Some(token);
        if let Some(url) = url {
            entry.url = url.to_string();
        }
    }

    fn go(&self, delta: isize) {
        let mut s = self.state();
        let last = s.entries.len().saturating_sub(1) as isize;
        let target = (s.index as isize + delta).clamp(0, last) as usize;
        if target == s.index {
            return;
        }
        s.index = target;
        let token = s.entries[target].token;
        debug!(index = target, ?token, "simulated navigation settled");
        s.notifications.push_back(token);
    }

    fn state_token(&self) -> Option<usize> {
        let s = self.state();
        s.entries[s.index].token
    }

    fn location(&self) -> String {
        let s = self.state();
        s.entries[s.index].url.clone()
    }

    fn confirm(&self, message: &str) -> bool {
        let mut s = self.state();
        s.prompts.push(message.to_string());
        let default = s.default_confirm;
        s.confirm_answers.pop_front().unwrap_or(default)
    }

    fn set_title(&self, title: &str) {
        self.state().title = title.to_string();
    }
}
