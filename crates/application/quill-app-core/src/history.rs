//! Navigation stack mirrored onto the platform's session history.
//!
//! The coordinator keeps a route snapshot per native entry and tags every
//! native entry it creates with its stack index. Relative navigation is
//! never assumed to complete synchronously: `back`/`go_to_index` only ask
//! the platform to move, and the move is adopted in [`HistoryCoordinator::handle_popstate`].

use std::collections::BTreeMap;
use std::sync::Arc;

use quill_config::{HISTORY_CURSOR_KEY, ROUTES_KEY, UI_STATES_KEY};
use quill_core::Route;
use quill_persistence::{SessionStorage, StorageError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ports::NavigationPlatform;
use crate::router::url_for;

/// Per-entry UI state, keyed by the listener-provided key.
pub type UiStateBag = BTreeMap<String, Value>;

/// Called with the outgoing route before a navigation commits.
pub type UiStateListener = Box<dyn FnMut(&Route) -> Option<(String, Value)> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Decides whether the current route may be left.
pub trait ExitGuard {
    fn can_exit(&mut self, current: &Route) -> bool;
}

impl<F: FnMut(&Route) -> bool> ExitGuard for F {
    fn can_exit(&mut self, current: &Route) -> bool {
        self(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing recorded yet.
    Idle,
    PendingExitCheck,
    /// Asked the platform to move to `target`; its notification is pending.
    AwaitingNative { target: usize },
    /// Undoing a native move the exit guard refused. The next notification
    /// is the correction itself and is not re-guarded.
    Correcting { restore_to: usize },
    Synchronized,
}

/// Result of a guarded navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Committed,
    /// Handed to the platform; settles in `handle_popstate`.
    Pending,
    Unchanged,
    Blocked,
    /// A native adjustment is in flight.
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopstateOutcome {
    /// The notified entry is now current. `route` is `None` for a gap in the
    /// stack, in which case the caller decodes the location instead.
    Adopted { cursor: usize, route: Option<Route> },
    /// The exit guard refused; a corrective navigation was issued.
    Blocked,
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history index {target} is out of range (stack has {len} entries)")]
    OutOfRange { target: usize, len: usize },
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("persisted history is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct HistoryCoordinator {
    platform: Arc<dyn NavigationPlatform>,
    storage: Arc<dyn SessionStorage>,
    routes: Vec<Option<Route>>,
    cursor: usize,
    ui_states: BTreeMap<usize, UiStateBag>,
    phase: Phase,
    listeners: Vec<(ListenerId, UiStateListener)>,
    next_listener: u64,
}

impl std::fmt::Debug for HistoryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCoordinator")
            .field("routes", &self.routes)
            .field("cursor", &self.cursor)
            .field("phase", &self.phase)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HistoryCoordinator {
    pub fn new(platform: Arc<dyn NavigationPlatform>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            platform,
            storage,
            routes: Vec::new(),
            cursor: 0,
            ui_states: BTreeMap::new(),
            phase: Phase::Idle,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn entries(&self) -> &[Option<Route>] {
        &self.routes
    }

    pub fn current_route(&self) -> Option<&Route> {
        self.routes.get(self.cursor).and_then(Option::as_ref)
    }

    pub fn ui_state(&self) -> Option<&UiStateBag> {
        self.ui_states.get(&self.cursor)
    }

    pub fn ui_state_at(&self, index: usize) -> Option<&UiStateBag> {
        self.ui_states.get(&index)
    }

    /// False only while a refused native move is being undone.
    pub fn can_navigate(&self) -> bool {
        !matches!(self.phase, Phase::Correcting { .. })
    }

    pub fn add_ui_state_listener(&mut self, listener: UiStateListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_ui_state_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Records `route` on a new entry after the cursor, dropping forward
    /// entries. The first route ever recorded replaces the initial entry.
    pub fn push(&mut self, route: Route, guard: &mut dyn ExitGuard) -> Navigation {
        if self.routes.is_empty() {
            return self.replace(route, guard);
        }
        self.overtake_pending_move();
        if !self.can_navigate() {
            debug!(phase = ?self.phase, "push refused while the platform is moving");
            return Navigation::Busy;
        }
        if !self.check_exit(guard) {
            return Navigation::Blocked;
        }

        self.save_ui_state();
        self.cursor += 1;
        self.routes.truncate(self.cursor);
        let _forward = self.ui_states.split_off(&self.cursor);
        let url = url_for(&route);
        debug!(cursor = self.cursor, ?url, "push");
        self.routes.push(Some(route));
        self.platform.push_state(self.cursor, url.as_deref());
        self.phase = Phase::Synchronized;
        Navigation::Committed
    }

    pub fn replace(&mut self, route: Route, guard: &mut dyn ExitGuard) -> Navigation {
        self.overtake_pending_move();
        if !self.can_navigate() {
            debug!(phase = ?self.phase, "replace refused while the platform is moving");
            return Navigation::Busy;
        }
        if !self.routes.is_empty() && !self.check_exit(guard) {
            return Navigation::Blocked;
        }

        let url = url_for(&route);
        debug!(cursor = self.cursor, ?url, "replace");
        match self.routes.get_mut(self.cursor) {
            Some(slot) => *slot = Some(route),
            None => {
                self.routes.resize(self.cursor, None);
                self.routes.push(Some(route));
            }
        }
        self.platform.replace_state(self.cursor, url.as_deref());
        self.phase = Phase::Synchronized;
        Navigation::Committed
    }

    pub fn back(&mut self, guard: &mut dyn ExitGuard) -> Navigation {
        self.overtake_pending_move();
        if self.cursor == 0 || self.routes.is_empty() {
            return Navigation::Unchanged;
        }
        self.travel(self.cursor - 1, guard)
    }

    pub fn go_to_index(
        &mut self,
        target: usize,
        guard: &mut dyn ExitGuard,
    ) -> Result<Navigation, HistoryError> {
        self.overtake_pending_move();
        if target >= self.routes.len() {
            return Err(HistoryError::OutOfRange {
                target,
                len: self.routes.len(),
            });
        }
        Ok(self.travel(target, guard))
    }

    /// A navigation issued before the pending move was reported starts from
    /// wherever the platform actually is. A move the platform dropped (for
    /// instance past the end of its own stack) never reports at all.
    fn overtake_pending_move(&mut self) {
        let Phase::AwaitingNative { target } = self.phase else {
            return;
        };
        let at = self.platform.state_token().unwrap_or(0);
        if at < self.routes.len() {
            self.cursor = at;
        }
        debug!(
            requested = target,
            cursor = self.cursor,
            "navigation issued before the pending move settled"
        );
        self.phase = Phase::Synchronized;
    }

    fn travel(&mut self, target: usize, guard: &mut dyn ExitGuard) -> Navigation {
        if target == self.cursor {
            return Navigation::Unchanged;
        }
        if !self.can_navigate() {
            return Navigation::Busy;
        }
        if !self.check_exit(guard) {
            return Navigation::Blocked;
        }

        self.save_ui_state();
        let delta = target as isize - self.cursor as isize;
        debug!(from = self.cursor, to = target, delta, "relative navigation");
        self.phase = Phase::AwaitingNative { target };
        self.platform.go(delta);
        Navigation::Pending
    }

    /// Handles the platform's notification that a native navigation settled
    /// on the entry tagged `token`. Entries without a token count as index 0.
    /// A notification for an entry the platform has already left is
    /// superseded by a later navigation and ignored.
    pub fn handle_popstate(
        &mut self,
        token: Option<usize>,
        guard: &mut dyn ExitGuard,
    ) -> PopstateOutcome {
        let target = token.unwrap_or(0);
        if self.platform.state_token().unwrap_or(0) != target {
            debug!(settled = target, "superseded notification");
            return PopstateOutcome::Ignored;
        }

        if let Phase::Correcting { restore_to } = self.phase {
            self.phase = Phase::Synchronized;
            if target == restore_to {
                return PopstateOutcome::Ignored;
            }
            warn!(
                settled = target,
                restore_to, "native navigation overtook the correction"
            );
        }

        let requested = self.phase == Phase::AwaitingNative { target };
        if target == self.cursor && !requested {
            self.phase = Phase::Synchronized;
            return PopstateOutcome::Ignored;
        }

        // The platform already moved; a refusal has to move it back.
        if !requested && !self.check_exit(guard) {
            let delta = self.cursor as isize - target as isize;
            warn!(
                from = target,
                restore_to = self.cursor,
                "navigation refused by exit guard, restoring native position"
            );
            self.phase = Phase::Correcting {
                restore_to: self.cursor,
            };
            self.platform.go(delta);
            return PopstateOutcome::Blocked;
        }

        if !requested {
            self.save_ui_state();
        }
        if target >= self.routes.len() {
            self.routes.resize(target + 1, None);
        }
        self.cursor = target;
        self.phase = Phase::Synchronized;
        debug!(cursor = self.cursor, "adopted native navigation");
        PopstateOutcome::Adopted {
            cursor: self.cursor,
            route: self.routes[self.cursor].clone(),
        }
    }

    /// Overwrites the current slot's snapshot without touching the platform.
    /// Keeps persisted snapshots in step with flags mutated after navigation.
    pub fn refresh_current(&mut self, route: &Route) {
        match self.routes.get_mut(self.cursor) {
            Some(slot) => *slot = Some(route.clone()),
            None => {
                self.routes.resize(self.cursor, None);
                self.routes.push(Some(route.clone()));
            }
        }
    }

    fn check_exit(&mut self, guard: &mut dyn ExitGuard) -> bool {
        let Some(current) = self.current_route().cloned() else {
            return true;
        };
        let previous = self.phase;
        self.phase = Phase::PendingExitCheck;
        let allowed = guard.can_exit(&current);
        self.phase = previous;
        if !allowed {
            debug!(route = current.name().as_str(), "exit guard refused");
        }
        allowed
    }

    fn save_ui_state(&mut self) {
        let Some(Some(route)) = self.routes.get(self.cursor) else {
            return;
        };
        let route = route.clone();
        for (_, listener) in self.listeners.iter_mut() {
            if let Some((key, data)) = listener(&route) {
                self.ui_states
                    .entry(self.cursor)
                    .or_default()
                    .insert(key, data);
            }
        }
    }

    /// Writes the stack, cursor and UI states to session storage. `current`
    /// is the live route, which may carry flags newer than its snapshot.
    pub fn persist(&mut self, current: &Route) -> Result<(), HistoryError> {
        self.refresh_current(current);
        self.save_ui_state();

        let routes: Vec<Value> = self
            .routes
            .iter()
            .map(|r| r.as_ref().map(Route::to_json).unwrap_or(Value::Null))
            .collect();
        self.storage
            .set_item(ROUTES_KEY, &serde_json::to_string(&routes)?)?;
        self.storage
            .set_item(HISTORY_CURSOR_KEY, &serde_json::to_string(&self.cursor)?)?;
        self.storage
            .set_item(UI_STATES_KEY, &serde_json::to_string(&self.ui_states)?)?;
        debug!(entries = routes.len(), cursor = self.cursor, "persisted history");
        Ok(())
    }

    /// Rebuilds the stack from session storage. Returns `Ok(false)` and leaves
    /// the stack untouched unless all three keys are present.
    pub fn restore(&mut self) -> Result<bool, HistoryError> {
        let routes_json = self.storage.get_item(ROUTES_KEY)?;
        let cursor_json = self.storage.get_item(HISTORY_CURSOR_KEY)?;
        let ui_json = self.storage.get_item(UI_STATES_KEY)?;
        let (Some(routes_json), Some(cursor_json), Some(ui_json)) =
            (routes_json, cursor_json, ui_json)
        else {
            debug!("no persisted history");
            return Ok(false);
        };

        let raw: Vec<Value> = serde_json::from_str(&routes_json)?;
        let cursor: usize = serde_json::from_str(&cursor_json)?;
        let ui_states: BTreeMap<usize, UiStateBag> = serde_json::from_str(&ui_json)?;

        let routes: Vec<Option<Route>> = raw
            .iter()
            .enumerate()
            .map(|(index, value)| {
                if value.is_null() {
                    return None;
                }
                Some(Route::from_json(value).unwrap_or_else(|e| {
                    warn!(index, "persisted route is unreadable, using not-found: {e}");
                    Route::NotFound
                }))
            })
            .collect();

        let mut cursor = cursor;
        if let Some(token) = self.platform.state_token() {
            if token < routes.len() {
                cursor = token;
            }
        }
        self.cursor = cursor.min(routes.len().saturating_sub(1));
        self.phase = if routes.is_empty() {
            Phase::Idle
        } else {
            Phase::Synchronized
        };
        self.routes = routes;
        self.ui_states = ui_states;
        debug!(
            entries = self.routes.len(),
            cursor = self.cursor,
            "restored history"
        );
        Ok(true)
    }
}
