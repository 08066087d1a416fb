use std::future::Future;
use std::sync::Arc;

use quill_config::EVENT_CHANNEL_CAPACITY;
use quill_core::query::{query_param, split_url};
use quill_core::{ExitCheck, Post, PostId, RequestSeq, RequestTracker, Route};
use quill_persistence::SessionStorage;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::async_runtime;
use crate::domain::AppState;
use crate::history::{
    ExitGuard, HistoryCoordinator, HistoryError, ListenerId, Navigation, PopstateOutcome,
    UiStateListener,
};
use crate::ports::{NavigationPlatform, RemoteApi};
use crate::router;

use super::commands::{AppCommand, Dispatched};
use super::events::DomainEvent;
use super::reducer::{reduce, Effect};
use super::unhandled::{inspect_unhandled, Disposition};

/// Owner of the current route, the post working copy and every
/// route-triggered fetch.
///
/// Fetches run on tokio and report back through a channel; nothing they
/// return touches state until [`AppStore::tick`] or [`AppStore::process_next`]
/// applies it, and then only if its tracker is still current.
pub struct AppStore<A: RemoteApi> {
    state: AppState,
    history: HistoryCoordinator,
    platform: Arc<dyn NavigationPlatform>,
    api: Arc<A>,
    title: String,

    tx: mpsc::Sender<DomainEvent>,
    rx: mpsc::Receiver<DomainEvent>,
}

/// Refuses to leave a route holding unsaved edits unless the user confirms.
/// Confirming discards the working copy.
struct UnsavedPostGuard<'a> {
    post: &'a mut Option<Post>,
    unauthorized: bool,
    platform: &'a dyn NavigationPlatform,
}

impl ExitGuard for UnsavedPostGuard<'_> {
    fn can_exit(&mut self, current: &Route) -> bool {
        match current.can_exit(self.post.as_ref(), self.unauthorized) {
            ExitCheck::Allow => true,
            ExitCheck::Confirm(message) => {
                if self.platform.confirm(message) {
                    *self.post = None;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl<A: RemoteApi> AppStore<A> {
    pub fn new(
        api: A,
        platform: Arc<dyn NavigationPlatform>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: AppState::default(),
            history: HistoryCoordinator::new(platform.clone(), storage),
            platform,
            api: Arc::new(api),
            title: String::new(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn route(&self) -> &Route {
        &self.state.route
    }

    pub fn history(&self) -> &HistoryCoordinator {
        &self.history
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sender(&self) -> mpsc::Sender<DomainEvent> {
        self.tx.clone()
    }

    pub fn page_title(&self) -> String {
        self.state.route.page_title(self.state.post.as_ref())
    }

    pub fn add_ui_state_listener(&mut self, listener: UiStateListener) -> ListenerId {
        self.history.add_ui_state_listener(listener)
    }

    pub fn remove_ui_state_listener(&mut self, id: ListenerId) -> bool {
        self.history.remove_ui_state_listener(id)
    }

    /// Restores persisted history, activates the route for the current
    /// location and loads the session-wide data.
    pub fn start(&mut self) {
        match self.history.restore() {
            Ok(true) => debug!(entries = self.history.len(), "history restored"),
            Ok(false) => {}
            Err(e) => warn!("discarding persisted history: {e}"),
        }

        let decoded = router::resolve(&self.platform.location());
        // The snapshot remembers flags the URL cannot carry, such as `editing`.
        let route = match self.history.current_route() {
            Some(snapshot)
                if snapshot.name() == decoded.name()
                    && snapshot.path_with_params() == decoded.path_with_params() =>
            {
                snapshot.clone()
            }
            _ => decoded,
        };

        let recorded = route.clone();
        self.guarded(move |history, guard| history.replace(recorded, guard));
        self.activate(route);
        if !matches!(self.state.route, Route::Search(_)) {
            self.refresh_post_summaries();
        }
        self.get_me();
    }

    pub fn dispatch(&mut self, cmd: AppCommand) -> Dispatched {
        match cmd {
            AppCommand::GoNotFound => Dispatched::Navigation(self.go_not_found()),
            AppCommand::GoLogin => Dispatched::Navigation(self.go_login()),
            AppCommand::GoSearch(search) => Dispatched::Navigation(self.go_search(search)),
            AppCommand::GoNewPost => Dispatched::Navigation(self.go_new_post()),
            AppCommand::GoPost { id, title } => Dispatched::Navigation(self.go_post(id, title)),
            AppCommand::Back => Dispatched::Navigation(self.back()),
            AppCommand::GoToIndex(index) => match self.go_to_index(index) {
                Ok(nav) => Dispatched::Navigation(nav),
                Err(e) => {
                    warn!("{e}");
                    Dispatched::Nothing
                }
            },
            AppCommand::Login { username, password } => {
                Dispatched::Request(self.login(&username, &password))
            }
            AppCommand::Logout => {
                self.logout();
                Dispatched::Nothing
            }
            AppCommand::RefreshPostSummaries => Dispatched::Request(self.refresh_post_summaries()),
            AppCommand::SaveCurrentPost => self
                .save_current_post()
                .map(Dispatched::Request)
                .unwrap_or(Dispatched::Nothing),
            AppCommand::ResetCurrentPost => Dispatched::Navigation(self.reset_current_post()),
            AppCommand::SetEditing(editing) => {
                self.set_editing(editing);
                Dispatched::Nothing
            }
        }
    }

    // --- navigation ---

    pub fn go_not_found(&mut self) -> Navigation {
        self.navigate(Route::NotFound)
    }

    pub fn go_login(&mut self) -> Navigation {
        self.navigate(Route::Login)
    }

    /// `None` takes the search text from the current location.
    pub fn go_search(&mut self, search: Option<String>) -> Navigation {
        let text = search.unwrap_or_else(|| {
            let location = self.platform.location();
            let (_, query) = split_url(&location);
            query_param(query, "search").unwrap_or_default()
        });
        self.navigate(Route::search(text))
    }

    pub fn go_new_post(&mut self) -> Navigation {
        self.navigate(Route::NewPost)
    }

    /// Shows the cached copy right away, if any, and always fetches a fresh
    /// one. Calling it again for the current post retries the load.
    pub fn go_post(&mut self, id: PostId, title: Option<String>) -> Navigation {
        self.navigate(Route::post(id, title, false))
    }

    pub fn back(&mut self) -> Navigation {
        self.guarded(|history, guard| history.back(guard))
    }

    pub fn go_to_index(&mut self, index: usize) -> Result<Navigation, HistoryError> {
        self.guarded(|history, guard| history.go_to_index(index, guard))
    }

    /// Entry point for the platform's "navigation settled" notification.
    pub fn handle_popstate(&mut self, token: Option<usize>) -> PopstateOutcome {
        let outcome = self.guarded(|history, guard| history.handle_popstate(token, guard));
        if let PopstateOutcome::Adopted { route, .. } = &outcome {
            let route = route
                .clone()
                .unwrap_or_else(|| router::resolve(&self.platform.location()));
            self.activate(route);
        }
        outcome
    }

    /// Pre-unload hook. Returns the message to veto with; never prompts.
    pub fn before_unload(&self) -> Option<String> {
        match self
            .state
            .route
            .can_exit(self.state.post.as_ref(), self.state.unauthorized)
        {
            ExitCheck::Allow => None,
            ExitCheck::Confirm(message) => Some(message.to_string()),
        }
    }

    pub fn unload(&mut self) -> Result<(), HistoryError> {
        self.history.persist(&self.state.route)
    }

    fn navigate(&mut self, route: Route) -> Navigation {
        let current = &self.state.route;
        let replace = self.history.is_empty()
            || matches!(route, Route::NotFound)
            || route.should_replace(current)
            || (route.name() == current.name()
                && route.path_with_params() == current.path_with_params());

        let recorded = route.clone();
        let outcome = self.guarded(move |history, guard| {
            if replace {
                history.replace(recorded, guard)
            } else {
                history.push(recorded, guard)
            }
        });
        match outcome {
            Navigation::Committed => self.activate(route),
            other => debug!(route = route.name().as_str(), outcome = ?other, "navigation not committed"),
        }
        outcome
    }

    fn guarded<R>(
        &mut self,
        f: impl FnOnce(&mut HistoryCoordinator, &mut dyn ExitGuard) -> R,
    ) -> R {
        let mut guard = UnsavedPostGuard {
            post: &mut self.state.post,
            unauthorized: self.state.unauthorized,
            platform: self.platform.as_ref(),
        };
        f(&mut self.history, &mut guard)
    }

    /// Makes `route` current and starts whatever it loads.
    fn activate(&mut self, route: Route) {
        match route {
            Route::Post(mut target) => {
                let cached = self.state.post_cache.get(&target.id).cloned();
                target.cache_hit = cached.is_some();
                if target.title.is_none() {
                    target.title = cached.as_ref().map(|p| p.title.clone());
                }
                let id = target.id;
                self.state.post = cached;
                self.state.route = Route::Post(target);
                self.fetch_post(id);
            }
            Route::NewPost => {
                self.state.post = Some(Post::draft());
                self.state.route = Route::NewPost;
            }
            Route::Search(search) => {
                self.state.post = None;
                self.state.route = Route::Search(search);
                self.refresh_post_summaries();
            }
            other => {
                self.state.post = None;
                self.state.route = other;
            }
        }
        self.sync_route();
    }

    fn sync_route(&mut self) {
        if !self.history.is_empty() {
            self.history.refresh_current(&self.state.route);
        }
        self.sync_title();
    }

    fn sync_title(&mut self) {
        let title = self.page_title();
        if title != self.title {
            self.platform.set_title(&title);
            self.title = title;
        }
    }

    // --- data ---

    fn fetch_post(&mut self, id: PostId) -> RequestSeq {
        let tracker = RequestTracker::start();
        let request = tracker.seq();
        self.state.get_post_request = Some(tracker);
        let api = self.api.clone();
        self.spawn(async move {
            DomainEvent::PostLoaded {
                request,
                id,
                result: api.get_post(id).await,
            }
        });
        request
    }

    pub fn refresh_post_summaries(&mut self) -> RequestSeq {
        let tracker = RequestTracker::start();
        let request = tracker.seq();
        self.state.post_summaries_request = Some(tracker);
        let api = self.api.clone();
        self.spawn(async move {
            DomainEvent::PostSummariesLoaded {
                request,
                result: api.get_posts().await,
            }
        });
        request
    }

    pub fn get_me(&mut self) {
        let api = self.api.clone();
        self.spawn(async move {
            DomainEvent::MeLoaded {
                result: api.get_me().await,
            }
        });
    }

    pub fn login(&mut self, username: &str, password: &str) -> RequestSeq {
        let tracker = RequestTracker::start();
        let request = tracker.seq();
        self.state.login_request = Some(tracker);
        let api = self.api.clone();
        let (username, password) = (username.to_string(), password.to_string());
        self.spawn(async move {
            DomainEvent::LoggedIn {
                request,
                result: api.login(&username, &password).await,
            }
        });
        request
    }

    pub fn logout(&mut self) {
        let api = self.api.clone();
        self.spawn(async move {
            DomainEvent::LoggedOut {
                result: api.logout().await,
            }
        });
    }

    /// Adds the working copy if it has no id yet, patches it otherwise.
    pub fn save_current_post(&mut self) -> Option<RequestSeq> {
        let post = self.state.post.clone()?;
        let tracker = RequestTracker::start();
        let request = tracker.seq();
        self.state.save_post_request = Some(tracker);
        let created = post.id.is_none();
        let api = self.api.clone();
        self.spawn(async move {
            let result = if created {
                api.add_post(&post).await
            } else {
                api.save_post(&post).await
            };
            DomainEvent::PostSaved {
                request,
                created,
                result,
            }
        });
        Some(request)
    }

    /// Discards edits. A draft is abandoned by going back.
    pub fn reset_current_post(&mut self) -> Navigation {
        if matches!(self.state.route, Route::NewPost) {
            self.state.post = Some(Post::draft());
            return self.back();
        }
        if let Some(post) = self.state.post.as_mut() {
            post.reset();
        }
        self.sync_title();
        Navigation::Unchanged
    }

    pub fn set_editing(&mut self, editing: bool) -> bool {
        let Route::Post(route) = &mut self.state.route else {
            return false;
        };
        route.editing = editing;
        self.sync_route();
        true
    }

    /// Mutates the working copy. Returns false when there is none.
    pub fn edit_post(&mut self, f: impl FnOnce(&mut Post)) -> bool {
        let Some(post) = self.state.post.as_mut() else {
            return false;
        };
        f(post);
        self.sync_title();
        true
    }

    // --- completions ---

    /// Applies every completion that has already arrived.
    pub fn tick(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(ev) = self.rx.try_recv() {
            self.apply(ev);
            applied += 1;
        }
        applied
    }

    /// Waits for the next completion and applies it.
    pub async fn process_next(&mut self) {
        if let Some(ev) = self.rx.recv().await {
            self.apply(ev);
        }
    }

    pub fn apply(&mut self, ev: DomainEvent) {
        for effect in reduce(&mut self.state, ev) {
            match effect {
                Effect::GoLogin => {
                    self.go_login();
                }
                Effect::GoSearch => {
                    self.go_search(None);
                }
                Effect::GoPost { id, title } => {
                    self.go_post(id, title);
                }
                Effect::FetchMe => self.get_me(),
                Effect::Unhandled(err) => {
                    self.report_unhandled(err);
                }
            }
        }
        self.sync_route();
    }

    /// Central handler for failures nothing else dealt with.
    pub fn report_unhandled(&mut self, err: anyhow::Error) -> Disposition {
        let disposition = inspect_unhandled(&err);
        if disposition == Disposition::Escalated {
            self.state.unhandled_errors.push(format!("{err:#}"));
        }
        disposition
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = DomainEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = async move {
            let ev = work.await;
            if tx.send(ev).await.is_err() {
                debug!("store dropped before a completion was delivered");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => match async_runtime::runtime() {
                Ok(rt) => {
                    rt.spawn(task);
                }
                Err(e) => error!("no async runtime for background work: {e:#}"),
            },
        }
    }
}
