use quill_core::{ApiError, ApiErrorKind, Post, PostId, RequestSeq, RequestTracker, Route};
use tracing::{debug, info, warn};

use crate::domain::AppState;

use super::events::DomainEvent;

/// Follow-up work a completion asks the store to perform.
#[derive(Debug)]
pub enum Effect {
    GoLogin,
    /// Search with the text from the current location.
    GoSearch,
    GoPost { id: PostId, title: Option<String> },
    FetchMe,
    Unhandled(anyhow::Error),
}

/// Applies a completion to `state`. Results whose tracker is no longer the
/// one in its slot are dropped without touching state.
pub fn reduce(state: &mut AppState, ev: DomainEvent) -> Vec<Effect> {
    let mut effects = Vec::new();
    match ev {
        DomainEvent::PostLoaded {
            request,
            id,
            result,
        } => {
            if settle(&mut state.get_post_request, "post", request, &result) {
                post_loaded(state, id, result, &mut effects);
            }
        }

        DomainEvent::PostSummariesLoaded { request, result } => {
            if settle(
                &mut state.post_summaries_request,
                "post summaries",
                request,
                &result,
            ) {
                match result {
                    Ok(posts) => {
                        state.post_summaries = posts;
                        state.post_summaries_initialized = true;
                        state.post_summaries_version += 1;
                    }
                    Err(err) => {
                        absorb(state, err, &mut effects);
                    }
                }
            }
        }

        DomainEvent::LoggedIn { request, result } => {
            if settle(&mut state.login_request, "login", request, &result) {
                match result {
                    Ok(()) => {
                        state.unauthorized = false;
                        effects.push(Effect::FetchMe);
                        effects.push(Effect::GoSearch);
                    }
                    Err(err) => {
                        if absorb(state, err, &mut effects) != Some(ApiErrorKind::Unauthorized) {
                            effects.push(Effect::GoLogin);
                        }
                    }
                }
            }
        }

        DomainEvent::LoggedOut { result } => match result {
            Ok(()) => {
                state.unauthorized = true;
                state.clear_cache();
                effects.push(Effect::GoLogin);
            }
            Err(err) => {
                if absorb(state, err, &mut effects) == Some(ApiErrorKind::Unauthorized) {
                    state.clear_cache();
                }
            }
        },

        DomainEvent::MeLoaded { result } => match result {
            Ok(me) => state.me = Some(me),
            Err(err) => {
                absorb(state, err, &mut effects);
            }
        },

        DomainEvent::PostSaved {
            request,
            created,
            result,
        } => {
            let result = result.and_then(|post| match post.id {
                Some(id) => Ok((id, post)),
                None => Err(anyhow::anyhow!("saved post came back without an id")),
            });
            if settle(&mut state.save_post_request, "save post", request, &result) {
                match result {
                    Ok((id, saved)) => post_saved(state, id, saved, created, &mut effects),
                    Err(err) => {
                        absorb(state, err, &mut effects);
                    }
                }
            }
        }
    }
    effects
}

fn post_loaded(
    state: &mut AppState,
    id: PostId,
    result: anyhow::Result<Post>,
    effects: &mut Vec<Effect>,
) {
    let showing = state.current_post_id() == Some(id);
    match result {
        Ok(post) => {
            state.post_cache.insert(id, post.clone());
            if !showing {
                return;
            }
            if let Route::Post(route) = &mut state.route {
                route.title = Some(post.title.clone());
                route.not_found = false;
                route.error = false;
            }
            if state.post.as_ref().is_some_and(Post::is_dirty) {
                debug!(id, "keeping local edits over the refreshed post");
            } else {
                state.post = Some(post);
            }
        }
        Err(err) => {
            let kind = absorb(state, err, effects);
            if kind == Some(ApiErrorKind::NotFound) {
                state.post_cache.remove(&id);
            }
            if !showing {
                return;
            }
            if let Route::Post(route) = &mut state.route {
                match kind {
                    Some(ApiErrorKind::NotFound) => {
                        route.not_found = true;
                        state.post = None;
                    }
                    Some(ApiErrorKind::Unauthorized) => {}
                    _ => route.error = true,
                }
            }
        }
    }
}

fn post_saved(
    state: &mut AppState,
    id: PostId,
    saved: Post,
    created: bool,
    effects: &mut Vec<Effect>,
) {
    state.post_cache.insert(id, saved.clone());
    if created {
        if matches!(state.route, Route::NewPost) {
            let title = Some(saved.title.clone());
            state.post = Some(saved);
            effects.push(Effect::GoPost { id, title });
        }
        return;
    }
    if state.current_post_id() == Some(id) {
        if let Route::Post(route) = &mut state.route {
            route.title = Some(saved.title.clone());
        }
        state.post = Some(saved);
    }
}

/// Settles the tracker in `slot` if it is still the one `request` ran under.
fn settle<T>(
    slot: &mut Option<RequestTracker>,
    what: &'static str,
    request: RequestSeq,
    result: &anyhow::Result<T>,
) -> bool {
    let Some(tracker) = slot.as_mut().filter(|t| t.seq() == request) else {
        info!(
            request,
            current = slot.as_ref().map(RequestTracker::seq),
            "race condition prevented, discarding stale {what} result"
        );
        return false;
    };
    let settled = match result {
        Ok(_) => tracker.succeed(),
        Err(err) => tracker.fail(failure_message(err)),
    };
    if let Err(e) = settled {
        warn!("{what}: {e}");
        return false;
    }
    true
}

fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.message().to_string(),
        None => format!("{err:#}"),
    }
}

/// Classifies a failure. A 401 invalidates the session; anything that is not
/// an API error is handed to the unhandled-error inspector.
fn absorb(
    state: &mut AppState,
    err: anyhow::Error,
    effects: &mut Vec<Effect>,
) -> Option<ApiErrorKind> {
    let kind = err.downcast_ref::<ApiError>().map(ApiError::kind);
    match kind {
        Some(ApiErrorKind::Unauthorized) => {
            state.unauthorized = true;
            effects.push(Effect::GoLogin);
        }
        Some(_) => debug!("request failed: {err:#}"),
        None => effects.push(Effect::Unhandled(err)),
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::PostRoute;

    fn api_err(status: u16, message: &str) -> anyhow::Error {
        anyhow::Error::new(ApiError::api(status, "Error", message))
    }

    fn viewing(id: PostId) -> (AppState, RequestSeq) {
        let tracker = RequestTracker::start();
        let seq = tracker.seq();
        let state = AppState {
            route: Route::Post(PostRoute::new(id, None, false)),
            get_post_request: Some(tracker),
            ..AppState::default()
        };
        (state, seq)
    }

    #[test]
    fn stale_post_results_change_nothing() {
        let (mut state, _) = viewing(5);
        let stale = RequestTracker::start().seq();
        let effects = reduce(
            &mut state,
            DomainEvent::PostLoaded {
                request: stale,
                id: 5,
                result: Ok(Post::new(Some(5), "old", "")),
            },
        );
        assert!(effects.is_empty());
        assert!(state.post.is_none());
        assert!(state.post_cache.is_empty());
        assert!(state.get_post_request.as_ref().unwrap().is_pending());
    }

    #[test]
    fn not_found_marks_the_route() {
        let (mut state, seq) = viewing(5);
        state.post_cache.insert(5, Post::new(Some(5), "cached", ""));
        reduce(
            &mut state,
            DomainEvent::PostLoaded {
                request: seq,
                id: 5,
                result: Err(api_err(404, "Post(5) not found")),
            },
        );
        let Route::Post(route) = &state.route else {
            panic!("route changed");
        };
        assert!(route.not_found);
        assert!(!route.error);
        assert!(state.post.is_none());
        assert!(state.post_cache.is_empty());
        assert_eq!(
            state.get_post_request.as_ref().unwrap().error(),
            Some("Post(5) not found")
        );
    }

    #[test]
    fn unauthorized_flips_the_session() {
        let (mut state, seq) = viewing(5);
        let effects = reduce(
            &mut state,
            DomainEvent::PostLoaded {
                request: seq,
                id: 5,
                result: Err(api_err(401, "Unauthorized")),
            },
        );
        assert!(state.unauthorized);
        assert!(matches!(effects.as_slice(), [Effect::GoLogin]));
    }

    #[test]
    fn unexpected_errors_fail_the_tracker_and_escalate() {
        let (mut state, seq) = viewing(5);
        let effects = reduce(
            &mut state,
            DomainEvent::PostLoaded {
                request: seq,
                id: 5,
                result: Err(anyhow::anyhow!("body was not a post")),
            },
        );
        assert!(state.get_post_request.as_ref().unwrap().failed());
        assert!(matches!(effects.as_slice(), [Effect::Unhandled(_)]));
        let Route::Post(route) = &state.route else {
            panic!("route changed");
        };
        assert!(route.error);
    }

    #[test]
    fn local_edits_survive_a_refresh() {
        let (mut state, seq) = viewing(5);
        let mut edited = Post::new(Some(5), "mine", "");
        edited.title = "mine, edited".into();
        state.post = Some(edited);
        reduce(
            &mut state,
            DomainEvent::PostLoaded {
                request: seq,
                id: 5,
                result: Ok(Post::new(Some(5), "server", "")),
            },
        );
        assert_eq!(state.post.as_ref().unwrap().title, "mine, edited");
        assert_eq!(state.post_cache[&5].title, "server");
    }

    #[test]
    fn created_post_moves_to_its_route() {
        let tracker = RequestTracker::start();
        let seq = tracker.seq();
        let mut state = AppState {
            route: Route::NewPost,
            post: Some(Post::draft()),
            save_post_request: Some(tracker),
            ..AppState::default()
        };
        let effects = reduce(
            &mut state,
            DomainEvent::PostSaved {
                request: seq,
                created: true,
                result: Ok(Post::new(Some(9), "Fresh", "")),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [Effect::GoPost { id: 9, title: Some(t) }] if t == "Fresh"
        ));
        assert!(!state.post.as_ref().unwrap().is_dirty());
        assert!(state.post_cache.contains_key(&9));
    }

    #[test]
    fn failed_login_returns_to_login() {
        let tracker = RequestTracker::start();
        let seq = tracker.seq();
        let mut state = AppState {
            route: Route::Login,
            login_request: Some(tracker),
            ..AppState::default()
        };
        let effects = reduce(
            &mut state,
            DomainEvent::LoggedIn {
                request: seq,
                result: Err(api_err(403, "Wrong password or username")),
            },
        );
        assert!(matches!(effects.as_slice(), [Effect::GoLogin]));
        let login = state.login_request.as_ref().unwrap();
        assert!(login.failed());
        assert_eq!(login.error(), Some("Wrong password or username"));
    }
}
