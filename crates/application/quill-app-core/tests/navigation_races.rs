//! Out-of-order completions, exit guards and native back/forward.

mod common;

use common::{harness, FakeApi};
use quill_app_core::{AppStore, Navigation, NavigationPlatform, PopstateOutcome};
use quill_config::UNSAVED_POST_MESSAGE;
use quill_core::Route;

#[tokio::test]
async fn older_post_response_arriving_last_is_discarded() {
    let mut h = harness(FakeApi::with_posts(&[(5, "v1", "")]).signed_in(), "/");
    h.store.start();
    h.settle().await;

    let first = h.store.api().gate_next_get_post();
    h.store.go_post(5, None);
    let second = h.store.api().gate_next_get_post();
    h.store.go_post(5, None);
    tokio::task::yield_now().await;

    h.store.api().set_post(5, "v2", "");
    second.send(()).unwrap();
    h.store.process_next().await;
    assert_eq!(h.store.state().post.as_ref().unwrap().title, "v2");

    h.store.api().set_post(5, "stale", "");
    first.send(()).unwrap();
    h.store.process_next().await;

    let state = h.store.state();
    assert_eq!(state.post.as_ref().unwrap().title, "v2");
    assert_eq!(state.post_cache[&5].title, "v2");
    match &state.route {
        Route::Post(route) => assert_eq!(route.title.as_deref(), Some("v2")),
        other => panic!("unexpected route {other:?}"),
    }
    assert!(state.get_post_request.as_ref().unwrap().succeeded());
}

#[tokio::test]
async fn response_for_a_post_left_behind_only_fills_the_cache() {
    let mut h = harness(
        FakeApi::with_posts(&[(5, "Five", ""), (6, "Six", "")]).signed_in(),
        "/",
    );
    h.store.start();
    h.settle().await;

    let gate = h.store.api().gate_next_get_post();
    h.store.go_post(5, None);
    tokio::task::yield_now().await;
    h.store.go_search(Some("six".into()));

    gate.send(()).unwrap();
    h.settle().await;
    assert_eq!(h.store.route(), &Route::search("six"));
    assert!(h.store.state().post.is_none());
    assert!(h.store.state().post_cache.contains_key(&5));
}

async fn editing_post_five() -> common::Harness {
    let mut h = harness(FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(), "/");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;
    assert!(h.store.edit_post(|p| p.title = "unsaved".into()));
    h
}

fn assert_still_on_dirty_post(store: &AppStore<FakeApi>, cursor: usize) {
    assert_eq!(store.history().cursor(), cursor);
    assert!(matches!(store.route(), Route::Post(p) if p.id == 5));
    assert!(store.state().post.as_ref().unwrap().is_dirty());
}

#[tokio::test]
async fn declined_confirmation_blocks_navigation() {
    let mut h = editing_post_five().await;
    let cursor = h.store.history().cursor();

    h.platform.answer_confirm(false);
    assert_eq!(h.store.go_new_post(), Navigation::Blocked);
    assert_still_on_dirty_post(&h.store, cursor);
    assert_eq!(h.platform.prompts(), vec![UNSAVED_POST_MESSAGE.to_string()]);
    assert_eq!(h.platform.location(), "/posts/5");

    h.platform.answer_confirm(false);
    assert_eq!(h.store.back(), Navigation::Blocked);
    assert_still_on_dirty_post(&h.store, cursor);
    assert_eq!(h.platform.pending_notifications(), 0);
}

#[tokio::test]
async fn accepted_confirmation_discards_the_edits() {
    let mut h = editing_post_five().await;
    h.platform.answer_confirm(true);
    assert_eq!(h.store.go_search(Some("x".into())), Navigation::Committed);
    assert_eq!(h.store.route(), &Route::search("x"));
    assert!(h.store.state().post.is_none());
    assert_eq!(h.store.before_unload(), None);
}

#[tokio::test]
async fn native_back_over_unsaved_edits_is_undone() {
    let mut h = editing_post_five().await;
    h.platform.set_default_confirm(false);

    h.platform.user_go(-1);
    let token = h.platform.next_notification().unwrap();
    assert_eq!(h.store.handle_popstate(token), PopstateOutcome::Blocked);
    assert!(!h.store.history().can_navigate());

    // The correction settles as its own notification and is let through.
    let token = h.platform.next_notification().unwrap();
    assert_eq!(h.store.handle_popstate(token), PopstateOutcome::Ignored);

    assert_still_on_dirty_post(&h.store, 1);
    assert_eq!(h.platform.index(), 1);
    assert_eq!(h.platform.location(), "/posts/5");
    assert_eq!(h.platform.prompts().len(), 1, "asked exactly once");
    assert!(h.store.history().can_navigate());
}

#[tokio::test]
async fn native_back_from_a_clean_post_switches_routes() {
    let mut h = harness(FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(), "/?search=dra");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;

    h.platform.user_go(-1);
    h.deliver_popstates();
    assert_eq!(h.store.route(), &Route::search("dra"));
    assert_eq!(h.store.history().cursor(), 0);
    assert_eq!(h.platform.title(), "Search: dra");

    h.platform.user_go(1);
    h.deliver_popstates();
    assert!(matches!(h.store.route(), Route::Post(p) if p.id == 5 && p.cache_hit));
}

#[tokio::test]
async fn requested_back_settles_on_notification() {
    let mut h = harness(FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(), "/");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;

    assert_eq!(h.store.back(), Navigation::Pending);
    assert!(matches!(h.store.route(), Route::Post(_)), "not yet applied");

    h.deliver_popstates();
    assert_eq!(h.store.route(), &Route::search(""));
    assert_eq!(h.store.history().cursor(), 0);
}

#[tokio::test]
async fn link_followed_before_back_settles_lands_after_it() {
    let mut h = harness(FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(), "/");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;

    assert_eq!(h.store.back(), Navigation::Pending);
    assert_eq!(h.store.go_login(), Navigation::Committed);
    h.deliver_popstates();

    assert_eq!(h.store.route(), &Route::Login);
    assert_eq!(
        h.store.history().entries(),
        &[Some(Route::search("")), Some(Route::Login)]
    );
    assert_eq!(h.platform.urls(), vec!["/".to_string(), "/login".to_string()]);
    assert_eq!(h.platform.state_token(), Some(1));
}

#[tokio::test]
async fn unauthorized_session_skips_the_guard() {
    let api = FakeApi::with_posts(&[(5, "Draft", "")]).signed_in();
    *api.require_login.lock().unwrap() = true;
    let mut h = harness(api, "/");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;
    h.store.edit_post(|p| p.title = "unsaved".into());

    *h.store.api().logged_in.lock().unwrap() = false;
    h.store.refresh_post_summaries();
    h.settle().await;

    assert!(h.store.state().unauthorized);
    assert_eq!(h.store.route(), &Route::Login);
    assert!(h.platform.prompts().is_empty());
}

#[tokio::test]
async fn reload_restores_stack_and_snapshot_flags() {
    let mut h = harness(FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(), "/");
    h.store.start();
    h.store.go_post(5, None);
    h.settle().await;
    h.store.set_editing(true);
    h.store.unload().unwrap();

    let mut reloaded = AppStore::new(
        FakeApi::with_posts(&[(5, "Draft", "")]).signed_in(),
        h.platform.clone(),
        h.storage.clone(),
    );
    reloaded.start();
    assert_eq!(reloaded.history().len(), 2);
    assert_eq!(reloaded.history().cursor(), 1);
    match reloaded.route() {
        Route::Post(route) => {
            assert_eq!(route.id, 5);
            assert!(route.editing);
            assert_eq!(route.title.as_deref(), Some("Draft"));
        }
        other => panic!("unexpected route {other:?}"),
    }
    assert_eq!(h.platform.len(), 2);
}
