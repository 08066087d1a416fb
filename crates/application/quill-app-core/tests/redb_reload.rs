//! History survives a process restart when backed by the redb session store.

mod common;

use std::sync::Arc;

use camino::Utf8PathBuf;
use common::FakeApi;
use quill_app_core::{AppStore, SimulatedPlatform};
use quill_core::Route;
use quill_persistence::RedbSessionStorage;

#[tokio::test]
async fn restart_restores_history_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let platform = Arc::new(SimulatedPlatform::new("/"));

    {
        let storage = Arc::new(RedbSessionStorage::open(&root).unwrap());
        let mut store = AppStore::new(
            FakeApi::with_posts(&[(3, "Three", "")]).signed_in(),
            platform.clone(),
            storage,
        );
        store.start();
        store.go_search(Some("thr".into()));
        store.go_post(3, Some("Three".into()));
        store.unload().unwrap();
    }

    let storage = Arc::new(RedbSessionStorage::open(&root).unwrap());
    let mut store = AppStore::new(
        FakeApi::with_posts(&[(3, "Three", "")]).signed_in(),
        platform.clone(),
        storage,
    );
    store.start();
    assert_eq!(store.history().len(), 2);
    assert_eq!(
        store.history().entries()[0],
        Some(Route::search("thr")),
        "search edits replaced the first entry"
    );
    assert!(matches!(store.route(), Route::Post(p) if p.id == 3));
    assert_eq!(platform.title(), "Three");
}
