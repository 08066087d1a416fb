#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use quill_app_core::{AppStore, RemoteApi, SimulatedPlatform};
use quill_core::{ApiError, Post, PostId, User};
use quill_persistence::MemorySessionStorage;
use tokio::sync::oneshot;

/// In-memory posts API. Calls can be held back with gates to stage
/// out-of-order completions.
#[derive(Default)]
pub struct FakeApi {
    pub posts: Mutex<BTreeMap<PostId, Post>>,
    pub logged_in: Mutex<bool>,
    pub require_login: Mutex<bool>,
    pub broken_posts: Mutex<bool>,
    post_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    post_failures: Mutex<VecDeque<ApiError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_posts(posts: &[(PostId, &str, &str)]) -> Self {
        let api = Self::default();
        {
            let mut map = api.posts.lock().unwrap();
            for (id, title, text) in posts {
                map.insert(*id, Post::new(Some(*id), *title, *text));
            }
        }
        api
    }

    pub fn signed_in(self) -> Self {
        *self.logged_in.lock().unwrap() = true;
        self
    }

    /// Holds the next `get_post` call until the returned sender fires.
    pub fn gate_next_get_post(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.post_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Makes the next `get_post` call fail with `err`.
    pub fn fail_next_get_post(&self, err: ApiError) {
        self.post_failures.lock().unwrap().push_back(err);
    }

    pub fn set_post(&self, id: PostId, title: &str, text: &str) {
        self.posts
            .lock()
            .unwrap()
            .insert(id, Post::new(Some(id), title, text));
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn check_session(&self) -> anyhow::Result<()> {
        if *self.require_login.lock().unwrap() && !*self.logged_in.lock().unwrap() {
            return Err(ApiError::api(401, "Unauthorized", "Unauthorized").into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteApi for FakeApi {
    async fn login(&self, username: &str, password: &str) -> anyhow::Result<()> {
        self.record("login");
        if username == "admin" && password == "admin" {
            *self.logged_in.lock().unwrap() = true;
            Ok(())
        } else {
            Err(ApiError::api(403, "Forbidden", "Wrong password or username").into())
        }
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.record("logout");
        *self.logged_in.lock().unwrap() = false;
        Ok(())
    }

    async fn get_me(&self) -> anyhow::Result<User> {
        self.record("get_me");
        if !*self.logged_in.lock().unwrap() {
            return Err(ApiError::api(401, "Unauthorized", "Unauthorized").into());
        }
        Ok(User {
            id: 0,
            name: "Admin".into(),
        })
    }

    async fn get_posts(&self) -> anyhow::Result<Vec<Post>> {
        self.record("get_posts");
        self.check_session()?;
        if *self.broken_posts.lock().unwrap() {
            return Err(anyhow::anyhow!("invalid response: expected a list"));
        }
        Ok(self.posts.lock().unwrap().values().cloned().collect())
    }

    async fn get_post(&self, id: PostId) -> anyhow::Result<Post> {
        self.record(format!("get_post {id}"));
        let gate = self.post_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check_session()?;
        if let Some(err) = self.post_failures.lock().unwrap().pop_front() {
            return Err(err.into());
        }
        self.posts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::api(404, "Not Found", format!("Post({id}) not found")).into())
    }

    async fn add_post(&self, post: &Post) -> anyhow::Result<Post> {
        self.record("add_post");
        self.check_session()?;
        if post.title.is_empty() {
            return Err(ApiError::api(400, "Bad Request", "Post needs a title").into());
        }
        let mut posts = self.posts.lock().unwrap();
        let id = posts.keys().next_back().map_or(0, |id| id + 1);
        let saved = Post::new(Some(id), post.title.clone(), post.text.clone());
        posts.insert(id, saved.clone());
        Ok(saved)
    }

    async fn save_post(&self, post: &Post) -> anyhow::Result<Post> {
        self.record("save_post");
        self.check_session()?;
        let id = post.id.ok_or_else(|| ApiError::api(400, "Bad Request", "no id"))?;
        let saved = Post::new(Some(id), post.title.clone(), post.text.clone());
        self.posts.lock().unwrap().insert(id, saved.clone());
        Ok(saved)
    }
}

pub struct Harness {
    pub store: AppStore<FakeApi>,
    pub platform: Arc<SimulatedPlatform>,
    pub storage: Arc<MemorySessionStorage>,
}

pub fn harness(api: FakeApi, url: &str) -> Harness {
    let platform = Arc::new(SimulatedPlatform::new(url));
    let storage = Arc::new(MemorySessionStorage::default());
    let store = AppStore::new(api, platform.clone(), storage.clone());
    Harness {
        store,
        platform,
        storage,
    }
}

impl Harness {
    /// Lets spawned fetches finish and applies everything they produced.
    pub async fn settle(&mut self) {
        for _ in 0..5 {
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            self.store.tick();
        }
    }

    /// Delivers every pending platform notification to the store.
    pub fn deliver_popstates(&mut self) {
        while let Some(token) = self.platform.next_notification() {
            self.store.handle_popstate(token);
        }
    }
}
