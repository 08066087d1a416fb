use quill_core::{Post, PostId, User};

/// Remote posts API. Failures that are API failures carry a
/// [`quill_core::ApiError`]; anything else is treated as unexpected.
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync + 'static {
    async fn login(&self, username: &str, password: &str) -> anyhow::Result<()>;
    async fn logout(&self) -> anyhow::Result<()>;
    async fn get_me(&self) -> anyhow::Result<User>;
    async fn get_posts(&self) -> anyhow::Result<Vec<Post>>;
    async fn get_post(&self, id: PostId) -> anyhow::Result<Post>;
    async fn add_post(&self, post: &Post) -> anyhow::Result<Post>;
    async fn save_post(&self, post: &Post) -> anyhow::Result<Post>;
}

/// The host's session history and document.
///
/// Relative navigation (`go`) only takes effect later: the host reports the
/// settled position by calling `AppStore::handle_popstate` with the token
/// that was stored on the entry.
pub trait NavigationPlatform: Send + Sync {
    fn push_state(&self, token: usize, url: Option<&str>);
    fn replace_state(&self, token: usize, url: Option<&str>);
    fn go(&self, delta: isize);
    /// Token stored on the active entry, if any.
    fn state_token(&self) -> Option<usize>;
    /// Current path and query.
    fn location(&self) -> String;
    fn confirm(&self, message: &str) -> bool;
    fn set_title(&self, title: &str);
}
