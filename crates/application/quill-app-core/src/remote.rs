use quill_config::DEFAULT_API_HOST;
use quill_core::{Post, PostId, User};
use quill_infra::{default_http_client, ApiClient, ClientError};

use crate::ports::RemoteApi;

/// [`RemoteApi`] over HTTP. API failures surface as `anyhow` errors wrapping
/// a bare [`quill_core::ApiError`] so the store can downcast them.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: ApiClient,
}

impl HttpRemoteApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn connect(host: &str) -> anyhow::Result<Self> {
        Ok(Self::new(ApiClient::new(default_http_client()?, host)))
    }

    /// Connects to [`DEFAULT_API_HOST`].
    pub fn connect_default() -> anyhow::Result<Self> {
        Self::connect(DEFAULT_API_HOST)
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }
}

fn lift(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::Api(api) => anyhow::Error::new(api),
        other => anyhow::Error::new(other),
    }
}

#[async_trait::async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn login(&self, username: &str, password: &str) -> anyhow::Result<()> {
        self.client.login(username, password).await.map_err(lift)
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.client.logout().await.map_err(lift)
    }

    async fn get_me(&self) -> anyhow::Result<User> {
        self.client.get_me().await.map_err(lift)
    }

    async fn get_posts(&self) -> anyhow::Result<Vec<Post>> {
        self.client.get_posts().await.map_err(lift)
    }

    async fn get_post(&self, id: PostId) -> anyhow::Result<Post> {
        self.client.get_post(id).await.map_err(lift)
    }

    async fn add_post(&self, post: &Post) -> anyhow::Result<Post> {
        self.client.add_post(post).await.map_err(lift)
    }

    async fn save_post(&self, post: &Post) -> anyhow::Result<Post> {
        self.client.save_post(post).await.map_err(lift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{ApiError, ApiErrorKind};

    #[test]
    fn api_errors_stay_downcastable() {
        let err = lift(ClientError::Api(ApiError::api(401, "Unauthorized", "nope")));
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::Unauthorized);
    }

    #[test]
    fn default_connection_targets_the_configured_host() {
        let api = HttpRemoteApi::connect_default().unwrap();
        assert_eq!(api.host(), DEFAULT_API_HOST);
    }

    #[test]
    fn decode_errors_are_not_api_errors() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = lift(ClientError::Decode {
            url: "http://h/posts".into(),
            source,
        });
        assert!(err.downcast_ref::<ApiError>().is_none());
    }
}
