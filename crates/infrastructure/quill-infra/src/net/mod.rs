use quill_core::{ApiError, Post, PostId, PostPayload, User};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A successful response whose body is not what the endpoint promises.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client with a cookie jar, so the session cookie set by `/login` is sent
/// on every following call.
pub fn default_http_client() -> reqwest::Result<Client> {
    Client::builder().cookie_store(true).build()
}

/// JSON client for the posts API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    host: String,
}

impl ApiClient {
    pub fn new(client: Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.host, endpoint)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: String,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("NetworkError: {url}: {e}");
                ApiError::network(e.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if let Some(api_error) = api_error_from(status, body.as_ref(), &bytes) {
            error!("ApiError: {url}: {api_error}");
            return Err(api_error.into());
        }

        debug!("{status} {url}");
        serde_json::from_value(body.unwrap_or(Value::Null))
            .map_err(|source| ClientError::Decode { url, source })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let url = self.url(endpoint);
        let request = self.client.get(&url);
        self.call(url, request).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let url = self.url(endpoint);
        let request = self.client.post(&url).json(body);
        self.call(url, request).await
    }

    async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let url = self.url(endpoint);
        let request = self.client.patch(&url).json(body);
        self.call(url, request).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let _: Value = self
            .post("/login", &json!({ "username": username, "password": password }))
            .await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: Value = self.post("/logout", &Value::Null).await?;
        Ok(())
    }

    pub async fn get_me(&self) -> Result<User, ClientError> {
        self.get("/me").await
    }

    pub async fn get_posts(&self) -> Result<Vec<Post>, ClientError> {
        self.get("/posts").await
    }

    pub async fn get_post(&self, id: PostId) -> Result<Post, ClientError> {
        self.get(&format!("/posts/{id}")).await
    }

    pub async fn add_post(&self, post: &Post) -> Result<Post, ClientError> {
        self.post("/posts", &payload_json(post.to_payload())).await
    }

    pub async fn save_post(&self, post: &Post) -> Result<Post, ClientError> {
        let id = post
            .id
            .ok_or_else(|| ApiError::api(400, "Bad Request", "Post has no id yet"))?;
        self.patch(&format!("/posts/{id}"), &payload_json(post.to_payload()))
            .await
    }
}

fn payload_json(payload: PostPayload) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// A non-2xx status, or a body flagging `error`, is an API failure.
fn api_error_from(status: StatusCode, body: Option<&Value>, raw: &[u8]) -> Option<ApiError> {
    let flagged = body
        .and_then(|b| b.get("error"))
        .is_some_and(|e| !matches!(e, Value::Null | Value::Bool(false)));
    if status.is_success() && !flagged {
        return None;
    }

    let reason = status.canonical_reason().unwrap_or("Error").to_string();
    let tag = body
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| reason.clone());
    let message = body
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let text = String::from_utf8_lossy(raw).trim().to_string();
            (body.is_none() && !text.is_empty()).then_some(text)
        })
        .unwrap_or(reason);

    Some(ApiError::api(status.as_u16(), tag, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_error_flag_is_ok() {
        assert!(api_error_from(StatusCode::OK, Some(&json!({"id": 1})), b"").is_none());
        assert!(api_error_from(StatusCode::OK, Some(&json!(true)), b"true").is_none());
    }

    #[test]
    fn error_body_drives_tag_and_message() {
        let body = json!({"error": true, "message": "Wrong password or username"});
        let err = api_error_from(StatusCode::FORBIDDEN, Some(&body), b"").unwrap();
        assert_eq!(
            err,
            ApiError::api(403, "Forbidden", "Wrong password or username")
        );
    }

    #[test]
    fn flagged_success_is_still_an_error() {
        let body = json!({"error": "Conflict", "message": "stale"});
        let err = api_error_from(StatusCode::OK, Some(&body), b"").unwrap();
        assert_eq!(err, ApiError::api(200, "Conflict", "stale"));
    }

    #[test]
    fn plain_text_errors_keep_their_text() {
        let err = api_error_from(StatusCode::BAD_GATEWAY, None, b"upstream down").unwrap();
        assert_eq!(err.message(), "upstream down");
        assert_eq!(err.status_code(), Some(502));
    }
}
