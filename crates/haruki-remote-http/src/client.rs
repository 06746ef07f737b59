//! Shared JSON-over-HTTP client

use haruki_remote_api::{RemoteError, RemoteResult};
use haruki_util::truncate_body;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest error body carried into user-facing messages
pub const MAX_ERROR_BODY: usize = 300;

/// An API-key authenticated JSON client rooted at one base URL
#[derive(Debug, Clone)]
pub struct JsonClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl JsonClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Absolute URL for an API path such as `/api/v1/search?query=x`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let body = self.execute(self.request(Method::GET, path)).await?;
        decode(path, &body)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> RemoteResult<T> {
        let body = self
            .execute(self.request(Method::POST, path).json(payload))
            .await?;
        decode(path, &body)
    }

    /// POST and ignore whatever the service answers with
    pub async fn post_discard<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> RemoteResult<()> {
        self.execute(self.request(Method::POST, path).json(payload))
            .await
            .map(|_| ())
    }

    /// PUT and ignore whatever the service answers with
    pub async fn put_discard<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> RemoteResult<()> {
        self.execute(self.request(Method::PUT, path).json(payload))
            .await
            .map(|_| ())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(method = %method, path, "Remote call");
        self.http
            .request(method, self.url(path))
            .header("X-Api-Key", &self.api_key)
    }

    async fn execute(&self, request: RequestBuilder) -> RemoteResult<Vec<u8>> {
        let response = request.send().await.map_err(map_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            warn!(status = status.as_u16(), base_url = %self.base_url, "Remote call failed");
            return Err(RemoteError::http(
                status.as_u16(),
                truncate_body(text.trim(), MAX_ERROR_BODY),
            ));
        }

        Ok(body.to_vec())
    }
}

fn map_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(e.to_string())
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> RemoteResult<T> {
    serde_json::from_slice(body).map_err(|e| RemoteError::Decode(format!("{}: {}", path, e)))
}

/// Query-string encoding with spaces as `%20`
pub fn encode_query(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() {
        let client = JsonClient::new("http://seerr:5055/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/api/v1/user"), "http://seerr:5055/api/v1/user");
    }

    #[test]
    fn spaces_encode_as_percent_twenty() {
        assert_eq!(encode_query("the office"), "the%20office");
        assert_eq!(encode_query("a&b"), "a%26b");
    }

    #[test]
    fn decode_reports_path() {
        let err = decode::<Vec<u32>>("/api/v3/series", b"{").unwrap_err();
        assert!(matches!(err, RemoteError::Decode(ref msg) if msg.starts_with("/api/v3/series")));
    }
}
