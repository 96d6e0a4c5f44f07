use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::constants::USER_AGENT;
use crate::error::{ClientError, Result};
use crate::models::responses::{decode_body, decode_page, Page};
use crate::models::ErrorBody;
use crate::utils::safe_lock;

/// HTTP client for the SwipeTune API.
///
/// Cheap to clone; clones share the connection pool and the bearer token,
/// so setting the token once (on login/refresh) applies to every caller.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    http: reqwest::Client,
    base_url: String,
    bearer: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_base_url(&config.api_url, config.request_timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ApiInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                bearer: Mutex::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Set or clear the bearer token sent with every request
    pub fn set_bearer_token(&self, token: Option<String>) {
        let mut bearer = safe_lock(&self.inner.bearer, "Api");
        if token.is_some() {
            log::debug!("[Api] Bearer token set");
        } else if bearer.is_some() {
            log::debug!("[Api] Bearer token cleared");
        }
        *bearer = token;
    }

    pub fn has_bearer_token(&self) -> bool {
        safe_lock(&self.inner.bearer, "Api").is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.inner.http.get(self.url(path)).query(query);
        let bytes = self.execute(Method::GET, path, request).await?;
        decode_body(&bytes)
    }

    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Page<T>> {
        let request = self.inner.http.get(self.url(path)).query(query);
        let bytes = self.execute(Method::GET, path, request).await?;
        decode_page(&bytes)
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let bytes = self.post_raw(path, body).await?;
        decode_body(&bytes)
    }

    /// POST whose response body the caller may ignore
    pub(crate) async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<Vec<u8>> {
        let request = self.inner.http.post(self.url(path)).json(body);
        self.execute(Method::POST, path, request).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let request = self.inner.http.delete(self.url(path));
        self.execute(Method::DELETE, path, request).await.map(|_| ())
    }

    async fn execute(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Vec<u8>> {
        let token = safe_lock(&self.inner.bearer, "Api").clone();
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        log::debug!("[Api] {} {}", method, path);
        let response = request.send().await.map_err(|e| {
            let err = ClientError::from(e);
            log::warn!("[Api] {} {} failed: {}", method, path, err);
            err
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::from)?;

        if !status.is_success() {
            let err = http_error(status, &bytes);
            log::warn!("[Api] {} {} -> {}", method, path, err);
            return Err(err);
        }
        Ok(bytes.to_vec())
    }
}

fn http_error(status: StatusCode, body: &[u8]) -> ClientError {
    let fallback = status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string();

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Http {
            status: status.as_u16(),
            error: parsed.error,
            detail: parsed.detail,
        },
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().chars().take(200).collect::<String>();
            ClientError::Http {
                status: status.as_u16(),
                error: fallback,
                detail: if text.is_empty() { None } else { Some(text) },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_body_is_parsed() {
        let err = http_error(
            StatusCode::UNAUTHORIZED,
            br#"{"error": "Invalid credentials", "detail": "email or password is wrong", "status": 401}"#,
        );
        assert_eq!(
            err,
            ClientError::Http {
                status: 401,
                error: "Invalid credentials".into(),
                detail: Some("email or password is wrong".into()),
            }
        );
    }

    #[test]
    fn plain_text_error_body_becomes_detail() {
        let err = http_error(StatusCode::BAD_GATEWAY, b"upstream down");
        match err {
            ClientError::Http { status, error, detail } => {
                assert_eq!(status, 502);
                assert_eq!(error, "Bad Gateway");
                assert_eq!(detail.as_deref(), Some("upstream down"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = ApiClient::with_base_url("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/health"), "http://localhost:9000/health");
        assert!(!client.has_bearer_token());
        client.set_bearer_token(Some("t".into()));
        assert!(client.clone().has_bearer_token());
    }
}
