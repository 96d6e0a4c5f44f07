// Authentication endpoints
use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;

use super::ApiClient;
use crate::error::Result;
use crate::models::TokenBundle;

/// Remote side of the session store
pub trait AuthService: Send + Sync {
    fn login(&self, email: String, password: String) -> BoxFuture<'static, Result<TokenBundle>>;

    fn register(
        &self,
        email: String,
        password: String,
        display_name: Option<String>,
    ) -> BoxFuture<'static, Result<TokenBundle>>;

    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, Result<TokenBundle>>;

    /// Token attached to every subsequent request; `None` clears it
    fn set_bearer_token(&self, token: Option<String>);
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl ApiClient {
    /// `POST /api/v1/auth/login`
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<TokenBundle> {
        log::info!("[Auth] Logging in as {}", email);
        self.post_json(
            "/api/v1/auth/login",
            &Credentials {
                email,
                password,
                display_name: None,
            },
        )
        .await
    }

    /// `POST /api/v1/auth/register`
    pub async fn register_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<TokenBundle> {
        log::info!("[Auth] Registering {}", email);
        self.post_json(
            "/api/v1/auth/register",
            &Credentials {
                email,
                password,
                display_name,
            },
        )
        .await
    }

    /// `POST /api/v1/auth/refresh`
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenBundle> {
        log::debug!("[Auth] Refreshing access token");
        self.post_json("/api/v1/auth/refresh", &RefreshRequest { refresh_token })
            .await
    }
}

impl AuthService for ApiClient {
    fn login(&self, email: String, password: String) -> BoxFuture<'static, Result<TokenBundle>> {
        let client = self.clone();
        async move { client.login_with_password(&email, &password).await }.boxed()
    }

    fn register(
        &self,
        email: String,
        password: String,
        display_name: Option<String>,
    ) -> BoxFuture<'static, Result<TokenBundle>> {
        let client = self.clone();
        async move {
            client
                .register_account(&email, &password, display_name.as_deref())
                .await
        }
        .boxed()
    }

    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, Result<TokenBundle>> {
        let client = self.clone();
        async move { client.refresh_tokens(&refresh_token).await }.boxed()
    }

    fn set_bearer_token(&self, token: Option<String>) {
        ApiClient::set_bearer_token(self, token);
    }
}
