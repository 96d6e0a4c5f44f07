//! Auth session store
//!
//! Owns the token pair and the user profile, persists them to device storage
//! and keeps the API client's bearer token in sync. Status moves from
//! `Checking` to `Authenticated` or `Unauthenticated`; every failure path
//! ends in `Unauthenticated` with storage cleared.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api::AuthService;
use crate::constants::{AUTH_SESSION_KEY, TOKEN_EXPIRY_LEEWAY_SECS};
use crate::error::{ClientError, Result};
use crate::models::{AuthTokens, TokenBundle, UserProfile};
use crate::storage::{load_versioned, save_versioned, KeyValueStore};
use crate::utils::{now_secs, safe_lock, SingleFlight};

const REFRESH_FLIGHT: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Checking,
    Authenticated,
    Unauthenticated,
}

/// What gets written under `AUTH_SESSION_KEY`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    tokens: AuthTokens,
    #[serde(default)]
    user: Option<UserProfile>,
}

struct SessionState {
    status: AuthStatus,
    tokens: Option<AuthTokens>,
    user: Option<UserProfile>,
    error: Option<String>,
    /// Bumped whenever the token pair is replaced or cleared
    epoch: u64,
}

struct SessionInner {
    auth: Arc<dyn AuthService>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
    refresh_flight: SingleFlight<Result<AuthTokens>>,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthService>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                auth,
                storage,
                state: Mutex::new(SessionState {
                    status: AuthStatus::Checking,
                    tokens: None,
                    user: None,
                    error: None,
                    epoch: 0,
                }),
                refresh_flight: SingleFlight::new(),
            }),
        }
    }

    /// Restore the persisted session on boot
    pub async fn initialize(&self) -> AuthStatus {
        self.lock().status = AuthStatus::Checking;

        let persisted: Option<PersistedSession> =
            load_versioned(self.inner.storage.as_ref(), AUTH_SESSION_KEY);
        let Some(persisted) = persisted else {
            log::info!("[Session] No stored session - user needs to login");
            self.inner.clear_local();
            return AuthStatus::Unauthenticated;
        };

        let now = now_secs();
        if persisted.tokens.is_refresh_expired(now) {
            log::info!("[Session] Stored refresh token expired - clearing session");
            self.inner.clear_local();
            return AuthStatus::Unauthenticated;
        }

        let access_expired = persisted.tokens.is_access_expired(now);
        {
            let mut state = self.lock();
            state.tokens = Some(persisted.tokens.clone());
            state.user = persisted.user;
        }

        if access_expired {
            log::info!("[Session] Access token expired - refreshing once");
            return match self.refresh().await {
                Ok(_) => AuthStatus::Authenticated,
                Err(_) => AuthStatus::Unauthenticated,
            };
        }

        self.inner.auth.set_bearer_token(Some(persisted.tokens.access_token));
        self.lock().status = AuthStatus::Authenticated;
        log::info!("[Session] Restored valid session");
        AuthStatus::Authenticated
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserProfile>> {
        let email = email.trim().to_string();
        if let Err(e) = validate_credentials(&email, password) {
            return Err(self.inner.fail_auth(e));
        }
        let result = self.inner.auth.login(email, password.to_string()).await;
        self.inner.complete_auth(result)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        let email = email.trim().to_string();
        if let Err(e) = validate_credentials(&email, password) {
            return Err(self.inner.fail_auth(e));
        }
        let result = self
            .inner
            .auth
            .register(
                email,
                password.to_string(),
                display_name.map(str::to_string),
            )
            .await;
        self.inner.complete_auth(result)
    }

    /// Unconditionally forget everything about the current user
    pub fn logout(&self) {
        log::info!("[Session] Logging out");
        self.inner.clear_local();
        self.lock().error = None;
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Concurrent callers share one request. Failure clears the session.
    pub async fn refresh(&self) -> Result<AuthTokens> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .refresh_flight
            .run(REFRESH_FLIGHT, move || async move { inner.refresh_once().await })
            .await
    }

    /// Current access token, refreshed first if it is (nearly) expired
    pub async fn ensure_fresh_token(&self) -> Result<String> {
        let tokens = self
            .lock()
            .tokens
            .clone()
            .ok_or_else(|| ClientError::Auth("not logged in".to_string()))?;

        if tokens.needs_refresh(now_secs(), TOKEN_EXPIRY_LEEWAY_SECS) {
            return self.refresh().await.map(|t| t.access_token);
        }
        Ok(tokens.access_token)
    }

    pub fn status(&self) -> AuthStatus {
        self.lock().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    pub fn tokens(&self) -> Option<AuthTokens> {
        self.lock().tokens.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().tokens.as_ref().map(|t| t.access_token.clone())
    }

    /// Inline error from the last login/register attempt
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        safe_lock(&self.inner.state, "Session")
    }
}

impl SessionInner {
    /// A logout or login that lands while the request is out wins over
    /// whatever the server answers.
    async fn refresh_once(&self) -> Result<AuthTokens> {
        let (tokens, epoch) = {
            let state = safe_lock(&self.state, "Session");
            (state.tokens.clone(), state.epoch)
        };
        let Some(tokens) = tokens else {
            return Err(ClientError::Auth("no session to refresh".to_string()));
        };
        if tokens.is_refresh_expired(now_secs()) {
            log::info!("[Session] Refresh token expired - clearing session");
            self.clear_local_at(Some(epoch));
            return Err(ClientError::Auth("session expired".to_string()));
        }

        match self.auth.refresh(tokens.refresh_token.clone()).await {
            Ok(bundle) => {
                let refreshed = self.apply_bundle(bundle, Some(epoch))?;
                log::info!("[Session] Access token refreshed");
                Ok(refreshed.0)
            }
            Err(e) => {
                if self.clear_local_at(Some(epoch)) {
                    log::warn!("[Session] Token refresh failed: {} - session cleared", e);
                } else {
                    log::debug!("[Session] Ignoring failed refresh for a replaced session: {}", e);
                }
                Err(ClientError::Auth(format!("token refresh failed: {}", e)))
            }
        }
    }

    fn complete_auth(&self, result: Result<TokenBundle>) -> Result<Option<UserProfile>> {
        let bundle = result.map_err(|e| self.fail_auth(e))?;
        let (_, user) = self
            .apply_bundle(bundle, None)
            .map_err(|e| self.fail_auth(e))?;
        safe_lock(&self.state, "Session").error = None;
        log::info!("[Session] Authenticated");
        Ok(user)
    }

    /// Persist a new bundle wholesale and mark the session authenticated.
    ///
    /// With `expected_epoch` set, the bundle is dropped if the session was
    /// replaced or cleared since that epoch was read.
    fn apply_bundle(
        &self,
        bundle: TokenBundle,
        expected_epoch: Option<u64>,
    ) -> Result<(AuthTokens, Option<UserProfile>)> {
        let tokens = AuthTokens::from_bundle(&bundle, now_secs());
        let mut state = safe_lock(&self.state, "Session");
        if expected_epoch.is_some_and(|epoch| epoch != state.epoch) {
            log::info!("[Session] Session changed during refresh - discarding new tokens");
            return Err(ClientError::Auth("session changed during refresh".to_string()));
        }
        let user = bundle.user.clone().or_else(|| state.user.clone());

        let persisted = PersistedSession {
            tokens: tokens.clone(),
            user: user.clone(),
        };
        if let Err(e) = save_versioned(self.storage.as_ref(), AUTH_SESSION_KEY, &persisted) {
            log::error!("[Session] Failed to persist session: {}", e);
        }

        self.auth.set_bearer_token(Some(tokens.access_token.clone()));
        state.epoch += 1;
        state.tokens = Some(tokens.clone());
        state.user = user.clone();
        state.status = AuthStatus::Authenticated;
        Ok((tokens, user))
    }

    /// Record a login/register failure for inline display
    fn fail_auth(&self, err: ClientError) -> ClientError {
        log::warn!("[Session] Authentication failed: {}", err);
        self.clear_local();
        safe_lock(&self.state, "Session").error = Some(err.user_message());
        err
    }

    fn clear_local(&self) {
        self.clear_local_at(None);
    }

    /// Clear tokens, user and storage. Returns false without touching
    /// anything when `expected_epoch` is stale.
    fn clear_local_at(&self, expected_epoch: Option<u64>) -> bool {
        let mut state = safe_lock(&self.state, "Session");
        if expected_epoch.is_some_and(|epoch| epoch != state.epoch) {
            return false;
        }
        self.auth.set_bearer_token(None);
        if let Err(e) = self.storage.remove(AUTH_SESSION_KEY) {
            log::error!("[Session] Failed to clear stored session: {}", e);
        }
        state.epoch += 1;
        state.tokens = None;
        state.user = None;
        state.status = AuthStatus::Unauthenticated;
        drop(state);

        // A refresh still out for the old tokens must not be joined by the next caller
        self.refresh_flight.forget(REFRESH_FLIGHT);
        true
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(ClientError::Validation("Enter a valid email address".to_string()));
    }
    if password.len() < crate::constants::MIN_PASSWORD_LENGTH {
        return Err(ClientError::Validation("Enter your password".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use futures_util::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted auth backend that records bearer changes and refresh calls
    #[derive(Default)]
    struct FakeAuth {
        bearer: Mutex<Option<String>>,
        refresh_calls: AtomicUsize,
        refresh_fails: bool,
        login_fails: bool,
    }

    fn bundle(access: &str) -> TokenBundle {
        TokenBundle {
            access_token: access.to_string(),
            refresh_token: format!("{}-refresh", access),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_expires_in: 86_400,
            user: Some(UserProfile {
                id: "1".into(),
                email: "a@b.com".into(),
                display_name: None,
                created_at: None,
                updated_at: None,
            }),
        }
    }

    impl AuthService for FakeAuth {
        fn login(&self, _email: String, _password: String) -> BoxFuture<'static, Result<TokenBundle>> {
            let fails = self.login_fails;
            async move {
                if fails {
                    Err(ClientError::Http {
                        status: 401,
                        error: "Invalid credentials".into(),
                        detail: None,
                    })
                } else {
                    Ok(bundle("login"))
                }
            }
            .boxed()
        }

        fn register(
            &self,
            email: String,
            password: String,
            _display_name: Option<String>,
        ) -> BoxFuture<'static, Result<TokenBundle>> {
            self.login(email, password)
        }

        fn refresh(&self, _refresh_token: String) -> BoxFuture<'static, Result<TokenBundle>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let fails = self.refresh_fails;
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if fails {
                    Err(ClientError::Network("offline".into()))
                } else {
                    Ok(bundle("refreshed"))
                }
            }
            .boxed()
        }

        fn set_bearer_token(&self, token: Option<String>) {
            *self.bearer.lock().unwrap() = token;
        }
    }

    fn persist(store: &MemoryStore, access_expires_at: u64, refresh_expires_at: u64) {
        let session = PersistedSession {
            tokens: AuthTokens {
                access_token: "stored".into(),
                refresh_token: "stored-refresh".into(),
                token_type: "Bearer".into(),
                access_expires_at,
                refresh_expires_at,
            },
            user: None,
        };
        save_versioned(store, AUTH_SESSION_KEY, &session).unwrap();
    }

    fn session(auth: &Arc<FakeAuth>, store: &Arc<MemoryStore>) -> SessionStore {
        SessionStore::new(auth.clone(), store.clone())
    }

    #[tokio::test]
    async fn expired_refresh_token_ends_unauthenticated_with_storage_cleared() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now - 100, now - 1);

        let session = session(&auth, &store);
        assert_eq!(session.status(), AuthStatus::Checking);
        assert_eq!(session.initialize().await, AuthStatus::Unauthenticated);

        assert_eq!(store.get(AUTH_SESSION_KEY).unwrap(), None);
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(auth.bearer.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn valid_stored_session_is_restored() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now + 600, now + 6000);

        let session = session(&auth, &store);
        assert_eq!(session.initialize().await, AuthStatus::Authenticated);
        assert_eq!(auth.bearer.lock().unwrap().as_deref(), Some("stored"));
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_once_on_boot() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now - 5, now + 6000);

        let session = session(&auth, &store);
        assert_eq!(session.initialize().await, AuthStatus::Authenticated);
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token().as_deref(), Some("refreshed"));
        assert!(store.get(AUTH_SESSION_KEY).unwrap().unwrap().contains("refreshed"));
    }

    #[tokio::test]
    async fn failed_boot_refresh_clears_session() {
        let auth = Arc::new(FakeAuth {
            refresh_fails: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now - 5, now + 6000);

        let session = session(&auth, &store);
        assert_eq!(session.initialize().await, AuthStatus::Unauthenticated);
        assert_eq!(store.get(AUTH_SESSION_KEY).unwrap(), None);
        assert!(session.tokens().is_none());
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_request() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now + 600, now + 6000);

        let session = session(&auth, &store);
        session.initialize().await;

        let (a, b, c) = tokio::join!(session.refresh(), session.refresh(), session.refresh());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_login_sets_inline_error() {
        let auth = Arc::new(FakeAuth {
            login_fails: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let session = session(&auth, &store);

        assert!(session.login("a@b.com", "wrong").await.is_err());
        assert_eq!(session.status(), AuthStatus::Unauthenticated);
        assert_eq!(session.error().as_deref(), Some("Invalid credentials"));
        assert!(auth.bearer.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_email_never_reaches_the_server() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let session = session(&auth, &store);

        let err = session.login("not-an-email", "secret1").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(session.error().is_some());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let session = session(&auth, &store);

        session.login("a@b.com", "secret1").await.unwrap();
        assert!(session.is_authenticated());

        session.logout();
        assert_eq!(session.status(), AuthStatus::Unauthenticated);
        assert!(session.user().is_none());
        assert_eq!(store.get(AUTH_SESSION_KEY).unwrap(), None);
        assert!(auth.bearer.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_fresh_token_refreshes_near_expiry() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now + 10, now + 6000);

        let session = session(&auth, &store);
        session.initialize().await;

        assert_eq!(session.ensure_fresh_token().await.unwrap(), "refreshed");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_during_refresh_stays_unauthenticated() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now + 600, now + 6000);

        let session = session(&auth, &store);
        session.initialize().await;

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
        session.logout();

        assert!(pending.await.unwrap().is_err());
        assert_eq!(session.status(), AuthStatus::Unauthenticated);
        assert!(session.tokens().is_none());
        assert!(auth.bearer.lock().unwrap().is_none());
        assert_eq!(store.get(AUTH_SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn login_during_refresh_keeps_the_new_tokens() {
        let auth = Arc::new(FakeAuth::default());
        let store = Arc::new(MemoryStore::new());
        let now = now_secs();
        persist(&store, now + 600, now + 6000);

        let session = session(&auth, &store);
        session.initialize().await;

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.login("a@b.com", "secret1").await.unwrap();

        assert!(pending.await.unwrap().is_err());
        assert_eq!(session.access_token().as_deref(), Some("login"));
        assert_eq!(auth.bearer.lock().unwrap().as_deref(), Some("login"));
        assert!(store.get(AUTH_SESSION_KEY).unwrap().unwrap().contains("\"login\""));
    }
}
