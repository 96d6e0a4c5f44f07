use serde::{Deserialize, Serialize};

/// Read-only mirror of the server's user record
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UserProfile {
    #[serde(deserialize_with = "crate::models::responses::string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default, alias = "displayName", alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Token bundle as returned by register/login/refresh
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token pair with absolute expiry timestamps (unix seconds).
///
/// Replaced wholesale on every login/refresh; never mutated in place.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub access_expires_at: u64,
    pub refresh_expires_at: u64,
}

impl AuthTokens {
    pub fn from_bundle(bundle: &TokenBundle, now: u64) -> Self {
        Self {
            access_token: bundle.access_token.clone(),
            refresh_token: bundle.refresh_token.clone(),
            token_type: bundle.token_type.clone(),
            access_expires_at: now.saturating_add(bundle.expires_in),
            refresh_expires_at: now.saturating_add(bundle.refresh_expires_in),
        }
    }

    pub fn is_access_expired(&self, now: u64) -> bool {
        now >= self.access_expires_at
    }

    pub fn is_refresh_expired(&self, now: u64) -> bool {
        now >= self.refresh_expires_at
    }

    /// Access token is expired or will be within `leeway` seconds
    pub fn needs_refresh(&self, now: u64, leeway: u64) -> bool {
        now.saturating_add(leeway) >= self.access_expires_at
    }
}
