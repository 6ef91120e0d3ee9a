//! Wire types for the auth endpoints

use serde::{Deserialize, Serialize};
use wayfarer_core::{Credential, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body returned by login and registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl From<AuthResponse> for Credential {
    fn from(response: AuthResponse) -> Self {
        Self {
            access: response.access,
            refresh: response.refresh,
            user: response.user,
        }
    }
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh endpoint reply. Servers that rotate refresh tokens also send a
/// new `refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
