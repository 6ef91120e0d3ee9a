//! Credential model returned by login and registration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Account the credential belongs to.
///
/// Fields the backend sends beyond the known ones are kept in `extra` so that
/// persisting and reloading a credential does not lose profile data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            extra: Map::new(),
        }
    }
}

/// Access/refresh token pair plus the user they were issued for
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived bearer token attached to API calls
    pub access: String,
    /// Longer-lived token used only to obtain a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Credential {
    pub fn new(access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_keeps_unknown_fields() {
        let raw = json!({
            "id": 7,
            "username": "marco",
            "email": "marco@example.com",
            "avatar": "https://cdn.example.com/a.png",
            "is_premium": true
        });

        let user: User = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.email.as_deref(), Some("marco@example.com"));
        assert_eq!(user.extra["is_premium"], json!(true));
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn test_credential_without_refresh_or_user() {
        let credential: Credential = serde_json::from_value(json!({"access": "a"})).unwrap();
        assert_eq!(credential, Credential::new("a"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("secret-access").with_refresh("secret-refresh");
        let printed = format!("{credential:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("<redacted>"));
    }
}
