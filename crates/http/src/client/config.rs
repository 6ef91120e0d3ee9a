//! Client configuration

use serde::{Deserialize, Serialize};

/// Settings needed to build a [`WayfarerClient`](super::WayfarerClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the REST service, e.g. `https://api.wayfarer.travel`
    pub base_url: String,

    /// Transport timeout in seconds; `None` leaves the request unbounded
    pub timeout_secs: Option<u64>,

    /// Overrides the default `User-Agent`
    pub user_agent: Option<String>,

    pub endpoints: AuthEndpoints,
}

/// Paths of the auth endpoints, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    pub login_path: String,
    pub register_path: String,
    pub refresh_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: Some(30),
            user_agent: None,
            endpoints: AuthEndpoints::default(),
        }
    }
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login_path: "/auth/login/".to_string(),
            register_path: "/auth/register/".to_string(),
            refresh_path: "/auth/token/refresh/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://api.example.com", "endpoints": {"refresh_path": "/jwt/refresh"}}"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.endpoints.refresh_path, "/jwt/refresh");
        assert_eq!(config.endpoints.login_path, "/auth/login/");
    }
}
