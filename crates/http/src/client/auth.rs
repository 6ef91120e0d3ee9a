//! Authentication API client methods

use super::refresh::{RefreshError, RefreshOutcome};
use super::{ApiRequest, ClientError, WayfarerClient};
use crate::types::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use wayfarer_core::{Credential, Session};

impl WayfarerClient {
    /// Log in and store the issued credential
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<Credential, ClientError> {
        let path = self.endpoints.login_path.clone();
        self.authenticate(ApiRequest::post(path).json(&request)?).await
    }

    /// Create an account and store the issued credential
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<Credential, ClientError> {
        let path = self.endpoints.register_path.clone();
        self.authenticate(ApiRequest::post(path).json(&request)?).await
    }

    /// Forget the stored credential. The server keeps no session to end.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.clear().await?;
        info!("Logged out");
        Ok(())
    }

    // Sent anonymously and outside the refresh path: a 401 here means bad
    // credentials, not an expired token.
    async fn authenticate(&self, request: ApiRequest) -> Result<Credential, ClientError> {
        let response = self.dispatch(&request, None).await?.error_for_status()?;
        let credential = Credential::from(response.json::<AuthResponse>()?);
        self.session.establish(credential.clone()).await?;
        info!(
            user = credential.user.as_ref().map(|u| u.username.as_str()),
            "Authenticated"
        );
        Ok(credential)
    }
}

/// Exchange the stored refresh token for a new access token.
///
/// Any failure clears the session before the outcome is shared with the
/// waiting requests, so they all observe the logged-out state. A session
/// whose access token is no longer `replaces` came from a newer login and
/// is left alone.
pub(crate) async fn refresh_access_token(
    http: Client,
    url: String,
    session: Arc<Session>,
    replaces: Option<String>,
) -> RefreshOutcome {
    let outcome = exchange(&http, &url, &session).await;
    match &outcome {
        Ok(_) => info!("Access token refreshed"),
        Err(_) => match session.access_token().await {
            Ok(current) if current.is_some() && current != replaces => {
                debug!("Session renewed during failed refresh, keeping it");
            }
            _ => {
                if let Err(e) = session.clear().await {
                    error!("Failed to clear credentials after refresh failure: {e}");
                }
            }
        },
    }
    outcome
}

async fn exchange(http: &Client, url: &str, session: &Session) -> RefreshOutcome {
    let refresh = session
        .refresh_token()
        .await
        .map_err(|e| RefreshError::Store(e.to_string()))?
        .ok_or(RefreshError::MissingRefreshToken)?;

    let response = http
        .post(url)
        .json(&RefreshRequest { refresh: &refresh })
        .send()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshError::Rejected {
            status: status.as_u16(),
        });
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

    session
        .rotate(body.access.clone(), body.refresh)
        .await
        .map_err(|e| RefreshError::Store(e.to_string()))?;

    Ok(body.access)
}
