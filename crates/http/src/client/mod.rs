//! Wayfarer API client

pub mod auth;
pub mod config;
pub mod error;
pub mod refresh;
pub mod request;

pub use config::{AuthEndpoints, ClientConfig};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshOutcome};
pub use request::{ApiRequest, ApiResponse, FormField, FormValue, RequestBody};

use error::ClientError;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use wayfarer_core::{CredentialStore, MemoryCredentialStore, Session};

/// Gateway for every call to the Wayfarer API.
///
/// Cloning is cheap and clones share the session and refresh coordinator.
#[derive(Clone)]
pub struct WayfarerClient {
    http: Client,
    base_url: String,
    endpoints: AuthEndpoints,
    session: Arc<Session>,
    refresher: Arc<RefreshCoordinator>,
}

impl WayfarerClient {
    /// Create a new client with an in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> WayfarerClientBuilder {
        WayfarerClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the session shared by clones of this client
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Get the refresh coordinator
    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    /// Send a request with the session's bearer token.
    ///
    /// A `401` answer triggers one shared token refresh and a single retry
    /// with the new token. If no token can be obtained the session is cleared
    /// and the original `401` response is returned. Every other status comes
    /// back untouched.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = self.session.access_token().await?;
        let response = self.dispatch(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Request rejected as unauthorized");
        match self.recover(token.as_deref()).await? {
            Some(fresh) => {
                debug!("Retrying request with refreshed token");
                self.dispatch(request, Some(&fresh)).await
            }
            None => Ok(response),
        }
    }

    /// Send a request and decode a successful JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// Send a request whose successful answer carries no body we need
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// GET `path` and decode the JSON answer
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(&ApiRequest::get(path)).await
    }

    /// POST a JSON body to `path` and decode the JSON answer
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(&ApiRequest::post(path).json(body)?).await
    }

    /// PUT a JSON body to `path` and decode the JSON answer
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(&ApiRequest::put(path).json(body)?).await
    }

    /// PATCH a JSON body to `path` and decode the JSON answer
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(&ApiRequest::patch(path).json(body)?).await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute_empty(&ApiRequest::delete(path)).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let response = request
            .build(&self.http, &self.base_url, token)?
            .send()
            .await?;
        let response = ApiResponse::read(response).await?;
        debug!(status = %response.status(), "Received response");
        Ok(response)
    }

    /// Obtain a token to retry with after a `401`, or `None` when the session
    /// is over.
    async fn recover(&self, rejected: Option<&str>) -> Result<Option<String>, ClientError> {
        // Someone else refreshed while this request was on the wire.
        if let Some(current) = self.session.access_token().await? {
            if rejected != Some(current.as_str()) {
                debug!("Access token changed since the request was sent");
                return Ok(Some(current));
            }
        }

        let http = self.http.clone();
        let url = self.url(&self.endpoints.refresh_path);
        let session = Arc::clone(&self.session);
        let replaces = rejected.map(str::to_string);
        let outcome = self
            .refresher
            .run(rejected, move || {
                auth::refresh_access_token(http, url, session, replaces)
            })
            .await;

        match outcome {
            Ok(token) => Ok(Some(token)),
            Err(reason) => {
                warn!(%reason, "Session expired, credentials cleared");
                Ok(None)
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl std::fmt::Debug for WayfarerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WayfarerClient")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for WayfarerClient
#[derive(Default)]
pub struct WayfarerClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    endpoints: AuthEndpoints,
    session: Option<Arc<Session>>,
    store: Option<Arc<dyn CredentialStore>>,
    refresher: Option<Arc<RefreshCoordinator>>,
}

impl WayfarerClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::default()
            .base_url(config.base_url.clone())
            .endpoints(config.endpoints.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the auth endpoint paths
    pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Share an existing session; takes precedence over `credential_store`
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Back a new session with this store
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a refresh coordinator with other clients of the same session
    pub fn refresh_coordinator(mut self, refresher: Arc<RefreshCoordinator>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<WayfarerClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is empty".into()));
        }

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent(concat!("wayfarer-client/", env!("CARGO_PKG_VERSION")));
        }

        let http = client_builder.build()?;

        let session = self.session.unwrap_or_else(|| {
            let store = self
                .store
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
            Arc::new(Session::new(store))
        });

        Ok(WayfarerClient {
            http,
            base_url,
            endpoints: self.endpoints,
            session,
            refresher: self.refresher.unwrap_or_default(),
        })
    }
}
