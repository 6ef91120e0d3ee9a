//! In-memory view of the current credential
//!
//! [`Session`] caches the credential in memory and writes every change
//! through to its [`CredentialStore`]. When the cache is empty the store is
//! consulted, so a credential persisted by an earlier process is picked up
//! transparently. Every mutation holds the cache write lock across the store
//! call so the two never disagree.

use crate::{Credential, CoreError, CoreResult, CredentialStore};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

/// Whether the session currently holds a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

pub struct Session {
    store: Arc<dyn CredentialStore>,
    cached: RwLock<Option<Credential>>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Create a session over `store` without touching it yet
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            store,
            cached: RwLock::new(None),
            state,
        }
    }

    /// Current credential, falling back to the store when nothing is cached
    pub async fn credential(&self) -> CoreResult<Option<Credential>> {
        if let Some(credential) = self.cached.read().await.as_ref() {
            return Ok(Some(credential.clone()));
        }

        let mut cached = self.cached.write().await;
        if cached.is_none() {
            *cached = self.store.get().await?;
            if cached.is_some() {
                debug!("Loaded credential from store");
                self.publish(SessionState::Authenticated);
            }
        }
        Ok(cached.clone())
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> CoreResult<Option<String>> {
        Ok(self.credential().await?.map(|c| c.access))
    }

    /// Current refresh token, if any
    pub async fn refresh_token(&self) -> CoreResult<Option<String>> {
        Ok(self.credential().await?.and_then(|c| c.refresh))
    }

    /// Whether a credential is cached or stored
    pub async fn is_authenticated(&self) -> CoreResult<bool> {
        Ok(self.credential().await?.is_some())
    }

    /// Replace whatever is stored with a freshly issued credential
    pub async fn establish(&self, credential: Credential) -> CoreResult<()> {
        let mut cached = self.cached.write().await;
        self.store.set(&credential).await?;
        *cached = Some(credential);
        self.publish(SessionState::Authenticated);
        Ok(())
    }

    /// Swap in a refreshed access token, and a rotated refresh token if the
    /// server issued one. The user is kept.
    pub async fn rotate(&self, access: String, refresh: Option<String>) -> CoreResult<()> {
        let mut cached = self.cached.write().await;
        let current = match cached.take() {
            Some(credential) => Some(credential),
            None => self.store.get().await?,
        };
        let Some(mut credential) = current else {
            return Err(CoreError::NoCredential);
        };

        credential.access = access;
        if let Some(refresh) = refresh {
            credential.refresh = Some(refresh);
        }

        let result = self.store.set(&credential).await;
        *cached = Some(credential);
        result
    }

    /// Drop the credential from memory and from the store
    pub async fn clear(&self) -> CoreResult<()> {
        let mut cached = self.cached.write().await;
        *cached = None;
        let result = self.store.clear().await;
        self.publish(SessionState::Anonymous);
        info!("Session cleared");
        result
    }

    /// Watch for login and logout transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn publish(&self, state: SessionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
