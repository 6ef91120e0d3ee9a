//! Single-flight coordination of token refreshes
//!
//! At most one refresh runs at a time. The first caller that needs a new
//! access token publishes the refresh as a shared future; everyone who asks
//! while it is pending awaits that same future and receives the same
//! outcome. The slot is emptied once the published refresh resolves.
//!
//! A pending refresh is tied to the access token it replaces. A caller whose
//! rejected token differs (the user logged in again meanwhile) never joins
//! it and starts its own refresh instead.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// New access token, or why none could be obtained
pub type RefreshOutcome = Result<String, RefreshError>;

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Why a refresh did not produce a token. Every waiter gets its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no refresh token is stored")]
    MissingRefreshToken,

    #[error("refresh endpoint answered {status}")]
    Rejected { status: u16 },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response was not understood: {0}")]
    InvalidResponse(String),

    #[error("could not update stored credential: {0}")]
    Store(String),
}

struct Pending {
    replaces: Option<String>,
    refresh: PendingRefresh,
}

/// Guard shared by every request that may need a refresh.
///
/// Build one per session and hand it to all clients using that session.
#[derive(Default)]
pub struct RefreshCoordinator {
    pending: Mutex<Option<Pending>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is currently published
    pub fn is_refreshing(&self) -> bool {
        self.slot().is_some()
    }

    /// Await the pending refresh of `rejected`, or start one with `start`.
    ///
    /// A pending refresh for any other token is superseded: it stays alive
    /// for the callers already awaiting it but nobody new joins it.
    pub async fn run<F, Fut>(&self, rejected: Option<&str>, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let refresh = {
            let mut slot = self.slot();
            let joinable = slot
                .as_ref()
                .filter(|pending| pending.replaces.as_deref() == rejected)
                .map(|pending| pending.refresh.clone());

            if let Some(refresh) = joinable {
                debug!("Joining in-flight token refresh");
                refresh
            } else {
                if slot.is_some() {
                    debug!("Superseding refresh started for an earlier token");
                }
                debug!("Starting token refresh");
                let refresh = start().boxed().shared();
                *slot = Some(Pending {
                    replaces: rejected.map(str::to_string),
                    refresh: refresh.clone(),
                });
                refresh
            }
        };

        let outcome = refresh.clone().await;

        let mut slot = self.slot();
        if slot
            .as_ref()
            .is_some_and(|pending| pending.refresh.ptr_eq(&refresh))
        {
            *slot = None;
        }
        outcome
    }

    fn slot(&self) -> MutexGuard<'_, Option<Pending>> {
        // The guarded value is a plain Option; a poisoned lock still holds a valid one.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
