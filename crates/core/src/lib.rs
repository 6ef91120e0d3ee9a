//! Wayfarer core types: credentials, their persistence and the in-memory session

pub mod credential;
pub mod error;
pub mod session;
pub mod store;

pub use credential::{Credential, User};
pub use error::{CoreError, CoreResult};
pub use session::{Session, SessionState};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
