//! Wayfarer HTTP client
//!
//! Every call made through [`client::WayfarerClient`] carries the session's
//! bearer token. A `401` triggers one coordinated token refresh shared by all
//! concurrent callers, after which the call is retried exactly once.

pub mod client;
pub mod types;

pub use reqwest;

pub use client::{
    ApiRequest, ApiResponse, ClientConfig, RefreshCoordinator, WayfarerClient,
    WayfarerClientBuilder, error::ClientError,
};
