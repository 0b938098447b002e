//! Centralized HTTP client for Quarters
//!
//! Provides the shared, mockable HTTP client every Quarters component uses
//! to talk to the REST API, so auth and failure handling behave identically
//! everywhere.
//!
//! ## Features
//!
//! - **Trait-based design**: Mockable via `ApiTransport`
//! - **Bearer-token injection**: Resolved from the in-memory `TokenStore`
//!   at send time
//! - **Single-flight refresh**: Concurrent 401s share one refresh request,
//!   then each original request is replayed exactly once
//! - **Bounded retries**: Transient failures (no response, 429, 502, 503,
//!   504) retry with exponential backoff
//! - **Error normalization**: Every failure surfaces as an `ApiError` with
//!   a message, optional status, and the raw server payload
//! - **Testing support**: Easy mocking with wiremock

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod token;

mod refresh;

pub use client::{shared_client, ApiRequest, ApiTransport, HttpClient};
pub use config::HttpConfig;
pub use error::{ApiError, BuildError, Result};
pub use middleware::RetryPolicy;
pub use token::TokenStore;

/// Re-export commonly used types
pub use reqwest::{header, Method, StatusCode};
