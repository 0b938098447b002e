//! Single-flight token refresh

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::token::TokenStore;

/// Body returned by the refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Marker for a failed refresh. Cloneable so every waiter on the shared
/// future observes the outcome; callers reject with their own original
/// 401, so no detail is carried here.
#[derive(Debug, Clone)]
pub(crate) struct RefreshFailed;

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailed>>>;

/// Coordinates token refresh so that at most one refresh request is in
/// flight per client. The first 401 starts the refresh; concurrent 401s
/// join the same shared future. The slot is freed once the refresh
/// completes, so a later 401 can start a fresh attempt.
pub(crate) struct RefreshGate {
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Join the in-flight refresh if one exists, otherwise start the
    /// future produced by `start`.
    pub(crate) async fn join_or_start<F>(&self, start: F) -> Result<String, RefreshFailed>
    where
        F: FnOnce() -> BoxFuture<'static, Result<String, RefreshFailed>>,
    {
        let shared = {
            let mut slot = self.inflight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("token refresh already in flight, joining");
                    existing.clone()
                }
                None => {
                    let inflight = Arc::clone(&self.inflight);
                    let refresh = start();
                    let fut = async move {
                        let result = refresh.await;
                        // Free the slot before waiters resume.
                        *inflight.lock().await = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        shared.await
    }
}

/// Exchange the refresh cookie for a new access token.
///
/// On success the new token replaces the stored one; on any failure the
/// stored token is cleared. A 2xx response without a non-empty
/// `access_token` field counts as a failure.
pub(crate) async fn run_refresh(
    http: reqwest::Client,
    url: String,
    tokens: TokenStore,
) -> Result<String, RefreshFailed> {
    debug!(%url, "refreshing access token");

    let response = match http.post(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "token refresh request failed");
            tokens.clear();
            return Err(RefreshFailed);
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%status, "token refresh rejected");
        tokens.clear();
        return Err(RefreshFailed);
    }

    let body: RefreshResponse = match response.json().await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "token refresh returned an unreadable body");
            tokens.clear();
            return Err(RefreshFailed);
        }
    };

    match body.access_token {
        Some(token) if !token.is_empty() => {
            tokens.set(token.clone());
            debug!("access token refreshed");
            Ok(token)
        }
        _ => {
            warn!("token refresh response missing access_token");
            tokens.clear();
            Err(RefreshFailed)
        }
    }
}
