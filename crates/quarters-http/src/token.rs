//! In-memory access token storage

use std::sync::{Arc, RwLock};

/// Shared in-memory cell for the bearer access token.
///
/// The token lives only in process memory: set after login or a
/// successful refresh, cleared on logout or a failed refresh, read at
/// send time for every outbound request. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current access token, if one is held
    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap().clone()
    }

    /// Store a new access token, replacing any prior one
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap() = Some(token.into());
    }

    /// Drop the held token
    pub fn clear(&self) {
        *self.inner.write().unwrap() = None;
    }
}
