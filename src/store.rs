// SPDX-License-Identifier: MIT

//! Scoped credential store over the shell's key-value persistence.
//!
//! All per-user state (credential pair, cached device handle, persisted
//! reminder list) lives under one scope prefix. The access/refresh pair is
//! serialized as a single value under a single key, so a torn pair — one
//! credential updated, the other stale — cannot be observed.

use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::models::CredentialPair;
use crate::platform::KeyValueStore;

const CREDENTIALS_KEY: &str = "session.credentials";

/// Scope-prefixed wrapper over the shell's [`KeyValueStore`].
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<dyn KeyValueStore>,
    scope: String,
}

impl CredentialStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}.{}", self.scope, key)
    }

    /// Read a raw value. A missing key is `Ok(None)`.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner
            .get(&self.scoped(key))
            .await
            .map_err(CoreError::Storage)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .set(&self.scoped(key), value)
            .await
            .map_err(CoreError::Storage)
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.inner
            .remove(&self.scoped(key))
            .await
            .map_err(CoreError::Storage)
    }

    /// Clear the underlying store.
    pub async fn clear(&self) -> Result<()> {
        self.inner.clear().await.map_err(CoreError::Storage)
    }

    // ─── Credential pair ─────────────────────────────────────────────────

    /// Read the stored credential pair, if any.
    ///
    /// A value that fails to deserialize is treated as absent; a corrupt
    /// entry must not brick the app into a half-authenticated state.
    pub async fn credentials(&self) -> Result<Option<CredentialPair>> {
        let raw = match self.get(CREDENTIALS_KEY).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str(&raw) {
            Ok(pair) => Ok(Some(pair)),
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential pair is unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    /// Persist both credentials as one write.
    pub async fn save_credentials(&self, pair: &CredentialPair) -> Result<()> {
        let raw = serde_json::to_string(pair)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("serialize credentials: {}", e)))?;
        self.set(CREDENTIALS_KEY, &raw).await
    }

    /// Remove both credentials as one write.
    pub async fn clear_credentials(&self) -> Result<()> {
        self.remove(CREDENTIALS_KEY).await
    }
}
