// SPDX-License-Identifier: MIT

//! Collaborator interfaces provided by the embedding shell.
//!
//! The core never talks to the network, disk, or OS notification center
//! directly: it goes through these traits. The shell supplies production
//! implementations ([`crate::transport::ReqwestTransport`] for HTTP, platform
//! bindings for the rest); tests supply mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use crate::models::PermissionState;

/// HTTP method for an outbound API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Body of an outbound API call.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Multipart/binary upload. The transport must let the HTTP layer
    /// generate the boundary-bearing content-type itself; any statically-set
    /// content-type is suppressed.
    Multipart(Vec<MultipartField>),
}

/// One field of a multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// An outbound API call, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn upload(path: impl Into<String>, fields: Vec<MultipartField>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Multipart(fields),
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }
}

/// A response that made it back from the backend, successful or not.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` when the body was empty or not JSON
    pub body: Value,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport produced no response at all (DNS, connection, timeout).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Generic HTTP call into the backend.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request, attaching `bearer` as the Authorization credential
    /// when present. Returns a [`RawResponse`] for every HTTP status; only a
    /// missing response is an error.
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> std::result::Result<RawResponse, TransportFailure>;
}

/// Asynchronous key-value persistence that survives app restarts.
///
/// A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Content of a local notification shown to the user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Opaque payload handed back when the notification is tapped
    #[serde(default)]
    pub data: Value,
}

/// The platform's notification center.
#[async_trait]
pub trait PlatformNotifications: Send + Sync {
    /// Prompt for (or report) notification permission.
    async fn request_permission(&self) -> PermissionState;

    /// Obtain the push handle for this installation. `None` is a valid
    /// outcome (simulator, unsupported environment), not an error.
    async fn get_device_handle(&self) -> Option<String>;

    /// Schedule a one-shot local notification; returns the scheduler's
    /// opaque handle.
    async fn schedule_one_shot(
        &self,
        trigger_at: DateTime<Utc>,
        content: &NotificationContent,
    ) -> anyhow::Result<String>;

    /// Cancel a previously scheduled notification.
    async fn cancel(&self, handle: &str) -> anyhow::Result<()>;

    async fn get_badge(&self) -> u32;
    async fn set_badge(&self, count: u32);
}

/// One-way navigation signal to the shell; fire-and-forget.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str, params: Option<Value>);
    /// Replace the whole navigation stack with `route`.
    fn reset(&self, route: &str);
}

/// In-memory [`KeyValueStore`], used in tests and by embedders that handle
/// persistence elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.entries.clear();
        Ok(())
    }
}
