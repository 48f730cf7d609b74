// SPDX-License-Identifier: MIT

//! Shared mocks for the integration tests: a scriptable transport, a
//! recording navigator, and an in-memory notification center.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

use bookline_core::config::CoreConfig;
use bookline_core::models::{DeviceClass, DevicePlatform, PermissionState};
use bookline_core::platform::{
    ApiRequest, HttpTransport, MemoryStore, Navigator, NotificationContent,
    PlatformNotifications, RawResponse, TransportFailure,
};
use bookline_core::CoreServices;

// ─── Transport ───────────────────────────────────────────────────────────

/// What the mock backend does for one call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Response(u16, Value),
    /// Transport-level failure: no response at all.
    Unreachable(String),
}

enum Handler {
    /// Same outcome for every call.
    Always(Outcome),
    /// Consume outcomes in order; panics when exhausted.
    Script(VecDeque<Outcome>),
    /// Gate on the bearer credential: `granted` when it matches `expected`,
    /// `denied` otherwise.
    Gate {
        expected: String,
        granted: Outcome,
        denied: Outcome,
    },
}

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub bearer: Option<String>,
    /// JSON body, when the request carried one.
    pub body: Option<Value>,
}

/// Scriptable [`HttpTransport`] keyed by request path. Paths without a
/// handler answer `200 {}` so fixtures stay small; every call is recorded.
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency_ms: u64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a small per-call delay so concurrent request chains interleave.
    pub fn with_latency(ms: u64) -> Self {
        Self {
            latency_ms: ms,
            ..Self::default()
        }
    }

    /// Answer every call to `path` with the same response.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.handlers
            .lock()
            .unwrap()
            .insert(path.to_string(), Handler::Always(Outcome::Response(status, body)));
    }

    /// Answer every call to `path` with a transport failure.
    pub fn unreachable(&self, path: &str) {
        self.handlers.lock().unwrap().insert(
            path.to_string(),
            Handler::Always(Outcome::Unreachable("connection refused".to_string())),
        );
    }

    /// Answer calls to `path` with `outcomes` in order.
    pub fn script(&self, path: &str, outcomes: Vec<Outcome>) {
        self.handlers
            .lock()
            .unwrap()
            .insert(path.to_string(), Handler::Script(outcomes.into()));
    }

    /// Gate `path` on the bearer credential.
    pub fn gate(&self, path: &str, expected_bearer: &str, granted: Outcome, denied: Outcome) {
        self.handlers.lock().unwrap().insert(
            path.to_string(),
            Handler::Gate {
                expected: expected_bearer.to_string(),
                granted,
                denied,
            },
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    pub fn last_bearer(&self, path: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .and_then(|c| c.bearer.clone())
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .and_then(|c| c.body.clone())
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: match &request.body {
                bookline_core::platform::RequestBody::Json(value) => Some(value.clone()),
                _ => None,
            },
        });

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        let outcome = {
            let mut handlers = self.handlers.lock().unwrap();
            match handlers.get_mut(&request.path) {
                None => Outcome::Response(200, json!({})),
                Some(Handler::Always(outcome)) => outcome.clone(),
                Some(Handler::Script(queue)) => queue
                    .pop_front()
                    .unwrap_or_else(|| panic!("script exhausted for {}", request.path)),
                Some(Handler::Gate {
                    expected,
                    granted,
                    denied,
                }) => {
                    if bearer == Some(expected.as_str()) {
                        granted.clone()
                    } else {
                        denied.clone()
                    }
                }
            }
        };

        match outcome {
            Outcome::Response(status, body) => Ok(RawResponse { status, body }),
            Outcome::Unreachable(message) => Err(TransportFailure(message)),
        }
    }
}

// ─── Navigator ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Navigate(String, Option<Value>),
    Reset(String),
}

/// Records every navigation signal for assertions.
#[derive(Default)]
pub struct MockNavigator {
    events: Mutex<Vec<NavEvent>>,
}

impl MockNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn navigations_to(&self, route: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NavEvent::Navigate(r, _) if r == route))
            .count()
    }

    pub fn resets_to(&self, route: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NavEvent::Reset(r) if r == route))
            .count()
    }
}

impl Navigator for MockNavigator {
    fn navigate(&self, route: &str, params: Option<Value>) {
        self.events
            .lock()
            .unwrap()
            .push(NavEvent::Navigate(route.to_string(), params));
    }

    fn reset(&self, route: &str) {
        self.events
            .lock()
            .unwrap()
            .push(NavEvent::Reset(route.to_string()));
    }
}

// ─── Notifications ───────────────────────────────────────────────────────

/// In-memory notification center with configurable permission and handle.
pub struct MockNotifications {
    permission_result: Mutex<PermissionState>,
    pub permission_requests: AtomicU32,
    handle: Mutex<Option<String>>,
    scheduled: Mutex<Vec<(String, DateTime<Utc>, NotificationContent)>>,
    cancelled: Mutex<Vec<String>>,
    next_handle: AtomicU32,
    badge: AtomicU32,
}

impl MockNotifications {
    /// Permission granted, push handle available.
    pub fn granted(handle: &str) -> Self {
        Self {
            permission_result: Mutex::new(PermissionState::Granted),
            permission_requests: AtomicU32::new(0),
            handle: Mutex::new(Some(handle.to_string())),
            scheduled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            next_handle: AtomicU32::new(1),
            badge: AtomicU32::new(0),
        }
    }

    /// Permission denied by the user.
    pub fn denied() -> Self {
        let mock = Self::granted("unused");
        *mock.permission_result.lock().unwrap() = PermissionState::Denied;
        *mock.handle.lock().unwrap() = None;
        mock
    }

    /// Permission granted but no handle obtainable (simulator).
    pub fn granted_without_handle() -> Self {
        let mock = Self::granted("unused");
        *mock.handle.lock().unwrap() = None;
        mock
    }

    pub fn scheduled(&self) -> Vec<(String, DateTime<Utc>, NotificationContent)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn schedule_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn badge(&self) -> u32 {
        self.badge.load(Ordering::SeqCst)
    }

    /// Set the platform badge directly, bypassing the scheduler.
    pub fn set_badge_direct(&self, count: u32) {
        self.badge.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlatformNotifications for MockNotifications {
    async fn request_permission(&self) -> PermissionState {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        *self.permission_result.lock().unwrap()
    }

    async fn get_device_handle(&self) -> Option<String> {
        self.handle.lock().unwrap().clone()
    }

    async fn schedule_one_shot(
        &self,
        trigger_at: DateTime<Utc>,
        content: &NotificationContent,
    ) -> anyhow::Result<String> {
        let handle = format!("local-{}", self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.scheduled
            .lock()
            .unwrap()
            .push((handle.clone(), trigger_at, content.clone()));
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> anyhow::Result<()> {
        self.cancelled.lock().unwrap().push(handle.to_string());
        Ok(())
    }

    async fn get_badge(&self) -> u32 {
        self.badge.load(Ordering::SeqCst)
    }

    async fn set_badge(&self, count: u32) {
        self.badge.store(count, Ordering::SeqCst);
    }
}

// ─── Fixture ─────────────────────────────────────────────────────────────

/// Fully wired core over mocks, with the collaborators exposed for
/// assertions.
pub struct TestCore {
    pub services: CoreServices,
    pub transport: Arc<MockTransport>,
    pub notifications: Arc<MockNotifications>,
    pub navigator: Arc<MockNavigator>,
    pub storage: Arc<MemoryStore>,
}

pub fn build_core() -> TestCore {
    build_core_with(MockTransport::new(), MockNotifications::granted("push-handle-1"))
}

pub fn build_core_with(transport: MockTransport, notifications: MockNotifications) -> TestCore {
    let transport = Arc::new(transport);
    let notifications = Arc::new(notifications);
    let navigator = Arc::new(MockNavigator::new());
    let storage = Arc::new(MemoryStore::new());

    let services = CoreServices::new(
        &CoreConfig::default(),
        transport.clone(),
        storage.clone(),
        notifications.clone(),
        navigator.clone(),
        DevicePlatform::Ios,
        DeviceClass::Phone,
    );

    TestCore {
        services,
        transport,
        notifications,
        navigator,
        storage,
    }
}

/// Seed the store with a credential pair, as if a login already happened.
pub async fn seed_credentials(core: &TestCore, access: &str, refresh: &str) {
    core.services
        .api
        .store()
        .save_credentials(&bookline_core::models::CredentialPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        })
        .await
        .expect("seeding credentials should not fail");
}

/// Backend body for a credential pair.
pub fn pair_body(access: &str, refresh: &str) -> Value {
    json!({ "access_credential": access, "refresh_credential": refresh })
}

/// Backend body for `GET /auth/me`.
pub fn profile_body(role: &str) -> Value {
    json!({
        "id": 7,
        "email": "user@example.com",
        "role": role,
        "is_active": true,
        "is_owner": role == "business_owner",
        "is_admin": role == "platform_admin",
        "consent_given": true,
    })
}

/// Minimal notification content for reminder tests.
pub fn reminder_content() -> NotificationContent {
    NotificationContent {
        title: "Upcoming booking".to_string(),
        body: "Your appointment starts soon".to_string(),
        data: json!({ "kind": "booking_reminder" }),
    }
}
