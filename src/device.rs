// SPDX-License-Identifier: MIT

//! Device push registration and notification listener lifecycle.
//!
//! Push notifications are an enhancement, never a blocking dependency:
//! backend-side failures of registration and unregistration are logged and
//! swallowed, and an authenticated/anonymous transition always completes
//! regardless of what the registration calls do.

use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::models::{
    DeviceClass, DevicePlatform, DeviceRegistration, PermissionSnapshot, PermissionState,
};
use crate::pipeline::ApiClient;
use crate::platform::{ApiRequest, NotificationContent, PlatformNotifications};
use crate::store::CredentialStore;

const DEVICE_HANDLE_KEY: &str = "push.device_handle";

const REGISTER_PATH: &str = "/devices/register";
const UNREGISTER_PATH: &str = "/devices/unregister";

type Listener = Box<dyn Fn(&NotificationContent) + Send + Sync>;

/// Which event stream a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Received,
    Tapped,
}

/// Handle returned by `on_received`/`on_tapped`. Listener lifetime is a
/// first-class resource: drop it through
/// [`DeviceRegistrationManager::unsubscribe`] at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
    kind: ListenerKind,
}

/// Manages the device push handle, permission state, and listener registry.
pub struct DeviceRegistrationManager {
    api: Arc<ApiClient>,
    store: CredentialStore,
    notifications: Arc<dyn PlatformNotifications>,
    platform: DevicePlatform,
    device_class: DeviceClass,
    permission: RwLock<Permission>,
    received: DashMap<u64, Listener>,
    tapped: DashMap<u64, Listener>,
    next_subscription: AtomicU64,
}

struct Permission {
    state: PermissionState,
    loading: bool,
}

impl DeviceRegistrationManager {
    pub fn new(
        api: Arc<ApiClient>,
        store: CredentialStore,
        notifications: Arc<dyn PlatformNotifications>,
        platform: DevicePlatform,
        device_class: DeviceClass,
    ) -> Self {
        Self {
            api,
            store,
            notifications,
            platform,
            device_class,
            permission: RwLock::new(Permission {
                state: PermissionState::Undetermined,
                loading: false,
            }),
            received: DashMap::new(),
            tapped: DashMap::new(),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Current permission state as the rest of the app sees it.
    pub async fn permission(&self) -> PermissionSnapshot {
        let guard = self.permission.read().await;
        PermissionSnapshot {
            has_permission: guard.state.is_granted(),
            loading: guard.loading,
        }
    }

    /// Request notification permission. Idempotent: once granted, later
    /// calls return `true` without prompting the platform again.
    pub async fn request_permission(&self) -> bool {
        {
            let guard = self.permission.read().await;
            if guard.state.is_granted() {
                return true;
            }
        }

        {
            let mut guard = self.permission.write().await;
            guard.loading = true;
        }

        let state = self.notifications.request_permission().await;

        let mut guard = self.permission.write().await;
        guard.state = state;
        guard.loading = false;
        state.is_granted()
    }

    /// Obtain the push handle for this installation. Absent is a valid
    /// outcome (simulator, unsupported environment), never an error.
    /// Permission must be granted first.
    pub async fn obtain_handle(&self) -> Option<String> {
        if !self.permission.read().await.state.is_granted() {
            return None;
        }
        self.notifications.get_device_handle().await
    }

    /// Request permission, obtain a handle, and register it with the
    /// backend. Returns whether the backend accepted the registration.
    ///
    /// Every failure degrades softly. An "endpoint not found" response still
    /// caches the handle locally so a later backend deployment can pick it
    /// up; validation failures are logged with the offending payload shape.
    pub async fn register_current(&self) -> bool {
        if !self.request_permission().await {
            tracing::debug!("Notification permission not granted, skipping registration");
            return false;
        }

        let handle = match self.obtain_handle().await {
            Some(handle) => handle,
            None => {
                tracing::debug!("No device handle available, skipping registration");
                return false;
            }
        };

        self.register(handle).await
    }

    /// Register a specific handle with the backend.
    pub async fn register(&self, handle: String) -> bool {
        let registration = DeviceRegistration {
            handle: handle.clone(),
            platform: self.platform,
            device_class: self.device_class,
        };

        let payload = match serde_json::to_value(&registration) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize device registration");
                return false;
            }
        };

        let accepted = match self
            .api
            .send(ApiRequest::post(REGISTER_PATH, payload.clone()))
            .await
        {
            Ok(_) => true,
            Err(CoreError::UnknownServer { status: 404, .. }) => {
                tracing::warn!("Device registration endpoint not deployed, caching handle locally");
                false
            }
            Err(CoreError::Validation { status, message }) => {
                tracing::warn!(status, %message, payload = %payload, "Device registration rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Device registration failed");
                false
            }
        };

        // The handle is cached even when the backend call failed, so the
        // next registration attempt (or deployment) can pick it up.
        if let Err(e) = self.store.set(DEVICE_HANDLE_KEY, &handle).await {
            tracing::warn!(error = %e, "Could not cache device handle");
        }

        accepted
    }

    /// Ask the backend to forget the cached handle, then clear the local
    /// cache regardless of the backend outcome.
    pub async fn unregister(&self) {
        let cached = match self.store.get(DEVICE_HANDLE_KEY).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read cached device handle");
                None
            }
        };

        if let Some(handle) = cached {
            let request = ApiRequest::post(UNREGISTER_PATH, json!({ "handle": handle }));
            if let Err(e) = self.api.send(request).await {
                tracing::warn!(error = %e, "Device unregistration failed, clearing cache anyway");
            }
        }

        if let Err(e) = self.store.remove(DEVICE_HANDLE_KEY).await {
            tracing::warn!(error = %e, "Could not clear cached device handle");
        }
    }

    /// React to a session transition. Failures are logged and never block
    /// or fail the transition itself.
    pub async fn handle_auth_transition(&self, authenticated: bool) {
        if authenticated {
            self.register_current().await;
        } else {
            self.unregister().await;
        }
    }

    // ─── Listener registry ───────────────────────────────────────────────

    /// Subscribe to notifications received while the app is foregrounded.
    pub fn on_received<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NotificationContent) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.received.insert(id, Box::new(listener));
        Subscription {
            id,
            kind: ListenerKind::Received,
        }
    }

    /// Subscribe to notification taps.
    pub fn on_tapped<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NotificationContent) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.tapped.insert(id, Box::new(listener));
        Subscription {
            id,
            kind: ListenerKind::Tapped,
        }
    }

    /// Drop a listener. Unsubscribing twice is a no-op.
    pub fn unsubscribe(&self, subscription: Subscription) {
        match subscription.kind {
            ListenerKind::Received => self.received.remove(&subscription.id),
            ListenerKind::Tapped => self.tapped.remove(&subscription.id),
        };
    }

    /// Fan a received notification out to subscribers. Called by the
    /// shell's platform glue.
    pub fn dispatch_received(&self, content: &NotificationContent) {
        for entry in self.received.iter() {
            entry.value()(content);
        }
    }

    /// Fan a notification tap out to subscribers.
    pub fn dispatch_tapped(&self, content: &NotificationContent) {
        for entry in self.tapped.iter() {
            entry.value()(content);
        }
    }
}
