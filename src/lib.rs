// SPDX-License-Identifier: MIT

//! Bookline Core: session & notification lifecycle for the Bookline mobile
//! apps.
//!
//! The embedding shell provides the platform collaborators (HTTP transport,
//! key-value persistence, notification center, navigator); this crate owns
//! the credential lifecycle, the request pipeline with single-flight
//! refresh, device push registration, and locally-scheduled booking
//! reminders.

pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod reminders;
pub mod session;
pub mod store;
pub mod transport;

use std::sync::Arc;

use config::CoreConfig;
use device::DeviceRegistrationManager;
use models::{DeviceClass, DevicePlatform};
use pipeline::ApiClient;
use platform::{HttpTransport, KeyValueStore, Navigator, PlatformNotifications};
use reminders::ReminderScheduler;
use session::SessionController;
use store::CredentialStore;
use transport::ReqwestTransport;

/// Fully wired core, one instance per process.
pub struct CoreServices {
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionController>,
    pub device: Arc<DeviceRegistrationManager>,
    pub reminders: Arc<ReminderScheduler>,
}

impl CoreServices {
    /// Wire the core against the shell's collaborators.
    pub fn new(
        config: &CoreConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
        notifications: Arc<dyn PlatformNotifications>,
        navigator: Arc<dyn Navigator>,
        platform: DevicePlatform,
        device_class: DeviceClass,
    ) -> Self {
        let store = CredentialStore::new(storage, config.storage_scope.clone());
        let api = Arc::new(ApiClient::new(transport, store.clone(), navigator.clone()));

        let device = Arc::new(DeviceRegistrationManager::new(
            api.clone(),
            store.clone(),
            notifications.clone(),
            platform,
            device_class,
        ));

        let reminders = Arc::new(ReminderScheduler::new(
            api.clone(),
            store,
            notifications,
        ));

        let session = Arc::new(SessionController::new(
            api.clone(),
            navigator,
            device.clone(),
            reminders.clone(),
        ));

        Self {
            api,
            session,
            device,
            reminders,
        }
    }

    /// Convenience constructor using the production `reqwest` transport.
    pub fn with_default_transport(
        config: &CoreConfig,
        storage: Arc<dyn KeyValueStore>,
        notifications: Arc<dyn PlatformNotifications>,
        navigator: Arc<dyn Navigator>,
        platform: DevicePlatform,
        device_class: DeviceClass,
    ) -> Self {
        let transport = Arc::new(ReqwestTransport::new(
            config.api_base_url.clone(),
            config.http_timeout_secs,
        ));
        Self::new(
            config,
            transport,
            storage,
            notifications,
            navigator,
            platform,
            device_class,
        )
    }

    /// Resynchronize platform state on an app foreground transition.
    ///
    /// The shell calls this every time the app comes to the foreground, and
    /// periodically while it stays there.
    pub async fn handle_foreground(&self) {
        let session = self.session.session().await;
        self.reminders.sync_badge_count(session.as_ref()).await;
    }
}
