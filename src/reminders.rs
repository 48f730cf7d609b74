// SPDX-License-Identifier: MIT

//! Locally-scheduled booking reminders and the badge counter.
//!
//! Reminders are one-shot local notifications tied to a future business
//! event. The list is persisted under a single storage key so reminders
//! survive process restarts, and is only ever mutated through this
//! scheduler.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::models::{ScheduledReminder, Session};
use crate::pipeline::ApiClient;
use crate::platform::{ApiRequest, NotificationContent, PlatformNotifications};
use crate::store::CredentialStore;

const REMINDERS_KEY: &str = "reminders.scheduled";

const UNREAD_COUNT_PATH: &str = "/notifications/unread-count";

/// Schedules, persists, and cancels booking reminders; mirrors the unread
/// count to the platform badge.
pub struct ReminderScheduler {
    api: Arc<ApiClient>,
    store: CredentialStore,
    notifications: Arc<dyn PlatformNotifications>,
    /// Serializes read-modify-write cycles on the persisted list.
    list_lock: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        api: Arc<ApiClient>,
        store: CredentialStore,
        notifications: Arc<dyn PlatformNotifications>,
    ) -> Self {
        Self {
            api,
            store,
            notifications,
            list_lock: Mutex::new(()),
        }
    }

    /// Schedule a reminder `lead_minutes` before `event_at`.
    ///
    /// Returns `Ok(None)` without touching the platform scheduler when the
    /// trigger would not be strictly in the future — the event is simply too
    /// soon for a reminder to be meaningful, which is not an error.
    pub async fn schedule_reminder(
        &self,
        business_event_id: u64,
        event_at: DateTime<Utc>,
        lead_minutes: i64,
        content: NotificationContent,
    ) -> Result<Option<String>> {
        let trigger_at = event_at - Duration::minutes(lead_minutes);
        if trigger_at <= Utc::now() {
            tracing::debug!(
                business_event_id,
                %event_at,
                lead_minutes,
                "Event too soon for a reminder, skipping"
            );
            return Ok(None);
        }

        let handle = self
            .notifications
            .schedule_one_shot(trigger_at, &content)
            .await
            .map_err(|e| CoreError::Platform(e.to_string()))?;

        let _guard = self.list_lock.lock().await;
        let mut reminders = self.read_list().await?;
        reminders.push(ScheduledReminder {
            local_handle: handle.clone(),
            business_event_id,
            trigger_at,
        });
        self.write_list(&reminders).await?;

        tracing::info!(business_event_id, %trigger_at, "Reminder scheduled");
        Ok(Some(handle))
    }

    /// Cancel the reminder for a business event. Cancelling one that does
    /// not exist is a no-op.
    pub async fn cancel_reminder(&self, business_event_id: u64) -> Result<()> {
        let _guard = self.list_lock.lock().await;
        let mut reminders = self.read_list().await?;

        let position = match reminders
            .iter()
            .position(|r| r.business_event_id == business_event_id)
        {
            Some(position) => position,
            None => return Ok(()),
        };

        let reminder = reminders.remove(position);
        if let Err(e) = self.notifications.cancel(&reminder.local_handle).await {
            tracing::warn!(error = %e, business_event_id, "Platform cancel failed, dropping entry anyway");
        }
        self.write_list(&reminders).await?;

        tracing::info!(business_event_id, "Reminder cancelled");
        Ok(())
    }

    /// Cancel every persisted reminder and clear the list. Used on logout.
    pub async fn cancel_all(&self) -> Result<()> {
        let _guard = self.list_lock.lock().await;
        let reminders = self.read_list().await?;

        for reminder in &reminders {
            if let Err(e) = self.notifications.cancel(&reminder.local_handle).await {
                tracing::warn!(
                    error = %e,
                    business_event_id = reminder.business_event_id,
                    "Platform cancel failed during cancel_all"
                );
            }
        }

        self.store.remove(REMINDERS_KEY).await?;
        tracing::info!(count = reminders.len(), "All reminders cancelled");
        Ok(())
    }

    /// Snapshot of the persisted reminder list.
    pub async fn scheduled(&self) -> Result<Vec<ScheduledReminder>> {
        self.read_list().await
    }

    /// Mirror the backend's unread count to the platform badge.
    ///
    /// Only meaningful for business owners; anonymous or non-owner sessions
    /// degrade to a zero badge. Backend failures are logged and swallowed —
    /// the badge is best-effort and must never surface an error to the
    /// caller. Invoked on every foreground transition and periodically
    /// while the app is foregrounded and authenticated.
    pub async fn sync_badge_count(&self, session: Option<&Session>) {
        let owner = match session {
            Some(session) if session.is_business_owner() => session,
            _ => {
                self.notifications.set_badge(0).await;
                return;
            }
        };

        match self
            .api
            .send_json::<UnreadCount>(ApiRequest::get(UNREAD_COUNT_PATH))
            .await
        {
            Ok(unread) => {
                self.notifications.set_badge(unread.count).await;
                tracing::debug!(count = unread.count, user = owner.user.id, "Badge synchronized");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Badge sync failed, keeping previous badge");
            }
        }
    }

    async fn read_list(&self) -> Result<Vec<ScheduledReminder>> {
        let raw = match self.store.get(REMINDERS_KEY).await? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_str(&raw) {
            Ok(reminders) => Ok(reminders),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted reminder list is unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn write_list(&self, reminders: &[ScheduledReminder]) -> Result<()> {
        let raw = serde_json::to_string(reminders)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("serialize reminders: {}", e)))?;
        self.store.set(REMINDERS_KEY, &raw).await
    }
}

/// Response of `GET /notifications/unread-count`.
#[derive(Debug, serde::Deserialize)]
struct UnreadCount {
    count: u32,
}
