// SPDX-License-Identifier: MIT

//! Value types for sessions, credentials, devices, and reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Route names understood by the embedding shell's navigator.
pub mod routes {
    pub const WELCOME: &str = "Welcome";
    pub const LOGIN: &str = "Login";
    pub const BILLING: &str = "Billing";
    pub const CUSTOMER_HOME: &str = "CustomerHome";
    pub const OWNER_DASHBOARD: &str = "OwnerDashboard";
    pub const EMPLOYEE_SCHEDULE: &str = "EmployeeSchedule";
    pub const ADMIN_PANEL: &str = "AdminPanel";
}

/// The access/refresh bearer pair issued by the backend.
///
/// Always persisted and cleared as a whole: the pair is serialized as a
/// single value, so no reader can observe one credential updated and the
/// other stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    #[serde(rename = "access_credential", alias = "access_token")]
    pub access: String,
    #[serde(rename = "refresh_credential", alias = "refresh_token")]
    pub refresh: String,
}

/// Role tag assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    BusinessOwner,
    Employee,
    PlatformAdmin,
}

/// Identity record returned by `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_admin: bool,
    /// Data-processing consent, required at registration
    #[serde(default)]
    pub consent_given: bool,
}

/// An authenticated session: the credential pair plus the fetched identity.
///
/// Role booleans are derived from the profile, never stored independently.
#[derive(Debug, Clone)]
pub struct Session {
    pub credentials: CredentialPair,
    pub user: UserProfile,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin || self.user.role == UserRole::PlatformAdmin
    }

    pub fn is_business_owner(&self) -> bool {
        self.user.is_owner || self.user.role == UserRole::BusinessOwner
    }

    pub fn is_customer(&self) -> bool {
        self.user.role == UserRole::Customer
    }

    /// Destination the shell should route to after this session is
    /// established.
    pub fn route_hint(&self) -> RouteHint {
        if self.is_admin() {
            RouteHint::AdminPanel
        } else if self.is_business_owner() {
            RouteHint::OwnerDashboard
        } else if self.user.role == UserRole::Employee {
            RouteHint::EmployeeSchedule
        } else {
            RouteHint::CustomerHome
        }
    }
}

/// Post-login routing destination, derived from the user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteHint {
    CustomerHome,
    OwnerDashboard,
    EmployeeSchedule,
    AdminPanel,
}

impl RouteHint {
    pub fn as_route(&self) -> &'static str {
        match self {
            RouteHint::CustomerHome => routes::CUSTOMER_HOME,
            RouteHint::OwnerDashboard => routes::OWNER_DASHBOARD,
            RouteHint::EmployeeSchedule => routes::EMPLOYEE_SCHEDULE,
            RouteHint::AdminPanel => routes::ADMIN_PANEL,
        }
    }
}

/// Platform the push handle was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePlatform {
    Ios,
    Android,
    Web,
    Unknown,
}

/// Coarse device form factor reported alongside the push handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Phone,
    Tablet,
    Desktop,
    Tv,
    Unknown,
}

/// Payload sent to `POST /devices/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub handle: String,
    pub platform: DevicePlatform,
    pub device_class: DeviceClass,
}

/// A locally-scheduled one-shot notification tied to a future booking.
///
/// The list of these is persisted under a single storage key so reminders
/// survive process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledReminder {
    /// Opaque id returned by the platform scheduler
    pub local_handle: String,
    /// Booking (or other business event) this reminder belongs to
    pub business_event_id: u64,
    pub trigger_at: DateTime<Utc>,
}

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Undetermined,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Permission state as exposed to the rest of the app: a boolean plus a
/// loading flag while a permission transition is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionSnapshot {
    pub has_permission: bool,
    pub loading: bool,
}
