// SPDX-License-Identifier: MIT

//! Session controller: login, registration, logout, and startup hydration.
//!
//! Owns the in-memory session state machine and is the only component that
//! destroys session state as a side effect of an error. All consumers hold a
//! reference to the one controller instance; its methods are the only write
//! path to session state.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CoreError, Result};
use crate::device::DeviceRegistrationManager;
use crate::models::{routes, CredentialPair, RouteHint, Session, UserProfile};
use crate::pipeline::ApiClient;
use crate::platform::{ApiRequest, Navigator};
use crate::reminders::ReminderScheduler;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const IDENTITY_PATH: &str = "/auth/me";

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    /// A credential is present but the identity re-fetch failed with a
    /// transport error. The session is kept optimistically; the credential
    /// may still be valid.
    AuthenticatedUnreachable,
}

/// Registration payload. The data-processing consent flag is a precondition
/// enforced by the caller; the controller forwards it and lets the backend
/// report any business-rule violation.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub consent_given: bool,
}

/// Credentials extracted from a completed federated (OAuth-style) flow.
#[derive(Debug, Clone)]
pub struct FederatedCallback {
    pub access: String,
    pub refresh: String,
}

/// Owns login/logout/current-session state and drives the logout cascade.
pub struct SessionController {
    api: Arc<ApiClient>,
    navigator: Arc<dyn Navigator>,
    device: Arc<DeviceRegistrationManager>,
    reminders: Arc<ReminderScheduler>,
    state: RwLock<SessionState>,
    session: RwLock<Option<Session>>,
}

impl SessionController {
    pub fn new(
        api: Arc<ApiClient>,
        navigator: Arc<dyn Navigator>,
        device: Arc<DeviceRegistrationManager>,
        reminders: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            api,
            navigator,
            device,
            reminders,
            state: RwLock::new(SessionState::Anonymous),
            session: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Authenticate with email and password.
    ///
    /// Persists the returned credential pair, fetches the current identity,
    /// and returns the role-derived routing hint. A rejection from the
    /// backend surfaces as [`CoreError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<RouteHint> {
        *self.state.write().await = SessionState::Authenticating;

        let request = ApiRequest::post(
            LOGIN_PATH,
            json!({ "email": email, "password": password }),
        );

        let pair = match self.api.send_json::<CredentialPair>(request).await {
            Ok(pair) => pair,
            Err(e) => {
                *self.state.write().await = SessionState::Anonymous;
                return Err(map_rejection(e));
            }
        };

        self.establish(pair).await
    }

    /// Create an account and authenticate in one step.
    pub async fn register(&self, payload: RegistrationRequest) -> Result<RouteHint> {
        *self.state.write().await = SessionState::Authenticating;

        let body = serde_json::to_value(&payload)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("serialize registration: {}", e)))?;

        let pair = match self
            .api
            .send_json::<CredentialPair>(ApiRequest::post(REGISTER_PATH, body))
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                *self.state.write().await = SessionState::Anonymous;
                return Err(map_rejection(e));
            }
        };

        self.establish(pair).await
    }

    /// Complete a federated login after the external browser flow returns.
    ///
    /// `None` means the user dismissed or cancelled the external flow: a
    /// no-op, not an error. `Some` proceeds exactly as `login` does once it
    /// holds credentials.
    pub async fn complete_federated_login(
        &self,
        callback: Option<FederatedCallback>,
    ) -> Result<Option<RouteHint>> {
        let callback = match callback {
            Some(callback) => callback,
            None => {
                tracing::debug!("Federated login dismissed, state unchanged");
                return Ok(None);
            }
        };

        *self.state.write().await = SessionState::Authenticating;
        let pair = CredentialPair {
            access: callback.access,
            refresh: callback.refresh,
        };
        self.establish(pair).await.map(Some)
    }

    /// Clear everything tied to the current user and return to the
    /// anonymous entry surface.
    ///
    /// Cascade order: backend logout (best-effort) → device unregistration →
    /// reminder cancellation → credential clear → state reset → navigation
    /// reset. A stale device registration or dangling reminder after logout
    /// is a correctness bug, so the cascade steps run unconditionally; their
    /// individual failures are logged and never block the transition.
    pub async fn logout(&self) {
        if let Err(e) = self
            .api
            .send(ApiRequest::post(LOGOUT_PATH, json!({})))
            .await
        {
            tracing::warn!(error = %e, "Backend logout failed, continuing local cascade");
        }

        self.device.handle_auth_transition(false).await;

        if let Err(e) = self.reminders.cancel_all().await {
            tracing::warn!(error = %e, "Could not cancel reminders during logout");
        }

        if let Err(e) = self.api.store().clear_credentials().await {
            tracing::warn!(error = %e, "Could not clear credentials during logout");
        }

        *self.session.write().await = None;
        *self.state.write().await = SessionState::Anonymous;
        self.navigator.reset(routes::WELCOME);

        tracing::info!("Logged out");
    }

    /// Startup hydration: restore the session from a stored credential.
    ///
    /// Three outcomes: identity fetch succeeds (`Authenticated`), transport
    /// failure (`AuthenticatedUnreachable`, credential retained), or an
    /// authentication failure (credential cleared, `Anonymous`).
    pub async fn hydrate(&self) -> SessionState {
        let pair = match self.api.store().credentials().await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                *self.state.write().await = SessionState::Anonymous;
                return SessionState::Anonymous;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored credentials");
                *self.state.write().await = SessionState::Anonymous;
                return SessionState::Anonymous;
            }
        };

        match self
            .api
            .send_json::<UserProfile>(ApiRequest::get(IDENTITY_PATH))
            .await
        {
            Ok(user) => {
                // The pipeline may have refreshed mid-fetch; store wins.
                let credentials = match self.api.store().credentials().await {
                    Ok(Some(current)) => current,
                    _ => pair,
                };
                *self.session.write().await = Some(Session { credentials, user });
                *self.state.write().await = SessionState::Authenticated;
                self.device.handle_auth_transition(true).await;
                SessionState::Authenticated
            }
            Err(e) if e.is_transport() => {
                tracing::info!("Identity fetch unreachable, keeping session optimistically");
                *self.state.write().await = SessionState::AuthenticatedUnreachable;
                SessionState::AuthenticatedUnreachable
            }
            Err(e) if e.is_auth() => {
                tracing::info!(error = %e, "Stored credential rejected, clearing session");
                if let Err(e) = self.api.store().clear_credentials().await {
                    tracing::warn!(error = %e, "Could not clear rejected credentials");
                }
                *self.session.write().await = None;
                *self.state.write().await = SessionState::Anonymous;
                SessionState::Anonymous
            }
            Err(e) => {
                // Server-side trouble is treated like unreachability: the
                // credential itself was not rejected.
                tracing::warn!(error = %e, "Identity fetch failed, keeping session optimistically");
                *self.state.write().await = SessionState::AuthenticatedUnreachable;
                SessionState::AuthenticatedUnreachable
            }
        }
    }

    /// Post-credential steps shared by login, registration, and federated
    /// login: persist the pair, fetch the identity, derive the route hint,
    /// and kick off device registration.
    async fn establish(&self, pair: CredentialPair) -> Result<RouteHint> {
        self.api.store().save_credentials(&pair).await?;

        let user = match self
            .api
            .send_json::<UserProfile>(ApiRequest::get(IDENTITY_PATH))
            .await
        {
            Ok(user) => user,
            Err(e) if e.is_transport() => {
                // Credentials were just issued; keep them and degrade.
                *self.state.write().await = SessionState::AuthenticatedUnreachable;
                return Err(e);
            }
            Err(e) => {
                *self.state.write().await = SessionState::Anonymous;
                return Err(e);
            }
        };

        let session = Session {
            credentials: pair,
            user,
        };
        let hint = session.route_hint();

        *self.session.write().await = Some(session);
        *self.state.write().await = SessionState::Authenticated;

        // Best-effort; never blocks the login itself.
        self.device.handle_auth_transition(true).await;

        tracing::info!(route = hint.as_route(), "Session established");
        Ok(hint)
    }
}

/// Login/registration rejections surface as `InvalidCredentials`; anything
/// else keeps its pipeline classification.
fn map_rejection(e: CoreError) -> CoreError {
    match e {
        CoreError::Auth => CoreError::InvalidCredentials,
        other => other,
    }
}
