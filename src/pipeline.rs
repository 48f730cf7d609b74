// SPDX-License-Identifier: MIT

//! Request pipeline: every outbound call to the backend passes through here.
//!
//! The pipeline attaches the stored access credential as a bearer header,
//! classifies transport vs. application failures, and on a 401 performs a
//! single-flight credential refresh before re-issuing the original request.
//! Callers never see the intermediate 401 when the refresh succeeds.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::models::{routes, CredentialPair};
use crate::platform::{ApiRequest, HttpTransport, Navigator, RawResponse};
use crate::store::CredentialStore;

const REFRESH_PATH: &str = "/auth/refresh";

/// A logical request plus its retried-once marker.
///
/// The marker lives on this wrapper, constructed once per logical call, so a
/// re-issued request can never trigger a second refresh.
struct AttemptedRequest {
    request: ApiRequest,
    attempted: bool,
}

impl AttemptedRequest {
    fn new(request: ApiRequest) -> Self {
        Self {
            request,
            attempted: false,
        }
    }
}

/// API client shared by every component that talks to the backend.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: CredentialStore,
    navigator: Arc<dyn Navigator>,
    /// Single-flight guard: at most one outbound refresh call exists at any
    /// time. Requests that fault with 401 while a refresh is in flight wait
    /// here and adopt its outcome.
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The credential store this client reads bearer credentials from.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Send a request through the full pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let mut call = AttemptedRequest::new(request);

        let stale = self.store.credentials().await?.map(|p| p.access);
        let response = self.issue(&call.request, stale.as_deref()).await?;

        if response.status == 401 && !call.attempted {
            call.attempted = true;
            let access = self.refresh_credentials(stale.as_deref()).await?;
            let retried = self.issue(&call.request, Some(&access)).await?;
            return self.classify(retried);
        }

        self.classify(response)
    }

    /// Send a request and deserialize the success body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        serde_json::from_value(response.body).map_err(|e| CoreError::UnknownServer {
            status: response.status,
            message: format!("Malformed response body: {}", e),
        })
    }

    /// One transport round trip. A missing response is a
    /// [`CoreError::Transport`] and never triggers a refresh; the
    /// transport's own timeout is classified the same way.
    async fn issue(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse> {
        self.transport
            .send(request, bearer)
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))
    }

    /// Map a settled response to a result, with side effects for the
    /// payment-required short circuit.
    fn classify(&self, response: RawResponse) -> Result<RawResponse> {
        if response.is_success() {
            return Ok(response);
        }

        if response.status == 402 {
            tracing::warn!("Payment required, redirecting to billing");
            self.navigator
                .navigate(routes::BILLING, Some(json!({ "reason": "payment_required" })));
        }

        Err(CoreError::from_response(response.status, &response.body))
    }

    /// Perform (or await) the single-flight credential refresh.
    ///
    /// `stale_access` is the credential the caller faulted with. After the
    /// lock is acquired the store is re-read: if the stored access credential
    /// already differs, another task won the refresh and its result is
    /// adopted without a second endpoint call.
    ///
    /// Any refresh-endpoint failure is treated the same way: the pair is
    /// cleared, navigation resets to the login surface, and the caller gets
    /// [`CoreError::Auth`].
    async fn refresh_credentials(&self, stale_access: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let pair = match self.store.credentials().await? {
            Some(pair) => pair,
            // No refresh credential: skip refresh, propagate the 401.
            None => return Err(CoreError::Auth),
        };

        if Some(pair.access.as_str()) != stale_access {
            // Another task already refreshed while we waited.
            return Ok(pair.access);
        }

        tracing::info!("Access credential rejected, refreshing");

        let request = ApiRequest::post(
            REFRESH_PATH,
            json!({ "refresh_credential": pair.refresh }),
        );

        let refreshed = match self.issue(&request, None).await {
            Ok(response) if response.is_success() => {
                serde_json::from_value::<CredentialPair>(response.body).ok()
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "Credential refresh rejected");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh failed");
                None
            }
        };

        match refreshed {
            Some(new_pair) => {
                // Whole-pair write: both credentials replaced atomically.
                self.store.save_credentials(&new_pair).await?;
                tracing::info!("Credentials refreshed");
                Ok(new_pair.access)
            }
            None => {
                if let Err(e) = self.store.clear_credentials().await {
                    tracing::warn!(error = %e, "Failed to clear credentials after refresh failure");
                }
                self.navigator.reset(routes::LOGIN);
                Err(CoreError::Auth)
            }
        }
    }
}
