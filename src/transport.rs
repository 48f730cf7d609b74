// SPDX-License-Identifier: MIT

//! Production HTTP transport backed by `reqwest`.

use async_trait::async_trait;
use std::time::Duration;

use crate::platform::{ApiRequest, HttpTransport, Method, RawResponse, RequestBody, TransportFailure};

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport rooted at `base_url` with the given request
    /// timeout. Timeouts surface as [`TransportFailure`], like any other
    /// no-response condition.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => {
                // No static content-type here: reqwest generates the
                // boundary-bearing header for the form itself.
                let mut form = reqwest::multipart::Form::new();
                for field in fields {
                    let mut part = reqwest::multipart::Part::bytes(field.data.clone());
                    if let Some(filename) = &field.filename {
                        part = part.file_name(filename.clone());
                    }
                    if let Some(mime) = &field.content_type {
                        part = part
                            .mime_str(mime)
                            .map_err(|e| TransportFailure(format!("Invalid mime type: {}", e)))?;
                    }
                    form = form.part(field.name.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(RawResponse { status, body })
    }
}
