// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! reqwest-backed JSON transport.

use async_trait::async_trait;
use ctrlsync_engine::{ApiError, ApiRequest, Method, Transport};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ClientConfig, Credentials};
use crate::error::Result;

const API_KEY_HEADER: &str = "X-API-KEY";
const CSRF_HEADER: &str = "X-CSRF-Token";
const UPDATED_CSRF_HEADER: &str = "X-Updated-CSRF-Token";

/// HTTP transport for the controller API.
///
/// Keeps the session cookie and the CSRF token issued by UniFi OS consoles,
/// and adds the API key header when configured with one.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    csrf_token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.skip_cert_verification)
            .build()?;

        let api_key = match &config.credentials {
            Credentials::ApiKey(key) => Some(key.clone()),
            Credentials::Session { .. } => None,
        };

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            csrf_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn remember_csrf(&self, headers: &HeaderMap) {
        let token = headers
            .get(UPDATED_CSRF_HEADER)
            .or_else(|| headers.get(CSRF_HEADER))
            .and_then(|v| v.to_str().ok());
        if let Some(token) = token {
            *self.csrf_token.write().await = Some(token.to_string());
        }
    }

    async fn send(&self, request: &ApiRequest) -> std::result::Result<Value, ApiError> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| ApiError::Transport(format!("invalid path '{}': {}", request.path, e)))?;

        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), url)
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(token) = self.csrf_token.read().await.as_deref() {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        self.remember_csrf(response.headers()).await;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), body_size = bytes.len(), "Controller responded");

        classify(status, &bytes, &request.path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, cancel, request), fields(method = %request.method, path = %request.path))]
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> std::result::Result<Value, ApiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.send(request) => result,
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Map a response to a value or an [`ApiError`].
///
/// Classic endpoints wrap payloads as `{"meta": {"rc", "msg"}, "data": [...]}`
/// and may report failures with a 2xx status; v2 endpoints return bare JSON
/// and `{"errorCode", "message"}` on failure.
pub(crate) fn classify(
    status: StatusCode,
    body: &[u8],
    path: &str,
) -> std::result::Result<Value, ApiError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                Value::String(String::from_utf8_lossy(body).into_owned())
            }
            Err(e) => {
                return Err(ApiError::Serialization(format!("invalid JSON from {}: {}", path, e)));
            }
        }
    };

    let message = error_message(&value);
    match status {
        StatusCode::UNAUTHORIZED => {
            return Err(ApiError::Unauthorized(message.unwrap_or_else(|| path.to_string())));
        }
        StatusCode::NOT_FOUND => {
            return Err(ApiError::NotFound(message.unwrap_or_else(|| path.to_string())));
        }
        s if !s.is_success() => {
            return Err(classify_message(s.as_u16(), message.unwrap_or_else(|| s.to_string())));
        }
        _ => {}
    }

    if value.pointer("/meta/rc").and_then(Value::as_str) == Some("error") {
        let message = message.unwrap_or_else(|| "unknown error".to_string());
        return Err(classify_message(status.as_u16(), message));
    }
    Ok(value)
}

fn classify_message(status: u16, message: String) -> ApiError {
    if message.contains("NoSuchObject") || message.contains("ObjectNotFound") {
        ApiError::NotFound(message)
    } else if message.contains("LoginRequired") {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Status { status, message }
    }
}

fn error_message(value: &Value) -> Option<String> {
    value
        .pointer("/meta/msg")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| value.as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
}

/// Extract the `data` array of a classic envelope.
pub fn envelope_data<T: DeserializeOwned>(value: Value) -> std::result::Result<Vec<T>, ApiError> {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Err(ApiError::Serialization("response has no 'data' field".to_string())),
        },
        other => Err(ApiError::Serialization(format!(
            "expected an object envelope, got {}",
            other
        ))),
    }
}

/// First element of a classic envelope, or not-found when it is empty.
pub fn envelope_first<T: DeserializeOwned>(
    value: Value,
    what: &str,
) -> std::result::Result<T, ApiError> {
    envelope_data::<T>(value)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(what.to_string()))
}
