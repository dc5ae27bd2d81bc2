// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transport seam and the re-authenticating client.
//!
//! [`AuthenticatingClient`] wraps a [`Transport`]. When a call fails with 401
//! it logs in again through an [`Authenticator`] and retries the call once.
//! Logins are serialized so that many calls failing at the same moment do
//! not race each other through the login endpoint.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, Result};

/// HTTP method of a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A controller call: method, path relative to the base URL, optional JSON
/// body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw request execution.
///
/// Implementations classify responses into [`ApiError`] variants; in
/// particular a rejected session must surface as [`ApiError::Unauthorized`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, cancel: &CancellationToken, request: &ApiRequest) -> Result<Value>;
}

/// Establishes or refreshes the session used by a [`Transport`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Client that transparently re-authenticates once on 401.
pub struct AuthenticatingClient {
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    relogin: Mutex<()>,
}

impl AuthenticatingClient {
    pub fn new(transport: Arc<dyn Transport>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            transport,
            authenticator,
            relogin: Mutex::new(()),
        }
    }

    /// Log in, holding the same lock as a 401-triggered re-login.
    pub async fn login(&self, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock_relogin(cancel).await?;
        self.authenticator.login(cancel).await
    }

    async fn lock_relogin(
        &self,
        cancel: &CancellationToken,
    ) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            guard = self.relogin.lock() => Ok(guard),
        }
    }

    /// Execute a request, re-authenticating and retrying once on 401.
    ///
    /// Any other failure is returned as is. A failed login yields
    /// [`ApiError::LoginFailed`], a failed retry [`ApiError::RetryFailed`];
    /// both keep the original 401.
    #[instrument(skip(self, cancel, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, cancel: &CancellationToken, request: &ApiRequest) -> Result<Value> {
        let original = match self.transport.execute(cancel, request).await {
            Ok(value) => return Ok(value),
            Err(err) if matches!(err, ApiError::Unauthorized(_)) => err,
            Err(err) => return Err(err),
        };

        warn!(error = %original, "Session rejected, logging in again");
        {
            let _guard = self.lock_relogin(cancel).await?;
            if let Err(login) = self.authenticator.login(cancel).await {
                return Err(ApiError::LoginFailed {
                    original: Box::new(original),
                    login: Box::new(login),
                });
            }
        }

        debug!("Re-authenticated, retrying request");
        self.transport
            .execute(cancel, request)
            .await
            .map_err(|retry| ApiError::RetryFailed {
                original: Box::new(original),
                retry: Box::new(retry),
            })
    }

    /// Typed call: serialize `body`, execute, deserialize the response.
    ///
    /// An empty response body deserializes from JSON `null`.
    pub async fn call<B, R>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let mut request = ApiRequest::new(method, path);
        if let Some(body) = body {
            request.body = Some(serde_json::to_value(body)?);
        }
        let value = self.execute(cancel, &request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// GET `path` and deserialize the response.
    pub async fn get<R: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<R> {
        self.call::<Value, R>(cancel, Method::Get, path, None).await
    }
}

#[async_trait]
impl Transport for AuthenticatingClient {
    async fn execute(&self, cancel: &CancellationToken, request: &ApiRequest) -> Result<Value> {
        AuthenticatingClient::execute(self, cancel, request).await
    }
}
