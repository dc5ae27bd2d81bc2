// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Controller login.

use std::sync::Arc;

use async_trait::async_trait;
use ctrlsync_engine::{ApiError, ApiRequest, Authenticator, Method, Transport};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::{ApiStyle, ClientConfig, Credentials};
use crate::transport::HttpTransport;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    remember: bool,
}

/// Logs in with the configured credentials.
///
/// Session credentials POST to the login endpoint of the configured
/// [`ApiStyle`]; the session cookie is kept by the transport's cookie store.
/// API keys need no login, so `login` succeeds without a request.
pub struct SessionAuthenticator {
    transport: Arc<HttpTransport>,
    credentials: Credentials,
    api_style: ApiStyle,
}

impl SessionAuthenticator {
    pub fn new(transport: Arc<HttpTransport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            credentials: config.credentials.clone(),
            api_style: config.api_style,
        }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    #[instrument(skip(self, cancel), fields(style = ?self.api_style))]
    async fn login(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        let (username, password) = match &self.credentials {
            Credentials::ApiKey(_) => {
                debug!("API key configured, no login needed");
                return Ok(());
            }
            Credentials::Session { username, password } => (username, password),
        };

        let body = serde_json::to_value(LoginRequest {
            username,
            password,
            remember: true,
        })?;
        let request = ApiRequest::new(Method::Post, self.api_style.login_path()).with_body(body);

        // straight to the transport: a 401 here is a bad password, not a stale session
        self.transport.execute(cancel, &request).await?;
        info!(username = %username, "Logged in to controller");
        Ok(())
    }
}
