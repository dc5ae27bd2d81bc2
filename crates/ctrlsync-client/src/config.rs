// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, Result};

/// How the client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username/password login establishing a session cookie.
    Session { username: String, password: String },
    /// Static API key sent as `X-API-KEY` on every request.
    ApiKey(String),
}

impl Credentials {
    pub fn session(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Session {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey(key.into())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Session { username, .. } => f
                .debug_struct("Session")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
        }
    }
}

/// Controller flavor, which decides the login endpoint and API prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStyle {
    /// UniFi OS console: `/api/auth/login`, network API under `/proxy/network`.
    #[default]
    UnifiOs,
    /// Standalone controller: `/api/login`, network API at the root.
    Classic,
}

impl ApiStyle {
    pub fn login_path(&self) -> &'static str {
        match self {
            ApiStyle::UnifiOs => "/api/auth/login",
            ApiStyle::Classic => "/api/login",
        }
    }

    /// Prefix of the network application API.
    pub fn api_prefix(&self) -> &'static str {
        match self {
            ApiStyle::UnifiOs => "/proxy/network",
            ApiStyle::Classic => "",
        }
    }
}

impl FromStr for ApiStyle {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "unifi-os" | "unifios" | "os" => Ok(ApiStyle::UnifiOs),
            "classic" | "legacy" => Ok(ApiStyle::Classic),
            other => Err(ClientError::Config(format!(
                "unknown API style '{}', expected 'unifi-os' or 'classic'",
                other
            ))),
        }
    }
}

/// Configuration for a controller connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller base URL, always ending in `/`.
    pub base_url: Url,
    pub credentials: Credentials,
    pub api_style: ApiStyle,
    /// Skip TLS certificate verification (self-signed consoles).
    pub skip_cert_verification: bool,
    /// Site used when a resource does not name one.
    pub default_site: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default settings.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            credentials,
            api_style: ApiStyle::default(),
            skip_cert_verification: false,
            default_site: "default".to_string(),
            request_timeout: Duration::from_secs(30),
        })
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UNIFI_API`: controller URL (required)
    /// - `UNIFI_API_KEY`: API key; takes precedence over username/password
    /// - `UNIFI_USERNAME` / `UNIFI_PASSWORD`: session credentials
    /// - `UNIFI_API_STYLE`: `unifi-os` or `classic` (default: `unifi-os`)
    /// - `UNIFI_INSECURE`: skip TLS verification (default: "false")
    /// - `UNIFI_SITE`: default site (default: "default")
    /// - `UNIFI_REQUEST_TIMEOUT_MS`: request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        let base_url = non_empty_var("UNIFI_API")
            .ok_or_else(|| ClientError::Config("UNIFI_API is not set".to_string()))?;

        let credentials = match non_empty_var("UNIFI_API_KEY") {
            Some(key) => Credentials::ApiKey(key),
            None => match (non_empty_var("UNIFI_USERNAME"), non_empty_var("UNIFI_PASSWORD")) {
                (Some(username), Some(password)) => Credentials::Session { username, password },
                _ => {
                    return Err(ClientError::Config(
                        "set UNIFI_API_KEY or both UNIFI_USERNAME and UNIFI_PASSWORD".to_string(),
                    ));
                }
            },
        };

        let api_style = match non_empty_var("UNIFI_API_STYLE") {
            Some(style) => style.parse()?,
            None => ApiStyle::default(),
        };

        let skip_cert_verification = std::env::var("UNIFI_INSECURE")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let default_site = non_empty_var("UNIFI_SITE").unwrap_or_else(|| "default".to_string());

        let request_timeout_ms: u64 = std::env::var("UNIFI_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid UNIFI_REQUEST_TIMEOUT_MS: {}", e)))?;

        Ok(Self {
            base_url: normalize_base_url(&base_url)?,
            credentials,
            api_style,
            skip_cert_verification,
            default_site,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    pub fn with_api_style(mut self, style: ApiStyle) -> Self {
        self.api_style = style;
        self
    }

    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }

    pub fn with_default_site(mut self, site: impl Into<String>) -> Self {
        self.default_site = site.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Path of a classic site-scoped endpoint, e.g. `rest/wlanconf`.
    pub fn site_path(&self, site: &str, rest: &str) -> String {
        format!(
            "{}/api/s/{}/{}",
            self.api_style.api_prefix(),
            site,
            rest.trim_start_matches('/')
        )
    }

    /// Path of a v2 site-scoped endpoint, e.g. `described-features`.
    pub fn v2_site_path(&self, site: &str, rest: &str) -> String {
        format!(
            "{}/v2/api/site/{}/{}",
            self.api_style.api_prefix(),
            site,
            rest.trim_start_matches('/')
        )
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("'{}' cannot be used as a base URL", raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
