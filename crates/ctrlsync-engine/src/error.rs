// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for remote controller calls.

use thiserror::Error;

/// Result type using ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the transport and by verb bindings.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The controller rejected the session or API key (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested object does not exist (HTTP 404 or equivalent).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("controller returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or protocol level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call was cancelled through its cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// Request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A 401 triggered a login, and the login itself failed.
    #[error("re-authentication failed after {original}: {login}")]
    LoginFailed {
        original: Box<ApiError>,
        login: Box<ApiError>,
    },

    /// A 401 triggered a successful login, but the retried request failed.
    #[error("request failed after re-authentication (first attempt: {original}): {retry}")]
    RetryFailed {
        original: Box<ApiError>,
        retry: Box<ApiError>,
    },
}

impl ApiError {
    /// True for a 401-equivalent failure.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Unauthorized(_) => true,
            ApiError::RetryFailed { retry, .. } => retry.is_unauthorized(),
            _ => false,
        }
    }

    /// True when the controller reported that the object does not exist.
    ///
    /// Looks through a re-authentication retry, so a 401 followed by a 404
    /// still classifies as not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::RetryFailed { retry, .. } => retry.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
