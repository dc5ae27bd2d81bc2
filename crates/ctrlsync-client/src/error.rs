// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for ctrlsync-client.

use ctrlsync_engine::ApiError;
use thiserror::Error;

/// Result type using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from configuring and connecting to a controller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The controller URL could not be parsed or joined.
    #[error("invalid controller URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A controller call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The controller answered with something we cannot interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api(api) => api,
            ClientError::UnexpectedResponse(msg) => ApiError::Serialization(msg),
            other => ApiError::Transport(other.to_string()),
        }
    }
}
