// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for ctrlsync.
//!
//! Connects the controller-agnostic engine in `ctrlsync-engine` to a UniFi
//! Network controller:
//!
//! - [`HttpTransport`]: reqwest transport with cookie session, CSRF token and
//!   API key handling
//! - [`SessionAuthenticator`]: username/password login
//! - [`ControllerFeatureLister`]: feature flags per site
//! - [`Controller`]: connect, discover the version, build the shared
//!   [`LifecycleContext`](ctrlsync_engine::LifecycleContext)
//!
//! # Example
//!
//! ```ignore
//! use ctrlsync_client::{ClientConfig, Controller};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ClientConfig::from_env()?;
//! let controller = Controller::connect(config, &CancellationToken::new()).await?;
//! let context = controller.lifecycle_context();
//! ```

mod auth;
mod config;
mod controller;
mod error;
mod features;
mod transport;

pub use auth::SessionAuthenticator;
pub use config::{ApiStyle, ClientConfig, Credentials};
pub use controller::Controller;
pub use error::{ClientError, Result};
pub use features::ControllerFeatureLister;
pub use transport::{HttpTransport, envelope_data, envelope_first};
