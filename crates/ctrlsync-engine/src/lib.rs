// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ctrlsync engine - reconcile desired state against a network controller.
//!
//! This crate holds the transport-independent core: a generic lifecycle
//! controller that drives create/read/update/delete/import for any resource
//! kind, plus the checks that run before every call.
//!
//! # Components
//!
//! - **[`ResourceController`]**: generic CRUD/import pipeline over a
//!   [`ResourceModel`] and its [`VerbBindings`]
//! - **[`rules`]**: conditional cross-field rules over a [`ConfigDocument`]
//!   with known/null/unknown values
//! - **[`VersionGate`]**: min/max/exact controller version constraints, for a
//!   whole resource or a single attribute
//! - **[`FeatureCache`]**: per-site controller feature flags, listed once
//! - **[`AuthenticatingClient`]**: re-login and retry once on 401
//!
//! # Example
//!
//! ```ignore
//! use ctrlsync_engine::{LifecycleContext, ResourceController, VerbBindings, VersionGate};
//!
//! let verbs = VerbBindings::new()
//!     .read(|call, id| async move { fetch_wlan(&call.client, &call.site, &id).await })
//!     .create(|call, body| async move { create_wlan(&call.client, &call.site, body).await });
//!
//! let wlans: ResourceController<Wlan, AuthenticatingClient> =
//!     ResourceController::new("wlan", context.clone(), verbs)
//!         .with_precondition(VersionGate::parse_at_least("7.0.0")?);
//!
//! let state = wlans.create(&cancel, &config, plan).await?;
//! ```
//!
//! The HTTP transport lives in the `ctrlsync-client` crate.

pub mod auth;
pub mod diagnostics;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod rules;
pub mod version;

pub use auth::{ApiRequest, AuthenticatingClient, Authenticator, Method, Transport};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ApiError, Result};
pub use features::{Feature, FeatureCache, FeatureLister, FeatureState};
pub use lifecycle::{
    ImportId, ImportIdError, LifecycleContext, ReadOutcome, ResourceController, ResourceModel,
    VerbBindings, VerbCall,
};
pub use rules::{
    AttrValue, AttributePath, Condition, ConfigDocument, DelegateIf, JsonDocument, PathExpression,
    RequiredNoneIf, RequiredTogetherIf, RequiredValueIf, Rule, RuleContext, RuleSet,
};
pub use version::{AttributeVersionGate, ControllerVersion, VersionGate};
