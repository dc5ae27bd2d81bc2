// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource lifecycle: model contract, verb bindings and the generic
//! controller that drives them.

pub mod controller;
pub mod import;
pub mod model;
pub mod verbs;

pub use controller::{DEFAULT_SITE, LifecycleContext, ReadOutcome, ResourceController};
pub use import::{ImportId, ImportIdError};
pub use model::ResourceModel;
pub use verbs::{VerbBindings, VerbCall, VerbFuture};
