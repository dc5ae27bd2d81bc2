// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Capability contract between a resource model and the lifecycle controller.

use crate::diagnostics::Diagnostics;

/// A desired-state model for one resource kind.
///
/// The controller never looks inside a model. It reads and writes the
/// identity fields through this trait, lowers the model to the controller's
/// domain object before a call and raises the returned object back after it.
///
/// `Default` is used to build a fresh model on import.
pub trait ResourceModel: Default + Send + Sync {
    /// The controller's native representation of the resource.
    type Domain: Send + 'static;

    /// Identifier assigned by the controller; empty before create.
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// Resolved site, empty if not yet resolved.
    fn site(&self) -> &str;
    fn set_site(&mut self, site: String);

    /// Site as configured, `None` when left unset.
    fn raw_site(&self) -> Option<&str>;

    /// Validate and lower the model into a domain object.
    fn to_domain(&self) -> Result<Self::Domain, Diagnostics>;

    /// Copy a domain object's fields back into the model.
    fn merge_from_domain(&mut self, domain: Self::Domain) -> Diagnostics;
}
