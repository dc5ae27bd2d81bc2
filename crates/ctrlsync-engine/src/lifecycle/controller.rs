// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic create/read/update/delete/import pipeline.
//!
//! Every operation runs the same pass:
//!
//! ```text
//! resolve site -> preconditions -> lower model -> verb -> merge | classify
//! ```
//!
//! Preconditions (rules, version gates, required features) abort before any
//! network call and report every failure at once.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, instrument, warn};

use super::import::ImportId;
use super::model::ResourceModel;
use super::verbs::{VerbBindings, VerbCall};
use crate::diagnostics::Diagnostics;
use crate::error::ApiError;
use crate::features::FeatureCache;
use crate::rules::{ConfigDocument, JsonDocument, Rule, RuleContext, RuleSet};
use crate::version::ControllerVersion;

/// Default site name used when neither the model nor the context sets one.
pub const DEFAULT_SITE: &str = "default";

const NO_OBJECT_RETURNED: &str =
    "the controller returned no object, the resource may be unsupported on this controller version";

// ============================================================================
// Shared context
// ============================================================================

/// State shared by every resource controller of one connection.
pub struct LifecycleContext<C> {
    pub client: Arc<C>,
    pub default_site: String,
    pub controller_version: Option<ControllerVersion>,
    pub features: Option<Arc<FeatureCache>>,
}

impl<C> Clone for LifecycleContext<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            default_site: self.default_site.clone(),
            controller_version: self.controller_version.clone(),
            features: self.features.clone(),
        }
    }
}

impl<C> LifecycleContext<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            default_site: DEFAULT_SITE.to_string(),
            controller_version: None,
            features: None,
        }
    }

    pub fn with_default_site(mut self, site: impl Into<String>) -> Self {
        self.default_site = site.into();
        self
    }

    pub fn with_controller_version(mut self, version: Option<ControllerVersion>) -> Self {
        self.controller_version = version;
        self
    }

    pub fn with_feature_cache(mut self, features: Arc<FeatureCache>) -> Self {
        self.features = Some(features);
        self
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Outcome of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<M> {
    /// The object exists; the model holds its current state.
    Found(M),
    /// The object no longer exists and should be dropped from state.
    Gone,
}

impl<M> ReadOutcome<M> {
    pub fn is_gone(&self) -> bool {
        matches!(self, ReadOutcome::Gone)
    }

    pub fn found(self) -> Option<M> {
        match self {
            ReadOutcome::Found(model) => Some(model),
            ReadOutcome::Gone => None,
        }
    }
}

/// Lifecycle controller for one resource kind.
pub struct ResourceController<M: ResourceModel, C> {
    kind: String,
    context: LifecycleContext<C>,
    verbs: VerbBindings<C, M::Domain>,
    preconditions: RuleSet,
    required_features: Vec<String>,
}

impl<M, C> ResourceController<M, C>
where
    M: ResourceModel,
    C: Send + Sync + 'static,
{
    pub fn new(
        kind: impl Into<String>,
        context: LifecycleContext<C>,
        verbs: VerbBindings<C, M::Domain>,
    ) -> Self {
        Self {
            kind: kind.into(),
            context,
            verbs,
            preconditions: RuleSet::new(),
            required_features: Vec::new(),
        }
    }

    /// Add a rule or version gate checked before every verb.
    pub fn with_precondition(mut self, rule: impl Rule + 'static) -> Self {
        self.preconditions.push(rule);
        self
    }

    /// Require controller features to be enabled on the resource's site.
    pub fn require_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_features
            .extend(features.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    fn resolve_site(&self, configured: Option<&str>) -> String {
        match configured {
            Some(site) if !site.is_empty() => site.to_string(),
            _ => self.context.default_site.clone(),
        }
    }

    fn call(&self, cancel: &CancellationToken, site: &str) -> VerbCall<C> {
        VerbCall {
            cancel: cancel.clone(),
            client: self.context.client.clone(),
            site: site.to_string(),
        }
    }

    /// Static checks only: rules and version gates against `config`.
    pub fn validate_config(&self, config: &dyn ConfigDocument) -> Diagnostics {
        let cx = RuleContext::new(config).with_version(self.context.controller_version.as_ref());
        self.preconditions.evaluate(&cx)
    }

    async fn check_preconditions(
        &self,
        cancel: &CancellationToken,
        config: Option<&dyn ConfigDocument>,
        site: &str,
    ) -> Diagnostics {
        let empty = JsonDocument::empty();
        let document = config.unwrap_or(&empty);
        let mut diags = self.validate_config(document);

        if !self.required_features.is_empty() {
            match &self.context.features {
                Some(cache) => {
                    let required = self.required_features.as_slice();
                    diags.merge(cache.require_features_enabled(cancel, site, required).await);
                }
                None => diags.add_error(
                    "Controller features not available",
                    format!(
                        "{} requires features {} but no feature cache is configured",
                        self.kind,
                        self.required_features.join(", ")
                    ),
                ),
            }
        }
        diags
    }

    fn verb_failed(&self, verb: &str, site: &str, id: &str, err: &ApiError) -> Diagnostics {
        let target = if id.is_empty() {
            format!("site '{}'", site)
        } else {
            format!("id '{}' in site '{}'", id, site)
        };
        Diagnostics::from_error(
            format!("Error {} {}", verb, self.kind),
            format!("{}: {}", target, err),
        )
    }

    fn log_warnings(&self, diags: &Diagnostics) {
        for warning in diags.warnings() {
            warn!(kind = %self.kind, "{}", warning);
        }
    }

    /// Create the resource described by `plan`.
    ///
    /// Without a create binding the plan is returned unchanged.
    #[instrument(skip(self, cancel, config, plan), fields(kind = %self.kind, site = tracing::field::Empty))]
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        config: &dyn ConfigDocument,
        mut plan: M,
    ) -> Result<M, Diagnostics> {
        let Some(create) = &self.verbs.create else {
            debug!("Create not bound, nothing to do");
            return Ok(plan);
        };
        let site = self.resolve_site(plan.raw_site());
        Span::current().record("site", site.as_str());

        let mut diags = self.check_preconditions(cancel, Some(config), &site).await;
        let body = match plan.to_domain() {
            Ok(body) => body,
            Err(lowering) => {
                diags.merge(lowering);
                return Err(diags);
            }
        };
        if diags.has_error() {
            return Err(diags);
        }

        match create(self.call(cancel, &site), body).await {
            Ok(Some(created)) => {
                diags.merge(plan.merge_from_domain(created));
                plan.set_site(site);
                self.log_warnings(&diags);
                info!(id = %plan.id(), "Created {}", self.kind);
                diags.into_result(plan)
            }
            Ok(None) => {
                diags.add_error(
                    format!("Error creating {}", self.kind),
                    format!("site '{}': {}", site, NO_OBJECT_RETURNED),
                );
                Err(diags)
            }
            Err(err) => {
                error!(error = %err, "Create failed");
                diags.merge(self.verb_failed("creating", &site, "", &err));
                Err(diags)
            }
        }
    }

    /// Refresh `state` from the controller.
    ///
    /// A missing object yields [`ReadOutcome::Gone`]. The id and site already
    /// held by `state` are kept.
    #[instrument(skip(self, cancel, state), fields(kind = %self.kind, id = %state.id(), site = tracing::field::Empty))]
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        mut state: M,
    ) -> Result<ReadOutcome<M>, Diagnostics> {
        let Some(read) = &self.verbs.read else {
            error!("Read not bound");
            return Err(Diagnostics::from_error(
                format!("{} cannot be read", self.kind),
                "resource is misconfigured: a read operation is mandatory",
            ));
        };
        let site = self.resolve_site(Some(state.site()));
        Span::current().record("site", site.as_str());

        let diags = self.check_preconditions(cancel, None, &site).await;
        if diags.has_error() {
            return Err(diags);
        }

        let id = state.id().to_string();
        match read(self.call(cancel, &site), id.clone()).await {
            Ok(found) => {
                let known_site = state.site().to_string();
                let mut merged = diags;
                merged.merge(state.merge_from_domain(found));
                if !id.is_empty() {
                    state.set_id(id);
                }
                state.set_site(if known_site.is_empty() { site } else { known_site });
                self.log_warnings(&merged);
                merged.into_result(ReadOutcome::Found(state))
            }
            Err(err) if err.is_not_found() => {
                info!("{} no longer exists, dropping from state", self.kind);
                Ok(ReadOutcome::Gone)
            }
            Err(err) => {
                error!(error = %err, "Read failed");
                Err(self.verb_failed("reading", &site, &id, &err))
            }
        }
    }

    /// Apply `plan`, merging the controller's answer into `target`.
    ///
    /// `target` is usually the prior state; it is only modified on success.
    #[instrument(skip(self, cancel, config, plan, target), fields(kind = %self.kind, id = %plan.id(), site = tracing::field::Empty))]
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        config: &dyn ConfigDocument,
        plan: &M,
        target: &mut M,
    ) -> Result<(), Diagnostics> {
        let Some(update) = &self.verbs.update else {
            debug!("Update not bound, nothing to do");
            return Ok(());
        };
        let site = self.resolve_site(plan.raw_site());
        Span::current().record("site", site.as_str());

        let mut diags = self.check_preconditions(cancel, Some(config), &site).await;
        let body = match plan.to_domain() {
            Ok(body) => body,
            Err(lowering) => {
                diags.merge(lowering);
                return Err(diags);
            }
        };
        if diags.has_error() {
            return Err(diags);
        }

        match update(self.call(cancel, &site), body).await {
            Ok(Some(updated)) => {
                diags.merge(target.merge_from_domain(updated));
                target.set_site(site);
                self.log_warnings(&diags);
                info!("Updated {}", self.kind);
                diags.into_result(())
            }
            Ok(None) => {
                diags.add_error(
                    format!("Error updating {}", self.kind),
                    format!("id '{}' in site '{}': {}", plan.id(), site, NO_OBJECT_RETURNED),
                );
                Err(diags)
            }
            Err(err) => {
                error!(error = %err, "Update failed");
                diags.merge(self.verb_failed("updating", &site, plan.id(), &err));
                Err(diags)
            }
        }
    }

    /// Delete the object behind `state`. Not-found counts as deleted.
    #[instrument(skip(self, cancel, state), fields(kind = %self.kind, id = %state.id(), site = tracing::field::Empty))]
    pub async fn delete(&self, cancel: &CancellationToken, state: &M) -> Result<(), Diagnostics> {
        let Some(delete) = &self.verbs.delete else {
            debug!("Delete not bound, nothing to do");
            return Ok(());
        };
        let site = self.resolve_site(Some(state.site()));
        Span::current().record("site", site.as_str());

        let diags = self.check_preconditions(cancel, None, &site).await;
        if diags.has_error() {
            return Err(diags);
        }

        match delete(self.call(cancel, &site), state.id().to_string()).await {
            Ok(()) => {
                info!("Deleted {}", self.kind);
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!("{} already gone", self.kind);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Delete failed");
                Err(self.verb_failed("deleting", &site, state.id(), &err))
            }
        }
    }

    /// Import an existing object from a `<site>:<id>` identifier.
    #[instrument(skip(self, cancel), fields(kind = %self.kind))]
    pub async fn import(
        &self,
        cancel: &CancellationToken,
        import_id: &str,
    ) -> Result<ReadOutcome<M>, Diagnostics> {
        let parsed = ImportId::parse(import_id).map_err(|err| {
            Diagnostics::from_error(format!("Invalid {} import id", self.kind), err.to_string())
        })?;

        let mut state = M::default();
        state.set_id(parsed.id);
        state.set_site(parsed.site);
        self.read(cancel, state).await
    }
}
