// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-site controller feature cache.
//!
//! Feature flags are listed once per site and shared by every resource
//! operation. Concurrent first lookups for the same site trigger a single
//! listing call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::error::{ApiError, Result};

/// One feature flag as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub enabled: bool,
}

/// Source of feature listings.
#[async_trait]
pub trait FeatureLister: Send + Sync {
    async fn list_features(&self, cancel: &CancellationToken, site: &str) -> Result<Vec<Feature>>;
}

/// Feature state on one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    Enabled,
    Disabled,
    /// The controller does not report the feature at all.
    Unavailable,
}

type FeatureMap = Arc<HashMap<String, bool>>;

/// Lazily populated, per-site feature cache.
pub struct FeatureCache {
    lister: Arc<dyn FeatureLister>,
    sites: RwLock<HashMap<String, FeatureMap>>,
    populate: Mutex<()>,
}

impl FeatureCache {
    pub fn new(lister: Arc<dyn FeatureLister>) -> Self {
        Self {
            lister,
            sites: RwLock::new(HashMap::new()),
            populate: Mutex::new(()),
        }
    }

    async fn cached(&self, site: &str) -> Option<FeatureMap> {
        self.sites.read().await.get(site).cloned()
    }

    /// Features of `site`, listing them on first use.
    ///
    /// A failed listing is cached as an empty map, so every feature on that
    /// site reads as unavailable until [`invalidate`](Self::invalidate) is
    /// called. A cancelled listing is not cached.
    #[instrument(skip(self, cancel))]
    pub async fn features(&self, cancel: &CancellationToken, site: &str) -> FeatureMap {
        if let Some(features) = self.cached(site).await {
            return features;
        }

        let _guard = self.populate.lock().await;
        if let Some(features) = self.cached(site).await {
            return features;
        }

        let features: FeatureMap = match self.lister.list_features(cancel, site).await {
            Ok(list) => {
                debug!(count = list.len(), "Listed controller features");
                Arc::new(list.into_iter().map(|f| (f.name, f.enabled)).collect())
            }
            Err(ApiError::Cancelled) => {
                debug!("Feature listing cancelled");
                return Arc::new(HashMap::new());
            }
            Err(err) => {
                warn!(error = %err, "Feature listing failed, treating all features as unavailable");
                Arc::new(HashMap::new())
            }
        };

        self.sites
            .write()
            .await
            .insert(site.to_string(), features.clone());
        features
    }

    pub async fn state(
        &self,
        cancel: &CancellationToken,
        site: &str,
        feature: &str,
    ) -> FeatureState {
        match self.features(cancel, site).await.get(feature) {
            Some(true) => FeatureState::Enabled,
            Some(false) => FeatureState::Disabled,
            None => FeatureState::Unavailable,
        }
    }

    pub async fn is_enabled(&self, cancel: &CancellationToken, site: &str, feature: &str) -> bool {
        self.state(cancel, site, feature).await == FeatureState::Enabled
    }

    pub async fn is_disabled(&self, cancel: &CancellationToken, site: &str, feature: &str) -> bool {
        self.state(cancel, site, feature).await == FeatureState::Disabled
    }

    pub async fn is_unavailable(
        &self,
        cancel: &CancellationToken,
        site: &str,
        feature: &str,
    ) -> bool {
        self.state(cancel, site, feature).await == FeatureState::Unavailable
    }

    /// One error listing every feature in `required` that is not enabled on
    /// `site`. Empty when all are enabled.
    pub async fn require_features_enabled<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        site: &str,
        required: &[S],
    ) -> Diagnostics {
        let features = self.features(cancel, site).await;
        let failing: Vec<String> = required
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|name| match features.get(name) {
                Some(true) => None,
                Some(false) => Some(format!("{} (disabled)", name)),
                None => Some(format!("{} (unavailable)", name)),
            })
            .collect();

        if failing.is_empty() {
            return Diagnostics::new();
        }
        Diagnostics::from_error(
            "Required controller features not enabled",
            format!("site '{}' is missing: {}", site, failing.join(", ")),
        )
    }

    /// Drop the cached features of one site.
    pub async fn invalidate(&self, site: &str) {
        self.sites.write().await.remove(site);
    }

    /// Drop all cached features.
    pub async fn clear(&self) {
        self.sites.write().await.clear();
    }
}
