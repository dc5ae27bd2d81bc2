// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Feature listing over the v2 `described-features` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use ctrlsync_engine::{ApiError, AuthenticatingClient, Feature, FeatureLister};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;

#[derive(Debug, Deserialize)]
struct DescribedFeature {
    name: String,
    #[serde(rename = "feature_exists", default)]
    enabled: bool,
}

/// Lists a site's features from the controller.
pub struct ControllerFeatureLister {
    client: Arc<AuthenticatingClient>,
    config: ClientConfig,
}

impl ControllerFeatureLister {
    pub fn new(client: Arc<AuthenticatingClient>, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl FeatureLister for ControllerFeatureLister {
    async fn list_features(
        &self,
        cancel: &CancellationToken,
        site: &str,
    ) -> Result<Vec<Feature>, ApiError> {
        let path = self.config.v2_site_path(site, "described-features");
        let described: Vec<DescribedFeature> = self.client.get(cancel, &path).await?;
        Ok(described
            .into_iter()
            .map(|f| Feature {
                name: f.name,
                enabled: f.enabled,
            })
            .collect())
    }
}
