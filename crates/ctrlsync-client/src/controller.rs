// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection bootstrap.

use std::sync::Arc;

use ctrlsync_engine::{
    AuthenticatingClient, ControllerVersion, FeatureCache, LifecycleContext, Transport,
};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::auth::SessionAuthenticator;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::features::ControllerFeatureLister;
use crate::transport::{HttpTransport, envelope_first};

#[derive(Debug, Deserialize)]
struct SysInfo {
    version: Option<String>,
}

/// A logged-in controller connection.
///
/// Holds the authenticating client, the discovered controller version and
/// the shared feature cache. Cheap to clone.
#[derive(Clone)]
pub struct Controller {
    config: ClientConfig,
    client: Arc<AuthenticatingClient>,
    version: Option<ControllerVersion>,
    features: Arc<FeatureCache>,
}

impl Controller {
    /// Build the transport, log in and discover the controller version.
    ///
    /// A failed login is an error. A failed version lookup is not: the
    /// version is left unknown and version-gated resources report it.
    #[instrument(skip_all, fields(url = %config.base_url, site = %config.default_site))]
    pub async fn connect(config: ClientConfig, cancel: &CancellationToken) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let authenticator = Arc::new(SessionAuthenticator::new(transport.clone(), &config));
        let client = Arc::new(AuthenticatingClient::new(
            transport as Arc<dyn Transport>,
            authenticator,
        ));

        client.login(cancel).await?;

        let version = match discover_version(&client, &config, cancel).await {
            Ok(version) => {
                info!(version = %version, "Connected to controller");
                Some(version)
            }
            Err(e) => {
                warn!(error = %e, "Could not determine controller version");
                None
            }
        };

        let lister = ControllerFeatureLister::new(client.clone(), config.clone());
        let features = Arc::new(FeatureCache::new(Arc::new(lister)));

        Ok(Self {
            config,
            client,
            version,
            features,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<AuthenticatingClient> {
        self.client.clone()
    }

    pub fn version(&self) -> Option<&ControllerVersion> {
        self.version.as_ref()
    }

    pub fn features(&self) -> Arc<FeatureCache> {
        self.features.clone()
    }

    /// Context handed to every resource controller of this connection.
    pub fn lifecycle_context(&self) -> LifecycleContext<AuthenticatingClient> {
        LifecycleContext::new(self.client.clone())
            .with_default_site(self.config.default_site.clone())
            .with_controller_version(self.version.clone())
            .with_feature_cache(self.features.clone())
    }
}

async fn discover_version(
    client: &AuthenticatingClient,
    config: &ClientConfig,
    cancel: &CancellationToken,
) -> Result<ControllerVersion> {
    let path = config.site_path(&config.default_site, "stat/sysinfo");
    let response: Value = client.get(cancel, &path).await?;
    let info: SysInfo = envelope_first(response, "sysinfo")?;
    let raw = info
        .version
        .ok_or_else(|| ClientError::UnexpectedResponse("sysinfo has no version".to_string()))?;
    raw.parse().map_err(|e| {
        ClientError::UnexpectedResponse(format!("bad controller version '{}': {}", raw, e))
    })
}
