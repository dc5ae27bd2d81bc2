// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures: an in-memory controller and a WLAN-like resource model.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ctrlsync_engine::{
    ApiError, AttributePath, Diagnostics, ResourceModel, VerbBindings, VerbCall,
};
use tracing_subscriber::EnvFilter;

/// Controller-side representation of a WLAN.
#[derive(Debug, Clone, PartialEq)]
pub struct WlanObject {
    pub id: String,
    pub name: String,
    pub security: String,
    pub passphrase: Option<String>,
    pub vlan: Option<u16>,
    /// Assigned by the controller.
    pub x_iapp_key: Option<String>,
}

/// Desired-state model for a WLAN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WlanModel {
    pub id: String,
    pub site: Option<String>,
    pub name: String,
    pub security: String,
    pub passphrase: Option<String>,
    pub vlan: Option<u16>,
    pub iapp_key: Option<String>,
}

impl WlanModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            security: "wpapsk".to_string(),
            passphrase: Some("correct horse".to_string()),
            ..Self::default()
        }
    }
}

impl ResourceModel for WlanModel {
    type Domain = WlanObject;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn site(&self) -> &str {
        self.site.as_deref().unwrap_or("")
    }

    fn set_site(&mut self, site: String) {
        self.site = Some(site);
    }

    fn raw_site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    fn to_domain(&self) -> Result<WlanObject, Diagnostics> {
        let mut diags = Diagnostics::new();
        if self.name.is_empty() {
            diags.add_attribute_error(
                AttributePath::root().name("name"),
                "Invalid name",
                "name must not be empty",
            );
        }
        if let Some(vlan) = self.vlan
            && !(1..=4094).contains(&vlan)
        {
            diags.add_attribute_error(
                AttributePath::root().name("vlan"),
                "Invalid VLAN",
                format!("{} is outside 1-4094", vlan),
            );
        }
        diags.into_result(WlanObject {
            id: self.id.clone(),
            name: self.name.clone(),
            security: self.security.clone(),
            passphrase: self.passphrase.clone(),
            vlan: self.vlan,
            x_iapp_key: None,
        })
    }

    fn merge_from_domain(&mut self, domain: WlanObject) -> Diagnostics {
        self.id = domain.id;
        self.name = domain.name;
        self.security = domain.security;
        self.passphrase = domain.passphrase;
        self.vlan = domain.vlan;
        self.iapp_key = domain.x_iapp_key;
        Diagnostics::new()
    }
}

/// In-memory controller keyed by `(site, id)`.
#[derive(Default)]
pub struct FakeController {
    objects: Mutex<HashMap<(String, String), WlanObject>>,
    next_id: AtomicUsize,
    pub calls: AtomicUsize,
    pub fail_status: Mutex<Option<u16>>,
    pub return_nothing: AtomicBool,
}

impl FakeController {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seed(&self, site: &str, object: WlanObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((site.to_string(), object.id.clone()), object);
    }

    pub fn stored(&self, site: &str, id: &str) -> Option<WlanObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(site.to_string(), id.to_string()))
            .cloned()
    }

    fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(ApiError::Status {
                status,
                message: "api.err.ServerBusy".to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn read(&self, site: &str, id: &str) -> Result<WlanObject, ApiError> {
        self.enter()?;
        self.stored(site, id)
            .ok_or_else(|| ApiError::NotFound(format!("wlan {}", id)))
    }

    pub fn create(&self, site: &str, mut body: WlanObject) -> Result<Option<WlanObject>, ApiError> {
        self.enter()?;
        if self.return_nothing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        body.id = format!("wlan{:04}", n + 1);
        body.x_iapp_key = Some(format!("iapp-{}", n + 1));
        self.seed(site, body.clone());
        Ok(Some(body))
    }

    pub fn update(&self, site: &str, body: WlanObject) -> Result<Option<WlanObject>, ApiError> {
        self.enter()?;
        let existing = self
            .stored(site, &body.id)
            .ok_or_else(|| ApiError::NotFound(format!("wlan {}", body.id)))?;
        let updated = WlanObject {
            x_iapp_key: existing.x_iapp_key,
            ..body
        };
        self.seed(site, updated.clone());
        Ok(Some(updated))
    }

    pub fn delete(&self, site: &str, id: &str) -> Result<(), ApiError> {
        self.enter()?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(site.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("wlan {}", id)))
    }
}

pub fn read_only_verbs() -> VerbBindings<FakeController, WlanObject> {
    VerbBindings::<FakeController, WlanObject>::new().read(
        |call: VerbCall<FakeController>, id: String| async move {
            call.client.read(&call.site, &id)
        },
    )
}

pub fn all_verbs() -> VerbBindings<FakeController, WlanObject> {
    read_only_verbs()
        .create(|call: VerbCall<FakeController>, body: WlanObject| async move {
            call.client.create(&call.site, body)
        })
        .update(|call: VerbCall<FakeController>, body: WlanObject| async move {
            call.client.update(&call.site, body)
        })
        .delete(|call: VerbCall<FakeController>, id: String| async move {
            call.client.delete(&call.site, &id)
        })
}

/// Route engine logs to the test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
