// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle controller tests against an in-memory controller.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use common::{FakeController, WlanModel, WlanObject, all_verbs, init_tracing, read_only_verbs};
use ctrlsync_engine::{
    ApiError, Condition, ControllerVersion, Feature, FeatureCache, FeatureLister, JsonDocument,
    LifecycleContext, PathExpression, ReadOutcome, RequiredTogetherIf, ResourceController,
    ResourceModel, VerbBindings, VersionGate,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

type WlanController = ResourceController<WlanModel, FakeController>;

fn context(client: &Arc<FakeController>) -> LifecycleContext<FakeController> {
    init_tracing();
    LifecycleContext::new(client.clone()).with_controller_version(Some(version("8.0.26")))
}

fn version(s: &str) -> ControllerVersion {
    s.parse().unwrap()
}

fn expr(s: &str) -> PathExpression {
    PathExpression::parse(s).unwrap()
}

fn config_for(model: &WlanModel) -> JsonDocument {
    JsonDocument::new(json!({
        "name": model.name,
        "security": model.security,
        "passphrase": model.passphrase,
        "vlan": model.vlan,
    }))
}

fn wlan_object(id: &str, name: &str) -> WlanObject {
    WlanObject {
        id: id.to_string(),
        name: name.to_string(),
        security: "open".to_string(),
        passphrase: None,
        vlan: Some(20),
        x_iapp_key: Some("iapp-seeded".to_string()),
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_assigns_id_and_default_site() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let plan = WlanModel::new("guest");

    let state = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap();

    assert_eq!(state.id, "wlan0001");
    assert_eq!(state.site(), "default");
    assert_eq!(state.name, "guest");
    assert_eq!(state.iapp_key.as_deref(), Some("iapp-1"));
    assert!(client.stored("default", "wlan0001").is_some());
}

#[tokio::test]
async fn test_create_uses_configured_site() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new(
        "wlan",
        context(&client).with_default_site("hq"),
        all_verbs(),
    );
    let mut plan = WlanModel::new("branch");
    plan.site = Some("branch-01".to_string());

    let state = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap();

    assert_eq!(state.site(), "branch-01");
    assert!(client.stored("branch-01", &state.id).is_some());
    assert!(client.stored("hq", &state.id).is_none());
}

#[tokio::test]
async fn test_create_unbound_is_noop() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), read_only_verbs());
    let plan = WlanModel::new("guest");

    let state = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap();

    assert_eq!(state, plan);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_create_without_returned_object_is_error() {
    let client = Arc::new(FakeController::default());
    client.return_nothing.store(true, Ordering::SeqCst);
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let plan = WlanModel::new("guest");

    let diags = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap_err();

    assert!(diags.has_error());
    assert!(diags.to_string().contains("returned no object"));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_create_lowering_error_skips_network() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let mut plan = WlanModel::new("");
    plan.vlan = Some(5000);

    let diags = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap_err();

    // both field errors are reported
    assert_eq!(diags.errors().count(), 2);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_create_transport_error_names_verb_and_site() {
    let client = Arc::new(FakeController::default());
    *client.fail_status.lock().unwrap() = Some(500);
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let plan = WlanModel::new("guest");

    let diags = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap_err();

    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.summary, "Error creating wlan");
    assert!(diag.detail.contains("site 'default'"));
    assert!(diag.detail.contains("api.err.ServerBusy"));
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn test_preconditions_abort_and_report_everything() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new(
        "wlan",
        LifecycleContext::new(client.clone()).with_controller_version(Some(version("6.9.9"))),
        all_verbs(),
    )
    .with_precondition(VersionGate::parse_at_least("7.0.0").unwrap())
    .with_precondition(RequiredTogetherIf::new(
        Condition::equals(expr("security"), "wpapsk"),
        vec![expr("passphrase"), expr("vlan")],
    ));

    let mut plan = WlanModel::new("guest");
    plan.passphrase = None;
    plan.vlan = Some(10);

    let diags = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap_err();

    assert_eq!(diags.errors().count(), 2);
    let text = diags.to_string();
    assert!(text.contains("6.9.9"));
    assert!(text.contains("7.0.0"));
    assert!(text.contains("passphrase"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_validate_config_without_network() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs()).with_precondition(
        RequiredTogetherIf::new(
            Condition::equals(expr("security"), "wpapsk"),
            vec![expr("passphrase"), expr("vlan")],
        ),
    );

    let bad = JsonDocument::new(json!({"security": "wpapsk", "vlan": 10}));
    assert!(wlans.validate_config(&bad).has_error());

    let neither = JsonDocument::new(json!({"security": "wpapsk"}));
    assert!(wlans.validate_config(&neither).is_empty());

    let deferred = JsonDocument::new(json!({"security": "wpapsk", "vlan": 10}))
        .with_unknown(ctrlsync_engine::AttributePath::root().name("passphrase"));
    assert!(wlans.validate_config(&deferred).is_empty());
    assert_eq!(client.calls(), 0);
}

struct FixedFeatures(Vec<Feature>);

#[async_trait]
impl FeatureLister for FixedFeatures {
    async fn list_features(
        &self,
        _cancel: &CancellationToken,
        _site: &str,
    ) -> Result<Vec<Feature>, ApiError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_required_features_checked_per_site() {
    let client = Arc::new(FakeController::default());
    let cache = Arc::new(FeatureCache::new(Arc::new(FixedFeatures(vec![Feature {
        name: "ZONE_BASED_FIREWALL".to_string(),
        enabled: false,
    }]))));
    let wlans = WlanController::new(
        "firewall_zone",
        context(&client).with_feature_cache(cache),
        all_verbs(),
    )
    .require_features(["ZONE_BASED_FIREWALL"]);
    let plan = WlanModel::new("lan");

    let diags = wlans
        .create(&CancellationToken::new(), &config_for(&plan), plan.clone())
        .await
        .unwrap_err();

    assert!(diags.to_string().contains("ZONE_BASED_FIREWALL (disabled)"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_required_features_without_cache_is_error() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("firewall_zone", context(&client), all_verbs())
        .require_features(["ZONE_BASED_FIREWALL"]);

    let mut state = WlanModel::new("lan");
    state.id = "z1".to_string();
    assert!(wlans.read(&CancellationToken::new(), state).await.is_err());
    assert_eq!(client.calls(), 0);
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_read_not_found_is_gone() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let mut state = WlanModel::new("guest");
    state.id = "missing".to_string();

    let outcome = wlans.read(&CancellationToken::new(), state).await.unwrap();
    assert!(outcome.is_gone());
}

#[tokio::test]
async fn test_read_refreshes_and_keeps_identity() {
    let client = Arc::new(FakeController::default());
    client.seed("lab", wlan_object("abc123", "renamed"));
    let wlans = WlanController::new("wlan", context(&client), all_verbs());

    let mut state = WlanModel::new("guest");
    state.id = "abc123".to_string();
    state.site = Some("lab".to_string());

    let refreshed = wlans
        .read(&CancellationToken::new(), state)
        .await
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(refreshed.id, "abc123");
    assert_eq!(refreshed.site(), "lab");
    assert_eq!(refreshed.name, "renamed");
    assert_eq!(refreshed.vlan, Some(20));
}

#[tokio::test]
async fn test_read_unbound_is_fatal() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new(
        "wlan",
        context(&client),
        VerbBindings::<FakeController, WlanObject>::new(),
    );

    let diags = wlans
        .read(&CancellationToken::new(), WlanModel::default())
        .await
        .unwrap_err();
    assert!(diags.to_string().contains("read operation is mandatory"));
}

#[tokio::test]
async fn test_read_other_error_is_reported() {
    let client = Arc::new(FakeController::default());
    *client.fail_status.lock().unwrap() = Some(503);
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let mut state = WlanModel::new("guest");
    state.id = "abc123".to_string();

    let diags = wlans
        .read(&CancellationToken::new(), state)
        .await
        .unwrap_err();
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.summary, "Error reading wlan");
    assert!(diag.detail.contains("id 'abc123' in site 'default'"));
    assert_eq!(client.calls(), 1);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_merges_into_target() {
    let client = Arc::new(FakeController::default());
    client.seed("default", wlan_object("abc123", "guest"));
    let wlans = WlanController::new("wlan", context(&client), all_verbs());

    let mut prior = WlanModel::new("guest");
    prior.id = "abc123".to_string();
    let mut plan = prior.clone();
    plan.vlan = Some(30);

    let mut target = prior.clone();
    wlans
        .update(&CancellationToken::new(), &config_for(&plan), &plan, &mut target)
        .await
        .unwrap();

    assert_eq!(target.vlan, Some(30));
    assert_eq!(target.site(), "default");
    // server-assigned field survives the update
    assert_eq!(target.iapp_key.as_deref(), Some("iapp-seeded"));
    assert_eq!(client.stored("default", "abc123").unwrap().vlan, Some(30));
}

#[tokio::test]
async fn test_update_unbound_is_noop() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), read_only_verbs());
    let plan = WlanModel::new("guest");
    let mut target = WlanModel::new("old");

    wlans
        .update(&CancellationToken::new(), &config_for(&plan), &plan, &mut target)
        .await
        .unwrap();

    assert_eq!(target.name, "old");
    assert_eq!(client.calls(), 0);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_unbound_succeeds_without_calls() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), read_only_verbs());
    let mut state = WlanModel::new("guest");
    state.id = "abc123".to_string();

    wlans.delete(&CancellationToken::new(), &state).await.unwrap();
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let client = Arc::new(FakeController::default());
    client.seed("default", wlan_object("abc123", "guest"));
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let mut state = WlanModel::new("guest");
    state.id = "abc123".to_string();

    wlans.delete(&CancellationToken::new(), &state).await.unwrap();
    assert!(client.stored("default", "abc123").is_none());

    // second delete hits not-found and still succeeds
    wlans.delete(&CancellationToken::new(), &state).await.unwrap();
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_delete_other_error_is_reported() {
    let client = Arc::new(FakeController::default());
    *client.fail_status.lock().unwrap() = Some(400);
    let wlans = WlanController::new("wlan", context(&client), all_verbs());
    let mut state = WlanModel::new("guest");
    state.id = "abc123".to_string();

    let diags = wlans
        .delete(&CancellationToken::new(), &state)
        .await
        .unwrap_err();
    assert!(diags.to_string().contains("Error deleting wlan"));
}

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
async fn test_import_reads_from_parsed_site() {
    let client = Arc::new(FakeController::default());
    client.seed("site-a", wlan_object("abc123", "imported"));
    let wlans = WlanController::new("wlan", context(&client), all_verbs());

    let state = wlans
        .import(&CancellationToken::new(), "site-a:abc123")
        .await
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(state.id, "abc123");
    assert_eq!(state.site(), "site-a");
    assert_eq!(state.name, "imported");
}

#[tokio::test]
async fn test_import_malformed_id_is_reported() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs());

    for bad in ["abc123", "a:b:c", ":abc123"] {
        let diags = wlans
            .import(&CancellationToken::new(), bad)
            .await
            .unwrap_err();
        assert!(diags.has_error(), "no error for {:?}", bad);
    }
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_import_missing_object_is_gone() {
    let client = Arc::new(FakeController::default());
    let wlans = WlanController::new("wlan", context(&client), all_verbs());

    let outcome = wlans
        .import(&CancellationToken::new(), "default:nope")
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Gone);
}

// ============================================================================
// Model round trip
// ============================================================================

#[test]
fn test_model_round_trip() {
    let mut model = WlanModel::new("guest");
    model.vlan = Some(42);
    model.site = Some("lab".to_string());

    let mut raised = model.clone();
    let diags = raised.merge_from_domain(model.to_domain().unwrap());
    assert!(diags.is_empty());

    let ignore_server_fields = |m: &WlanModel| {
        let mut m = m.clone();
        m.id.clear();
        m.iapp_key = None;
        m
    };
    assert_eq!(ignore_server_fields(&raised), ignore_server_fields(&model));
}

#[tokio::test]
async fn test_concurrent_operations_on_distinct_sites() {
    let client = Arc::new(FakeController::default());
    let wlans = Arc::new(WlanController::new("wlan", context(&client), all_verbs()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let wlans = wlans.clone();
        handles.push(tokio::spawn(async move {
            let mut plan = WlanModel::new(&format!("ssid-{}", i));
            plan.site = Some(format!("site-{}", i));
            let config = config_for(&plan);
            wlans
                .create(&CancellationToken::new(), &config, plan)
                .await
                .map(|s| (s.site().to_string(), s.id))
        }));
    }

    let mut created = HashMap::new();
    for handle in handles {
        let (site, id) = handle.await.unwrap().unwrap();
        created.insert(site, id);
    }
    assert_eq!(created.len(), 8);
    for (site, id) in created {
        assert!(client.stored(&site, &id).is_some());
    }
}
