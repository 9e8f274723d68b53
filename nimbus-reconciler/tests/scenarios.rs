//! End-to-end reconcile scenarios against the in-memory fake cloud.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    FakeCloud, Op, PRIVATE_CLUSTER, PUBLIC_CLUSTER, Script, cluster_scope, config, init_tracing,
    owned_tags, vendor_error,
};
use nimbus_reconciler::conditions::{
    ConditionState, LOAD_BALANCERS_READY, PRIVATE_DNS_LINK_READY, PRIVATE_DNS_RECORD_READY,
    PRIVATE_DNS_ZONE_READY, REASON_DELETED, VNET_READY,
};
use nimbus_reconciler::future::FutureType;
use nimbus_reconciler::models::{
    LoadBalancer, ProbeProtocol, Resource, TransportProtocol, VirtualNetwork,
};
use nimbus_reconciler::resource_id;
use nimbus_reconciler::scope::FutureScope;
use nimbus_reconciler::services::loadbalancers::{self, HTTPS_PROBE, LB_RULE_HTTPS};
use nimbus_reconciler::services::privatedns::{self, LINK_SERVICE_NAME};
use nimbus_reconciler::services::virtualnetworks::{self, VnetScope};
use nimbus_reconciler::services::ServiceReconciler;
use nimbus_reconciler::{ClusterScope, ReconcileContext, ReconcileError};

fn lb_id(name: &str) -> String {
    resource_id::resource_id("123", "my-rg", resource_id::LOAD_BALANCERS, name)
}

fn as_lb(resource: Resource) -> LoadBalancer {
    match resource {
        Resource::LoadBalancer(lb) => lb,
        other => panic!("expected a load balancer, got {}", other.kind()),
    }
}

#[tokio::test]
async fn test_create_public_api_server_lb_from_empty() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let service = loadbalancers::Service::new(scope.clone(), cloud.clone());

    service.reconcile(&ReconcileContext::background()).await.unwrap();

    assert_eq!(cloud.count(Op::Put, "my-publiclb"), 1);
    assert_eq!(cloud.if_matches("my-publiclb"), vec![None]);

    let lb = as_lb(cloud.resource(&lb_id("my-publiclb")).unwrap());
    assert_eq!(lb.frontend_ip_configurations.len(), 1);
    assert!(lb.frontend_ip_configurations[0]
        .public_ip_address
        .as_ref()
        .unwrap()
        .id
        .ends_with("/publicIPAddresses/pip-my-cluster-apiserver"));
    assert_eq!(lb.backend_address_pools.len(), 1);
    assert_eq!(lb.backend_address_pools[0].name, "my-publiclb-backendPool");

    assert_eq!(lb.load_balancing_rules.len(), 1);
    let rule = &lb.load_balancing_rules[0];
    assert_eq!(rule.name, LB_RULE_HTTPS);
    assert_eq!(rule.protocol, TransportProtocol::Tcp);
    assert_eq!(rule.frontend_port, 6443);
    assert!(rule.disable_outbound_snat);
    assert!(!rule.enable_floating_ip);

    assert_eq!(lb.probes.len(), 1);
    let probe = &lb.probes[0];
    assert_eq!(probe.name, HTTPS_PROBE);
    assert_eq!(probe.protocol, ProbeProtocol::Tcp);
    assert_eq!(probe.port, 6443);
    assert_eq!(probe.interval_in_seconds, 15);
    assert_eq!(probe.number_of_probes, 4);

    assert_eq!(lb.outbound_rules.len(), 1);
    let outbound = &lb.outbound_rules[0];
    assert_eq!(
        outbound.frontend_ip_configurations[0].id,
        rule.frontend_ip_configuration.as_ref().unwrap().id
    );
    assert_eq!(
        outbound.backend_address_pool.as_ref().unwrap().id,
        rule.backend_address_pool.as_ref().unwrap().id
    );

    let status = scope.status();
    let condition = status.condition(LOAD_BALANCERS_READY).unwrap();
    assert_eq!(condition.state(), ConditionState::Ready);
}

#[tokio::test]
async fn test_update_lb_missing_probe_sends_if_match() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let service = loadbalancers::Service::new(scope.clone(), cloud.clone());
    let ctx = ReconcileContext::background();

    service.reconcile(&ctx).await.unwrap();

    // Someone removed the probe out of band.
    let mut existing = as_lb(cloud.resource(&lb_id("my-publiclb")).unwrap());
    existing.probes.clear();
    let existing = as_lb(cloud.insert(&lb_id("my-publiclb"), existing.into()));
    let etag = existing.etag.clone().unwrap();
    cloud.clear_calls();

    service.reconcile(&ctx).await.unwrap();

    assert_eq!(cloud.if_matches("my-publiclb"), vec![Some(etag)]);
    // The node outbound LB already converged.
    assert_eq!(cloud.count(Op::Put, "my-cluster"), 0);

    let updated = as_lb(cloud.resource(&lb_id("my-publiclb")).unwrap());
    assert_eq!(updated.probes.len(), 1);
    assert_eq!(updated.load_balancing_rules, existing.load_balancing_rules);
    assert_eq!(updated.frontend_ip_configurations, existing.frontend_ip_configurations);
}

const TWO_LB_CLUSTER: &str = r#"{
    "clusterName": "my-cluster",
    "subscriptionId": "123",
    "resourceGroup": "my-rg",
    "location": "westeurope",
    "network": {
        "vnet": { "name": "my-vnet", "cidrBlocks": ["10.0.0.0/8"] },
        "subnets": [{ "name": "cp-subnet", "role": "ControlPlane", "cidrBlocks": ["10.0.0.0/16"] }],
        "apiServerLb": {
            "name": "my-publiclb",
            "type": "Public",
            "frontendIps": [{ "name": "fe", "publicIp": { "name": "pip" } }]
        },
        "controlPlaneOutboundLb": {
            "name": "my-internal-lb",
            "type": "Internal",
            "subnetName": "cp-subnet",
            "frontendIps": [{ "name": "my-internal-lb-frontEnd" }]
        }
    }
}"#;

#[tokio::test]
async fn test_two_lbs_one_fails_permanently() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(TWO_LB_CLUSTER);
    let service = loadbalancers::Service::new(scope.clone(), cloud.clone());
    let ctx = ReconcileContext::background();

    // First tick: the internal LB is still provisioning.
    cloud.script(Op::Put, "my-publiclb", Script::fail(vendor_error));
    cloud.script(Op::Put, "my-internal-lb", Script::InProgress { polls: 0 });
    let err = service.reconcile(&ctx).await.unwrap_err();
    assert!(!err.is_transient());
    assert!(scope
        .get_long_running_operation_state("my-internal-lb", loadbalancers::SERVICE_NAME, FutureType::Create)
        .is_some());

    // Second tick: the internal LB finishes, the public one fails again.
    cloud.script(Op::Put, "my-publiclb", Script::fail(vendor_error));
    let err = service.reconcile(&ctx).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Vendor { status: 500, .. }));
    assert!(scope
        .get_long_running_operation_state("my-internal-lb", loadbalancers::SERVICE_NAME, FutureType::Create)
        .is_none());
    assert!(cloud.contains(&lb_id("my-internal-lb")));
    assert!(!cloud.contains(&lb_id("my-publiclb")));

    let status = scope.status();
    let condition = status.condition(LOAD_BALANCERS_READY).unwrap();
    assert_eq!(condition.state(), ConditionState::Failed);
    assert_eq!(condition.reason.as_deref(), Some("InternalServerError"));
}

#[tokio::test]
async fn test_delete_unmanaged_vnet_is_skipped() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let vnet_id = resource_id::vnet_id("123", "my-rg", "my-vnet");
    cloud.insert(
        &vnet_id,
        VirtualNetwork {
            name: "my-vnet".to_string(),
            tags: [("team", "network")].into_iter().collect(),
            ..Default::default()
        }
        .into(),
    );

    let service = virtualnetworks::Service::new(scope.clone(), cloud.clone());
    service.delete(&ReconcileContext::background()).await.unwrap();

    assert_eq!(cloud.count_op(Op::Delete), 0);
    assert!(cloud.contains(&vnet_id));
    let status = scope.status();
    assert!(status.long_running_operation_states.is_empty());
    assert!(status.condition(VNET_READY).is_none());
}

#[tokio::test]
async fn test_delete_resumes_across_ticks() {
    init_tracing();
    let cloud = FakeCloud::new();
    let vnet_id = resource_id::vnet_id("123", "my-rg", "my-vnet");
    cloud.insert(
        &vnet_id,
        VirtualNetwork {
            name: "my-vnet".to_string(),
            tags: owned_tags(),
            ..Default::default()
        }
        .into(),
    );
    cloud.script(Op::Delete, "my-vnet", Script::InProgress { polls: 1 });
    let ctx = ReconcileContext::background();

    // Tick 1: the delete is issued and its future stored.
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let err = virtualnetworks::Service::new(scope.clone(), cloud.clone())
        .delete(&ctx)
        .await
        .unwrap_err();
    assert!(err.is_operation_not_done());
    let future = err.future().cloned().unwrap();
    assert_eq!(future.future_type, FutureType::Delete);
    assert_eq!(scope.status().long_running_operation_states, vec![future.clone()]);

    // Tick 2, after a restart: the future is polled, not re-issued.
    let scope = Arc::new(ClusterScope::with_status(config(PUBLIC_CLUSTER), scope.status()));
    let err = virtualnetworks::Service::new(scope.clone(), cloud.clone())
        .delete(&ctx)
        .await
        .unwrap_err();
    assert!(err.is_operation_not_done());
    assert_eq!(scope.status().long_running_operation_states, vec![future]);

    // Tick 3: done.
    virtualnetworks::Service::new(scope.clone(), cloud.clone())
        .delete(&ctx)
        .await
        .unwrap();

    assert_eq!(cloud.count(Op::Delete, "my-vnet"), 1);
    assert_eq!(cloud.count_op(Op::IsDone), 2);
    assert!(!cloud.contains(&vnet_id));
    let status = scope.status();
    assert!(status.long_running_operation_states.is_empty());
    let condition = status.condition(VNET_READY).unwrap();
    assert_eq!(condition.reason.as_deref(), Some(REASON_DELETED));
    assert_eq!(condition.state(), ConditionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_slow_lb_put_stores_future() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let service = loadbalancers::Service::new(scope.clone(), cloud.clone());
    let ctx = ReconcileContext::background();
    cloud.script(
        Op::Put,
        "my-publiclb",
        Script::Slow {
            latency: Duration::from_secs(30),
        },
    );

    let err = service.reconcile(&ctx).await.unwrap_err();

    assert!(err.is_operation_not_done());
    let future = scope
        .get_long_running_operation_state("my-publiclb", loadbalancers::SERVICE_NAME, FutureType::Create)
        .unwrap();
    assert_eq!(err.future(), Some(&future));
    assert_eq!(scope.status().long_running_operation_states, vec![future]);
    assert_eq!(
        scope.status().condition(LOAD_BALANCERS_READY).unwrap().state(),
        ConditionState::InProgress
    );

    // The next tick polls the stored operation instead of sending another PUT.
    service.reconcile(&ctx).await.unwrap();
    assert_eq!(cloud.count(Op::Put, "my-publiclb"), 1);
    assert!(cloud.contains(&lb_id("my-publiclb")));
    assert!(scope.status().long_running_operation_states.is_empty());
    assert_eq!(
        scope.status().condition(LOAD_BALANCERS_READY).unwrap().state(),
        ConditionState::Ready
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_vnet_delete_stores_future() {
    init_tracing();
    let cloud = FakeCloud::new();
    let vnet_id = resource_id::vnet_id("123", "my-rg", "my-vnet");
    cloud.insert(
        &vnet_id,
        VirtualNetwork {
            name: "my-vnet".to_string(),
            tags: owned_tags(),
            ..Default::default()
        }
        .into(),
    );
    cloud.script(
        Op::Delete,
        "my-vnet",
        Script::Slow {
            latency: Duration::from_secs(30),
        },
    );
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let service = virtualnetworks::Service::new(scope.clone(), cloud.clone());
    let ctx = ReconcileContext::background();

    let err = service.delete(&ctx).await.unwrap_err();

    assert!(err.is_operation_not_done());
    assert!(scope
        .get_long_running_operation_state("my-vnet", virtualnetworks::SERVICE_NAME, FutureType::Delete)
        .is_some());
    assert_eq!(
        scope.status().condition(VNET_READY).unwrap().state(),
        ConditionState::InProgress
    );

    service.delete(&ctx).await.unwrap();
    assert_eq!(cloud.count(Op::Delete, "my-vnet"), 1);
    assert!(!cloud.contains(&vnet_id));
    assert!(scope.status().long_running_operation_states.is_empty());
}

#[tokio::test]
async fn test_private_dns_link_failure_outranks_in_progress_link() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PRIVATE_CLUSTER);
    cloud.script(Op::Put, "my-vnet-link", Script::InProgress { polls: 3 });
    cloud.script(Op::Put, "hub-vnet-link", Script::fail(vendor_error));

    let service = privatedns::Service::new(scope.clone(), cloud.clone());
    let err = service
        .reconcile(&ReconcileContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Vendor { .. }));
    assert!(scope
        .get_long_running_operation_state("my-vnet-link", LINK_SERVICE_NAME, FutureType::Create)
        .is_some());

    let status = scope.status();
    assert_eq!(
        status.condition(PRIVATE_DNS_ZONE_READY).unwrap().state(),
        ConditionState::Ready
    );
    assert_eq!(
        status.condition(PRIVATE_DNS_LINK_READY).unwrap().state(),
        ConditionState::Failed
    );
    // Records wait for the links.
    assert!(status.condition(PRIVATE_DNS_RECORD_READY).is_none());
    assert_eq!(cloud.count(Op::Put, "apiserver"), 0);
}

#[tokio::test]
async fn test_vnet_create_copies_back_into_scope() {
    init_tracing();
    let cloud = FakeCloud::new();
    let scope = cluster_scope(PUBLIC_CLUSTER);
    let service = virtualnetworks::Service::new(scope.clone(), cloud.clone());

    service.reconcile(&ReconcileContext::background()).await.unwrap();

    let network = scope.network();
    assert_eq!(
        network.vnet.id.as_deref(),
        Some(resource_id::vnet_id("123", "my-rg", "my-vnet").as_str())
    );
    assert!(network.vnet.tags.has_owned("my-cluster"));
    assert_eq!(network.subnets[1].cidr_blocks, vec!["10.1.0.0/16"]);
    assert!(scope.vnet_spec().additional_tags.has_owned("my-cluster"));
    assert_eq!(
        scope.status().condition(VNET_READY).unwrap().state(),
        ConditionState::Ready
    );
}
