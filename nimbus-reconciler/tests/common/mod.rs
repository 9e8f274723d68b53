//! Shared test utilities for nimbus-reconciler integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nimbus_reconciler::client::{AsyncOutcome, ResourceClient, TagsGetter};
use nimbus_reconciler::error::{ReconcileError, Result};
use nimbus_reconciler::future::{FutureType, ResumeToken};
use nimbus_reconciler::models::Resource;
use nimbus_reconciler::spec::ResourceSpec;
use nimbus_reconciler::tags::{Tags, cluster_tag_key};
use nimbus_reconciler::{ClusterConfig, ClusterScope};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub const CLUSTER_NAME: &str = "my-cluster";

/// Vendor operation kinds recorded by [`FakeCloud`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Put,
    Delete,
    IsDone,
    Result,
    Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Op,
    /// Resource name, or the resume token for polls.
    pub target: String,
    pub if_match: Option<String>,
}

/// A scripted answer for the next matching call.
pub enum Script {
    /// Fail with the error built by the closure.
    Fail(Box<dyn Fn() -> ReconcileError + Send>),
    /// Accept the mutation; it completes after `polls` not-done polls.
    InProgress { polls: u32 },
    /// Accept the mutation; the vendor needs `latency` to finish it. A call
    /// budget shorter than that yields a resume token.
    Slow { latency: Duration },
}

impl Script {
    pub fn fail(f: impl Fn() -> ReconcileError + Send + 'static) -> Self {
        Script::Fail(Box::new(f))
    }
}

struct Operation {
    key: String,
    future_type: FutureType,
    remaining_polls: u32,
    /// Body to store when a create completes.
    body: Option<Resource>,
    applied: bool,
}

#[derive(Default)]
struct State {
    resources: HashMap<String, Resource>,
    scripts: HashMap<(Op, String), VecDeque<Script>>,
    operations: HashMap<String, Operation>,
    calls: Vec<Call>,
    next_etag: u64,
}

impl State {
    fn record(&mut self, op: Op, target: &str, if_match: Option<String>) {
        self.calls.push(Call {
            op,
            target: target.to_string(),
            if_match,
        });
    }

    fn script(&mut self, op: Op, name: &str) -> Option<Script> {
        self.scripts
            .get_mut(&(op, name.to_string()))
            .and_then(VecDeque::pop_front)
    }

    fn store(&mut self, key: &str, mut resource: Resource) -> Resource {
        self.next_etag += 1;
        resource.set_etag(Some(format!("etag-{}", self.next_etag)));
        if resource.id().is_none() {
            resource.set_id(key);
        }
        self.resources.insert(key.to_string(), resource.clone());
        resource
    }

    fn start(&mut self, key: &str, future_type: FutureType, body: Option<Resource>, polls: u32) -> ResumeToken {
        let token = format!("op-{}", Uuid::new_v4());
        self.operations.insert(
            token.clone(),
            Operation {
                key: key.to_string(),
                future_type,
                remaining_polls: polls,
                body,
                applied: false,
            },
        );
        ResumeToken::new(token)
    }
}

/// In-memory vendor: resources keyed by resource ID, with scriptable
/// failures and long-running operations.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed an existing resource.
    pub fn insert(&self, resource_id: &str, resource: Resource) -> Resource {
        self.state.lock().unwrap().store(resource_id, resource)
    }

    pub fn resource(&self, resource_id: &str) -> Option<Resource> {
        self.state.lock().unwrap().resources.get(resource_id).cloned()
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.resource(resource_id).is_some()
    }

    /// Queue a scripted answer for the next `op` on the resource `name`.
    pub fn script(&self, op: Op, name: &str, script: Script) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry((op, name.to_string()))
            .or_default()
            .push_back(script);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op, target: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.op == op && c.target == target)
            .count()
    }

    pub fn count_op(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    /// `If-Match` values sent with PUTs of `name`, in order.
    pub fn if_matches(&self, name: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == Op::Put && c.target == name)
            .map(|c| c.if_match)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl ResourceClient for FakeCloud {
    async fn get(&self, spec: &dyn ResourceSpec) -> Result<Resource> {
        let mut state = self.state.lock().unwrap();
        let name = spec.resource_name();
        state.record(Op::Get, name, None);
        if let Some(Script::Fail(f)) = state.script(Op::Get, name) {
            return Err(f());
        }
        state
            .resources
            .get(&spec.resource_id())
            .cloned()
            .ok_or_else(|| ReconcileError::NotFound(spec.resource_id()))
    }

    async fn create_or_update_async(
        &self,
        spec: &dyn ResourceSpec,
        parameters: Resource,
        if_match: Option<String>,
        budget: Duration,
    ) -> Result<AsyncOutcome<Resource>> {
        let name = spec.resource_name();
        let key = spec.resource_id();
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.record(Op::Put, name, if_match.clone());

            if let Some(expected) = &if_match {
                let current = state.resources.get(&key).and_then(|r| r.etag().map(str::to_string));
                if current.as_deref() != Some(expected.as_str()) {
                    return Err(ReconcileError::PreconditionFailed {
                        resource: key,
                        etag: if_match,
                    });
                }
            }

            match state.script(Op::Put, name) {
                Some(Script::Fail(f)) => return Err(f()),
                Some(Script::InProgress { polls }) => {
                    return Ok(AsyncOutcome::InProgress(state.start(
                        &key,
                        FutureType::Create,
                        Some(parameters),
                        polls,
                    )));
                }
                Some(Script::Slow { latency }) => latency,
                None => return Ok(AsyncOutcome::Done(state.store(&key, parameters))),
            }
        };

        tokio::time::sleep(latency.min(budget)).await;
        let mut state = self.state.lock().unwrap();
        if latency > budget {
            Ok(AsyncOutcome::InProgress(state.start(&key, FutureType::Create, Some(parameters), 0)))
        } else {
            Ok(AsyncOutcome::Done(state.store(&key, parameters)))
        }
    }

    async fn delete_async(&self, spec: &dyn ResourceSpec, budget: Duration) -> Result<AsyncOutcome<()>> {
        let name = spec.resource_name();
        let key = spec.resource_id();
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.record(Op::Delete, name, None);

            match state.script(Op::Delete, name) {
                Some(Script::Fail(f)) => return Err(f()),
                Some(Script::InProgress { polls }) => {
                    return Ok(AsyncOutcome::InProgress(state.start(&key, FutureType::Delete, None, polls)));
                }
                Some(Script::Slow { latency }) => latency,
                None => {
                    return match state.resources.remove(&key) {
                        Some(_) => Ok(AsyncOutcome::Done(())),
                        None => Err(ReconcileError::NotFound(key)),
                    };
                }
            }
        };

        tokio::time::sleep(latency.min(budget)).await;
        let mut state = self.state.lock().unwrap();
        if latency > budget {
            Ok(AsyncOutcome::InProgress(state.start(&key, FutureType::Delete, None, 0)))
        } else {
            state.resources.remove(&key);
            Ok(AsyncOutcome::Done(()))
        }
    }

    async fn is_done(&self, token: &ResumeToken) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.record(Op::IsDone, token.as_str(), None);
        if let Some(Script::Fail(f)) = state.script(Op::IsDone, token.as_str()) {
            return Err(f());
        }

        let Some(operation) = state.operations.get_mut(token.as_str()) else {
            return Err(ReconcileError::MalformedResponse(format!(
                "unknown operation {}",
                token.as_str()
            )));
        };
        if operation.remaining_polls > 0 {
            operation.remaining_polls -= 1;
            return Ok(false);
        }
        if !operation.applied {
            operation.applied = true;
            let key = operation.key.clone();
            let body = operation.body.take();
            match body {
                Some(body) => {
                    state.store(&key, body);
                }
                None => {
                    state.resources.remove(&key);
                }
            }
        }
        Ok(true)
    }

    async fn result(&self, token: &ResumeToken, future_type: FutureType) -> Result<Option<Resource>> {
        let mut state = self.state.lock().unwrap();
        state.record(Op::Result, token.as_str(), None);
        let Some(operation) = state.operations.get(token.as_str()) else {
            return Err(ReconcileError::MalformedResponse(format!(
                "unknown operation {}",
                token.as_str()
            )));
        };
        if operation.future_type != future_type {
            return Err(ReconcileError::MalformedResponse(format!(
                "operation {} is a {}",
                token.as_str(),
                operation.future_type
            )));
        }
        match future_type {
            FutureType::Create => Ok(state.resources.get(&operation.key).cloned()),
            FutureType::Delete => Ok(None),
        }
    }
}

#[async_trait]
impl TagsGetter for FakeCloud {
    async fn get_at_scope(&self, resource_id: &str) -> Result<Tags> {
        let mut state = self.state.lock().unwrap();
        state.record(Op::Tags, resource_id, None);
        state
            .resources
            .get(resource_id)
            .map(|r| r.tags().clone())
            .ok_or_else(|| ReconcileError::NotFound(resource_id.to_string()))
    }
}

// =============================================================================
// Errors
// =============================================================================

pub fn vendor_error() -> ReconcileError {
    ReconcileError::Vendor {
        status: 500,
        code: "InternalServerError".to_string(),
        message: "boom".to_string(),
    }
}

pub fn throttled() -> ReconcileError {
    ReconcileError::Throttled {
        message: "too many requests".to_string(),
        retry_after: Duration::from_secs(15),
    }
}

// =============================================================================
// Configurations
// =============================================================================

/// A public cluster: managed vnet, public API server LB, node outbound LB.
pub const PUBLIC_CLUSTER: &str = r#"{
    "clusterName": "my-cluster",
    "subscriptionId": "123",
    "resourceGroup": "my-rg",
    "location": "westeurope",
    "failureDomains": ["1", "2", "3"],
    "network": {
        "vnet": { "name": "my-vnet", "cidrBlocks": ["10.0.0.0/8"] },
        "subnets": [
            { "name": "cp-subnet", "role": "ControlPlane", "cidrBlocks": ["10.0.0.0/16"] },
            { "name": "node-subnet", "role": "Node", "cidrBlocks": ["10.1.0.0/16"], "routeTable": "node-rt" }
        ],
        "apiServerLb": {
            "name": "my-publiclb",
            "type": "Public",
            "frontendIps": [{
                "name": "my-publiclb-frontEnd",
                "publicIp": { "name": "pip-my-cluster-apiserver", "dnsName": "my-cluster.westeurope.cloudapp.example" }
            }]
        },
        "nodeOutboundLb": {
            "name": "my-cluster",
            "type": "Public",
            "frontendIps": [{ "name": "my-cluster-frontEnd", "publicIp": { "name": "pip-my-cluster-node-outbound" } }]
        }
    }
}"#;

/// A private cluster: internal API server LB, private DNS zone with one
/// extra vnet link.
pub const PRIVATE_CLUSTER: &str = r#"{
    "clusterName": "my-cluster",
    "subscriptionId": "123",
    "resourceGroup": "my-rg",
    "location": "westeurope",
    "network": {
        "vnet": { "name": "my-vnet", "cidrBlocks": ["10.0.0.0/8"] },
        "subnets": [
            { "name": "cp-subnet", "role": "ControlPlane", "cidrBlocks": ["10.0.0.0/16"] }
        ],
        "apiServerLb": {
            "name": "my-internal-lb",
            "type": "Internal",
            "subnetName": "cp-subnet",
            "frontendIps": [{ "name": "my-internal-lb-frontEnd", "privateIpAddress": "10.0.0.100" }]
        },
        "privateDnsZoneName": "my-cluster.capz.io",
        "additionalDnsVnetLinks": [
            { "vnetName": "hub-vnet", "vnetResourceGroup": "hub-rg" }
        ]
    }
}"#;

pub fn config(json: &str) -> ClusterConfig {
    ClusterConfig::from_json_str(json).expect("invalid test config")
}

pub fn cluster_scope(json: &str) -> Arc<ClusterScope> {
    Arc::new(ClusterScope::new(config(json)))
}

/// Tags marking a resource as owned by [`CLUSTER_NAME`].
pub fn owned_tags() -> Tags {
    [(cluster_tag_key(CLUSTER_NAME), "owned".to_string())]
        .into_iter()
        .collect()
}

/// Log to the test writer. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "nimbus_reconciler=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
