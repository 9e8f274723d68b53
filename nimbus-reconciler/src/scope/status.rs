//! Persisted scope status: long-running operation futures and conditions.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conditions::{self, Condition};
use crate::future::{FutureType, OperationFuture};

/// The status block the outer controller persists between ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeStatus {
    #[serde(default)]
    pub long_running_operation_states: Vec<OperationFuture>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ScopeStatus {
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        conditions::find_condition(&self.conditions, condition_type)
    }
}

/// Interior-mutable holder of a [`ScopeStatus`].
///
/// At most one future exists per (resource name, service name): storing a
/// future replaces any other future for the same pair, whatever its type.
#[derive(Debug, Default)]
pub struct StatusStore {
    inner: RwLock<ScopeStatus>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from persisted status.
    pub fn from_status(status: ScopeStatus) -> Self {
        Self {
            inner: RwLock::new(status),
        }
    }

    pub fn snapshot(&self) -> ScopeStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_future(&self, name: &str, service: &str, future_type: FutureType) -> Option<OperationFuture> {
        let status = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        status
            .long_running_operation_states
            .iter()
            .find(|f| f.matches(name, service) && f.future_type == future_type)
            .cloned()
    }

    pub fn set_future(&self, future: OperationFuture) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        status
            .long_running_operation_states
            .retain(|f| !f.matches(&future.name, &future.service_name));
        debug!(
            "Storing {} future for {}/{} (service: {})",
            future.future_type, future.resource_group, future.name, future.service_name
        );
        status.long_running_operation_states.push(future);
    }

    pub fn delete_future(&self, name: &str, service: &str, future_type: FutureType) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        status
            .long_running_operation_states
            .retain(|f| !(f.matches(name, service) && f.future_type == future_type));
    }

    pub fn set_condition(&self, condition: Condition) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        conditions::set_condition(&mut status.conditions, condition);
    }

    pub fn condition(&self, condition_type: &str) -> Option<Condition> {
        let status = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        status.condition(condition_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{ConditionState, VNET_READY, put_condition};
    use crate::future::ResumeToken;

    fn future(future_type: FutureType, name: &str, service: &str) -> OperationFuture {
        OperationFuture::new(future_type, name, "rg", service, &ResumeToken::new("{}"))
    }

    #[test]
    fn test_set_get_delete_future() {
        let store = StatusStore::new();
        store.set_future(future(FutureType::Create, "lb", "loadbalancers"));

        assert!(store.get_future("lb", "loadbalancers", FutureType::Create).is_some());
        assert!(store.get_future("lb", "loadbalancers", FutureType::Delete).is_none());
        assert!(store.get_future("lb", "publicips", FutureType::Create).is_none());

        store.delete_future("lb", "loadbalancers", FutureType::Create);
        assert!(store.snapshot().long_running_operation_states.is_empty());
    }

    #[test]
    fn test_at_most_one_future_per_resource_and_service() {
        let store = StatusStore::new();
        store.set_future(future(FutureType::Create, "vnet", "virtualnetworks"));
        store.set_future(future(FutureType::Delete, "vnet", "virtualnetworks"));
        store.set_future(future(FutureType::Create, "other", "virtualnetworks"));

        let status = store.snapshot();
        assert_eq!(status.long_running_operation_states.len(), 2);
        assert!(store.get_future("vnet", "virtualnetworks", FutureType::Create).is_none());
        assert!(store.get_future("vnet", "virtualnetworks", FutureType::Delete).is_some());
    }

    #[test]
    fn test_status_roundtrip_rehydrates_store() {
        let store = StatusStore::new();
        store.set_future(future(FutureType::Delete, "pip", "publicips"));
        store.set_condition(put_condition(VNET_READY, None));

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let restored = StatusStore::from_status(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), store.snapshot());
        assert!(restored.get_future("pip", "publicips", FutureType::Delete).is_some());
        assert_eq!(restored.condition(VNET_READY).unwrap().state(), ConditionState::Ready);
    }

    #[test]
    fn test_persisted_layout() {
        let store = StatusStore::new();
        store.set_future(future(FutureType::Create, "pip", "publicips"));
        let value = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(value["longRunningOperationStates"][0]["type"], "Create");
        assert!(value["conditions"].as_array().unwrap().is_empty());
    }
}
