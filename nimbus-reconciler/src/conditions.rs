//! Status conditions written by services.
//!
//! Each service owns one condition type. A put writes `True` on success; a
//! delete writes `False` with reason `Deleted`. Transient errors keep the
//! condition in progress (severity Info), anything else marks it failed
//! (severity Error) with the error's reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

// Condition status values
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";

// Condition types
pub const VNET_READY: &str = "VNetReady";
pub const LOAD_BALANCERS_READY: &str = "LoadBalancersReady";
pub const PUBLIC_IPS_READY: &str = "PublicIPsReady";
pub const ROUTE_TABLES_READY: &str = "RouteTablesReady";
pub const PRIVATE_DNS_ZONE_READY: &str = "PrivateDNSZoneReady";
pub const PRIVATE_DNS_LINK_READY: &str = "PrivateDNSLinkReady";
pub const PRIVATE_DNS_RECORD_READY: &str = "PrivateDNSRecordReady";
pub const BASTION_HOST_READY: &str = "BastionHostReady";
pub const PRIVATE_LINKS_READY: &str = "PrivateLinksReady";

// Reasons
pub const REASON_CREATING: &str = "Creating";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_DELETED: &str = "Deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

/// Tri-state summary of a condition as the outer controller sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionState {
    Ready,
    InProgress,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConditionSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn state(&self) -> ConditionState {
        if self.status == CONDITION_TRUE || self.reason.as_deref() == Some(REASON_DELETED) {
            ConditionState::Ready
        } else if self.severity == Some(ConditionSeverity::Error) {
            ConditionState::Failed
        } else {
            ConditionState::InProgress
        }
    }
}

/// Build a condition stamped with the current time.
pub fn build_condition(
    condition_type: &str,
    status: &str,
    severity: Option<ConditionSeverity>,
    reason: Option<&str>,
    message: Option<String>,
) -> Condition {
    Condition {
        condition_type: condition_type.to_string(),
        status: status.to_string(),
        severity,
        reason: reason.map(str::to_string),
        message,
        last_transition_time: Some(Utc::now()),
    }
}

/// Condition for the outcome of a create/update.
pub fn put_condition(condition_type: &str, err: Option<&ReconcileError>) -> Condition {
    match err {
        None => build_condition(condition_type, CONDITION_TRUE, None, None, None),
        Some(e) if e.is_transient() => build_condition(
            condition_type,
            CONDITION_FALSE,
            Some(ConditionSeverity::Info),
            Some(REASON_CREATING),
            Some(e.to_string()),
        ),
        Some(e) => build_condition(
            condition_type,
            CONDITION_FALSE,
            Some(ConditionSeverity::Error),
            Some(&e.reason()),
            Some(e.to_string()),
        ),
    }
}

/// Condition for the outcome of a delete.
pub fn delete_condition(condition_type: &str, err: Option<&ReconcileError>) -> Condition {
    match err {
        None => build_condition(
            condition_type,
            CONDITION_FALSE,
            Some(ConditionSeverity::Info),
            Some(REASON_DELETED),
            None,
        ),
        Some(e) if e.is_transient() => build_condition(
            condition_type,
            CONDITION_FALSE,
            Some(ConditionSeverity::Info),
            Some(REASON_DELETING),
            Some(e.to_string()),
        ),
        Some(e) => build_condition(
            condition_type,
            CONDITION_FALSE,
            Some(ConditionSeverity::Error),
            Some(&e.reason()),
            Some(e.to_string()),
        ),
    }
}

/// Set or update a condition, preserving lastTransitionTime when the status
/// did not change.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) {
    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.condition_type == new.condition_type)
    {
        if existing.status != new.status {
            *existing = new;
        } else {
            existing.severity = new.severity;
            existing.reason = new.reason;
            existing.message = new.message;
        }
    } else {
        conditions.push(new);
    }
}

/// Look up a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.condition_type == condition_type)
}
