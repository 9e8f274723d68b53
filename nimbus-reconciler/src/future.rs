//! Long-running operation handles.
//!
//! A vendor mutation that does not complete within its call budget leaves an
//! [`OperationFuture`] behind. The future is persisted on the scope's status
//! so the next tick (possibly in another process) polls it instead of issuing
//! the mutation again. The vendor continuation token is opaque: it is stored
//! as base-64 encoded JSON and never inspected. Routing fields (type, service,
//! name, resource group) live outside the blob.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

/// The kind of mutation a future tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FutureType {
    Create,
    Delete,
}

impl fmt::Display for FutureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureType::Create => write!(f, "Create"),
            FutureType::Delete => write!(f, "Delete"),
        }
    }
}

/// Vendor-issued continuation token (JSON text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A persisted long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFuture {
    #[serde(rename = "type")]
    pub future_type: FutureType,
    #[serde(rename = "service")]
    pub service_name: String,
    pub name: String,
    pub resource_group: String,
    /// Base-64 encoded JSON continuation token.
    pub data: String,
}

impl OperationFuture {
    pub fn new(
        future_type: FutureType,
        name: &str,
        resource_group: &str,
        service_name: &str,
        token: &ResumeToken,
    ) -> Self {
        Self {
            future_type,
            service_name: service_name.to_string(),
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            data: STANDARD.encode(token.as_str().as_bytes()),
        }
    }

    /// Decode the continuation token.
    ///
    /// Fails when the data is not base-64, not UTF-8 or not JSON.
    pub fn resume_token(&self) -> Result<ResumeToken> {
        let bytes = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ReconcileError::MalformedFuture(format!("invalid base64: {}", e)))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ReconcileError::MalformedFuture(format!("invalid utf-8: {}", e)))?;
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| ReconcileError::MalformedFuture(format!("invalid json: {}", e)))?;
        Ok(ResumeToken(text))
    }

    /// True when this future tracks the given resource and service.
    pub fn matches(&self, name: &str, service_name: &str) -> bool {
        self.name == name && self.service_name == service_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ResumeToken {
        ResumeToken::new(
            r#"{"type":"AzureAsyncOperation","pollURL":"https://management.example/ops/42","state":"InProgress"}"#,
        )
    }

    #[test]
    fn test_future_serde_roundtrip() {
        let future = OperationFuture::new(FutureType::Delete, "my-vnet", "my-rg", "virtualnetworks", &token());

        let json = serde_json::to_string(&future).unwrap();
        let parsed: OperationFuture = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, future);
        assert_eq!(parsed.resume_token().unwrap(), token());
    }

    #[test]
    fn test_future_persisted_layout() {
        let future = OperationFuture::new(FutureType::Create, "pip", "rg", "publicips", &token());
        let value = serde_json::to_value(&future).unwrap();

        assert_eq!(value["type"], "Create");
        assert_eq!(value["service"], "publicips");
        assert_eq!(value["name"], "pip");
        assert_eq!(value["resourceGroup"], "rg");
        assert!(value["data"].is_string());
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_future_data_is_base64_json() {
        let future = OperationFuture::new(FutureType::Create, "pip", "rg", "publicips", &token());
        let decoded = STANDARD.decode(&future.data).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["state"], "InProgress");
    }

    #[test]
    fn test_malformed_future_data() {
        let mut future = OperationFuture::new(FutureType::Create, "pip", "rg", "publicips", &token());

        future.data = "%%% not base64".to_string();
        assert!(matches!(future.resume_token(), Err(ReconcileError::MalformedFuture(_))));

        future.data = STANDARD.encode("not json");
        assert!(matches!(future.resume_token(), Err(ReconcileError::MalformedFuture(_))));
    }

    #[test]
    fn test_matches() {
        let future = OperationFuture::new(FutureType::Create, "pip", "rg", "publicips", &token());
        assert!(future.matches("pip", "publicips"));
        assert!(!future.matches("pip", "loadbalancers"));
        assert!(!future.matches("other", "publicips"));
    }
}
