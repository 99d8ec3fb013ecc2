//! `OperandConfig`: per-operand overrides plus the aggregate readiness status.
//!
//! A config is the peer of the registry with the same namespace and name. The
//! two are correlated by identity only; neither owns the other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::meta::{Kind, ObjectMeta};
use crate::status::{Phase, Verdict};

/// Desired custom-resource overrides for one operand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigService {
    pub name: String,
    #[serde(default)]
    pub spec: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperandConfigSpec {
    #[serde(default)]
    pub services: Vec<ConfigService>,
}

/// Per-operand status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Installed version the verdict was computed against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
}

impl ServiceStatus {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            reason: None,
            installed_version: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_installed_version(mut self, version: Option<String>) -> Self {
        self.installed_version = version;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandConfigStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_status: BTreeMap<String, ServiceStatus>,
    /// Config-wide reason, set when the phase is not explained per operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub observed_registry_generation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandConfig {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: OperandConfigSpec,
    #[serde(default)]
    pub status: OperandConfigStatus,
}

impl_resource!(OperandConfig, Kind::OperandConfig);

impl OperandConfig {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: OperandConfigSpec::default(),
            status: OperandConfigStatus::default(),
        }
    }

    pub fn with_service(mut self, name: impl Into<String>, spec: serde_json::Value) -> Self {
        let spec = match spec {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.spec.services.push(ConfigService {
            name: name.into(),
            spec,
        });
        self
    }
}
