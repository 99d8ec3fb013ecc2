//! `OperandRequest`: a consumer's declaration of the operands it needs.

use serde::{Deserialize, Serialize};

use crate::meta::{Kind, ObjectKey, ObjectMeta};

/// A set of operands requested from one registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntry {
    pub registry: String,
    /// Defaults to the request's own namespace when empty.
    #[serde(default)]
    pub registry_namespace: String,
    #[serde(default)]
    pub operands: Vec<String>,
}

impl RequestEntry {
    pub fn new(
        registry: impl Into<String>,
        registry_namespace: impl Into<String>,
        operands: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            registry: registry.into(),
            registry_namespace: registry_namespace.into(),
            operands: operands.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperandRequestSpec {
    #[serde(default)]
    pub requests: Vec<RequestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandRequest {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: OperandRequestSpec,
}

impl_resource!(OperandRequest, Kind::OperandRequest);

impl OperandRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: OperandRequestSpec::default(),
        }
    }

    pub fn with_request(mut self, entry: RequestEntry) -> Self {
        self.spec.requests.push(entry);
        self
    }

    /// Registry key an entry points at, applying the namespace default.
    pub fn registry_key(&self, entry: &RequestEntry) -> ObjectKey {
        let namespace = if entry.registry_namespace.is_empty() {
            self.metadata.namespace.clone()
        } else {
            entry.registry_namespace.clone()
        };
        ObjectKey::new(Kind::OperandRegistry, namespace, entry.registry.clone())
    }

    /// Config keys of every registry this request references.
    pub fn config_keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .spec
            .requests
            .iter()
            .map(|entry| self.registry_key(entry).with_kind(Kind::OperandConfig))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
