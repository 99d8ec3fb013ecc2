//! `OperandRegistry`: the catalog of operands available for request.

use serde::{Deserialize, Serialize};

use crate::meta::{Kind, ObjectKey, ObjectMeta};

/// Install plan approval policy handed to the package manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approval {
    #[default]
    Automatic,
    Manual,
}

/// Who may request an operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only requests in the registry's own namespace.
    Private,
    /// Requests from any namespace.
    #[default]
    Public,
}

/// One operand definition.
///
/// Fields default to empty so that a malformed entry is reported by registry
/// validation instead of failing deserialization of the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandEntry {
    #[serde(default)]
    pub name: String,
    /// Namespace the operand's subscription is created in.
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub source_namespace: String,
    #[serde(default)]
    pub install_plan_approval: Approval,
    /// Package to subscribe to; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperandEntry {
    pub fn package_name(&self) -> &str {
        self.package_name.as_deref().unwrap_or(&self.name)
    }

    /// Key of the subscription provisioned for this operand.
    pub fn subscription_key(&self) -> ObjectKey {
        ObjectKey::new(Kind::Subscription, self.namespace.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperandRegistrySpec {
    #[serde(default)]
    pub operators: Vec<OperandEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandRegistry {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: OperandRegistrySpec,
}

impl_resource!(OperandRegistry, Kind::OperandRegistry);

impl OperandRegistry {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: OperandRegistrySpec::default(),
        }
    }

    pub fn with_operator(mut self, entry: OperandEntry) -> Self {
        self.spec.operators.push(entry);
        self
    }
}
