//! Object identity and metadata.
//!
//! Every stored object is addressed by an [`ObjectKey`]: its kind, namespace
//! and name. Cross references between objects (a request naming a registry, a
//! subscription naming its install plan) carry only the kind-less
//! [`ObjectRef`] and are resolved per reconcile pass, never held as live links.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::CoreError;

/// The resource kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    OperandRegistry,
    OperandConfig,
    OperandRequest,
    Subscription,
    ClusterServiceVersion,
    InstallPlan,
}

impl Kind {
    /// All kinds, in a stable order.
    pub const ALL: [Kind; 6] = [
        Kind::OperandRegistry,
        Kind::OperandConfig,
        Kind::OperandRequest,
        Kind::Subscription,
        Kind::ClusterServiceVersion,
        Kind::InstallPlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::OperandRegistry => "OperandRegistry",
            Kind::OperandConfig => "OperandConfig",
            Kind::OperandRequest => "OperandRequest",
            Kind::Subscription => "Subscription",
            Kind::ClusterServiceVersion => "ClusterServiceVersion",
            Kind::InstallPlan => "InstallPlan",
        }
    }

    /// Returns true for the kinds created and advanced by the package manager.
    pub fn is_observed(&self) -> bool {
        matches!(
            self,
            Kind::Subscription | Kind::ClusterServiceVersion | Kind::InstallPlan
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::unknown_kind(s))
    }
}

/// A kind-less (namespace, name) reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Full identity of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Builds a key of `kind` from a kind-less reference.
    pub fn from_ref(kind: Kind, r: &ObjectRef) -> Self {
        Self::new(kind, r.namespace.clone(), r.name.clone())
    }

    /// The same identity under another kind.
    ///
    /// Registries and configs are peers correlated by identity, so a config
    /// key maps to its registry key with `with_kind(Kind::OperandRegistry)`.
    pub fn with_kind(&self, kind: Kind) -> Self {
        Self::new(kind, self.namespace.clone(), self.name.clone())
    }

    pub fn to_ref(&self) -> ObjectRef {
        ObjectRef::new(self.namespace.clone(), self.name.clone())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

impl FromStr for ObjectKey {
    type Err = CoreError;

    /// Parses `Kind/namespace/name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(namespace), Some(name)) if !name.is_empty() => {
                Ok(Self::new(kind.parse()?, namespace, name))
            }
            _ => Err(CoreError::invalid_key(s)),
        }
    }
}

/// Standard object metadata.
///
/// `uid`, `resourceVersion` and `generation` are owned by the store; clients
/// may send them back (the store ignores everything but `resourceVersion`
/// when checking a conditional write).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default)]
    pub generation: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deletion_timestamp: Option<OffsetDateTime>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// An object marked for deletion is no longer live.
    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// A typed resource stored as a JSON document.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: Kind;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        let meta = self.metadata();
        ObjectKey::new(Self::KIND, meta.namespace.clone(), meta.name.clone())
    }

    /// Serializes the resource with its `kind` discriminator.
    fn to_object(&self) -> crate::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        match value.as_object_mut() {
            Some(obj) => {
                obj.insert(
                    "kind".to_string(),
                    serde_json::Value::String(Self::KIND.as_str().to_string()),
                );
                Ok(value)
            }
            None => Err(CoreError::invalid_object(format!(
                "{} did not serialize to an object",
                Self::KIND
            ))),
        }
    }

    fn from_object(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
