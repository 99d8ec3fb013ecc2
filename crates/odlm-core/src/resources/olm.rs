//! Package-manager kinds.
//!
//! The controller creates subscriptions (and may patch their channel/source);
//! everything else here is created and advanced by the package manager and is
//! only read.

use serde::{Deserialize, Serialize};

use crate::meta::{Kind, ObjectMeta, ObjectRef};
use crate::resources::registry::Approval;

// ============================================================================
// Subscription
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Package name.
    pub name: String,
    pub channel: String,
    pub source: String,
    pub source_namespace: String,
    #[serde(default)]
    pub install_plan_approval: Approval,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// Installed version produced by this subscription.
    #[serde(
        default,
        rename = "installedCSV",
        skip_serializing_if = "Option::is_none"
    )]
    pub installed_csv: Option<String>,
    #[serde(default, rename = "currentCSV", skip_serializing_if = "Option::is_none")]
    pub current_csv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_plan_ref: Option<ObjectRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub metadata: ObjectMeta,
    pub spec: SubscriptionSpec,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

impl_resource!(Subscription, Kind::Subscription);

impl Subscription {
    /// Reference to the installed version, if the subscription reports one.
    pub fn installed_version(&self) -> Option<&str> {
        self.status
            .installed_csv
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

// ============================================================================
// ClusterServiceVersion (installed version)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CsvPhase {
    Pending,
    InstallReady,
    Installing,
    Succeeded,
    Failed,
    Replacing,
    Deleting,
    /// Any phase this controller does not know; treated as in flight.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<CsvPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterServiceVersion {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub status: CsvStatus,
}

impl_resource!(ClusterServiceVersion, Kind::ClusterServiceVersion);

impl ClusterServiceVersion {
    /// Failure description surfaced verbatim in the operand status.
    pub fn failure_reason(&self) -> String {
        match (&self.status.reason, &self.status.message) {
            (Some(reason), Some(message)) => format!("{reason}: {message}"),
            (Some(reason), None) => reason.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => format!("installed version {} failed", self.metadata.name),
        }
    }
}

// ============================================================================
// InstallPlan
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallPlanPhase {
    Planning,
    RequiresApproval,
    Installing,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlanSpec {
    #[serde(default)]
    pub approval: Approval,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub cluster_service_version_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlanStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<InstallPlanPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallPlan {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: InstallPlanSpec,
    #[serde(default)]
    pub status: InstallPlanStatus,
}

impl_resource!(InstallPlan, Kind::InstallPlan);
