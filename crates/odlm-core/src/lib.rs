//! # odlm-core
//!
//! Resource model shared by every crate of the operand lifecycle manager:
//! object identity, the three administrator/consumer kinds (registry, config,
//! request), the observed package-manager kinds (subscription, installed
//! version, install plan), the phase and verdict enums, and the watch event bus.

pub mod error;
pub mod events;
pub mod meta;
pub mod resources;
pub mod status;

pub use error::{CoreError, Result};
pub use meta::{Kind, ObjectKey, ObjectMeta, ObjectRef, Resource};
pub use resources::{
    Approval, ClusterServiceVersion, ConfigService, CsvPhase, CsvStatus, InstallPlan,
    InstallPlanPhase, InstallPlanSpec, InstallPlanStatus, OperandConfig, OperandConfigSpec,
    OperandConfigStatus, OperandEntry, OperandRegistry, OperandRegistrySpec, OperandRequest,
    OperandRequestSpec, RequestEntry, Scope, ServiceStatus, Subscription, SubscriptionSpec,
    SubscriptionStatus,
};
pub use status::{Phase, Verdict};

/// Label stamped on every subscription created by the provisioning driver.
pub const MANAGED_LABEL: &str = "odlm.io/managed";

/// Label recording which registry (`<namespace>.<name>`) a subscription was provisioned for.
pub const REGISTRY_LABEL: &str = "odlm.io/registry";
