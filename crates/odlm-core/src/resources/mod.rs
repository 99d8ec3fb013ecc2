//! Typed resources.
//!
//! - [`registry`]: `OperandRegistry`, the catalog of operand definitions
//! - [`config`]: `OperandConfig`, per-operand overrides and the aggregate status
//! - [`request`]: `OperandRequest`, a consumer's declaration of needed operands
//! - [`olm`]: the package-manager kinds that are observed but never written
//!   past creation (`Subscription`, `ClusterServiceVersion`, `InstallPlan`)

macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl $crate::meta::Resource for $ty {
            const KIND: $crate::meta::Kind = $kind;

            fn metadata(&self) -> &$crate::meta::ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub mod config;
pub mod olm;
pub mod registry;
pub mod request;

pub use config::{ConfigService, OperandConfig, OperandConfigSpec, OperandConfigStatus, ServiceStatus};
pub use olm::{
    ClusterServiceVersion, CsvPhase, CsvStatus, InstallPlan, InstallPlanPhase, InstallPlanSpec,
    InstallPlanStatus, Subscription, SubscriptionSpec, SubscriptionStatus,
};
pub use registry::{Approval, OperandEntry, OperandRegistry, OperandRegistrySpec, Scope};
pub use request::{OperandRequest, OperandRequestSpec, RequestEntry};
