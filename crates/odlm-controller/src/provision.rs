//! Provisioning Driver: makes sure every actively requested operand has a
//! subscription with the registry's channel and source.
//!
//! The driver creates missing subscriptions and patches drifted ones. It
//! never deletes: once nothing requests an operand, its subscription is left
//! in place and simply stops counting toward the config's phase.

use std::collections::BTreeMap;

use odlm_core::{
    MANAGED_LABEL, ObjectMeta, OperandEntry, REGISTRY_LABEL, Subscription, SubscriptionSpec,
    SubscriptionStatus,
};
use odlm_storage::{StorageError, TypedStore};
use tracing::{debug, info, warn};

use crate::registry::ResolvedRegistry;

/// What happened to one operand's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionAction {
    Created,
    Patched,
    Unchanged,
}

/// Per-pass provisioning summary. One failed operand never blocks the rest.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub created: Vec<String>,
    pub patched: Vec<String>,
    pub unchanged: Vec<String>,
    pub errors: BTreeMap<String, StorageError>,
}

impl ProvisionReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_for(&self, operand: &str) -> Option<&StorageError> {
        self.errors.get(operand)
    }
}

/// Subscription spec the registry entry asks for.
pub fn desired_spec(entry: &OperandEntry) -> SubscriptionSpec {
    SubscriptionSpec {
        name: entry.package_name().to_string(),
        channel: entry.channel.clone(),
        source: entry.source_name.clone(),
        source_namespace: entry.source_namespace.clone(),
        install_plan_approval: entry.install_plan_approval,
    }
}

/// Drift is judged on the package, channel and source only.
fn is_drifted(current: &SubscriptionSpec, desired: &SubscriptionSpec) -> bool {
    current.name != desired.name
        || current.channel != desired.channel
        || current.source != desired.source
        || current.source_namespace != desired.source_namespace
}

#[derive(Debug, Clone)]
pub struct ProvisioningDriver {
    store: TypedStore,
}

impl ProvisioningDriver {
    pub fn new(store: TypedStore) -> Self {
        Self { store }
    }

    /// Ensures one operand's subscription. Idempotent.
    pub async fn ensure(
        &self,
        registry: &ResolvedRegistry,
        entry: &OperandEntry,
    ) -> Result<ProvisionAction, StorageError> {
        let key = entry.subscription_key();
        let desired = desired_spec(entry);

        match self.store.get::<Subscription>(&key).await? {
            None => {
                let subscription = Subscription {
                    metadata: ObjectMeta::new(&entry.namespace, &entry.name)
                        .with_label(REGISTRY_LABEL, registry.label_value())
                        .with_label(MANAGED_LABEL, "true"),
                    spec: desired,
                    status: SubscriptionStatus::default(),
                };
                match self.store.create(&subscription).await {
                    Ok(_) => {
                        info!(subscription = %key, channel = %entry.channel, "Created subscription");
                        Ok(ProvisionAction::Created)
                    }
                    // Lost a create race; the winner's spec is checked next pass.
                    Err(e) if e.is_already_exists() => Ok(ProvisionAction::Unchanged),
                    Err(e) => Err(e),
                }
            }
            Some(current) if is_drifted(&current.object.spec, &desired) => {
                let mut patched = current.object.clone();
                debug!(
                    subscription = %key,
                    from = %patched.spec.channel,
                    to = %desired.channel,
                    "Subscription drifted from registry"
                );
                patched.spec = desired;
                self.store
                    .update(&patched, Some(&current.resource_version))
                    .await?;
                info!(subscription = %key, "Patched subscription");
                Ok(ProvisionAction::Patched)
            }
            Some(_) => Ok(ProvisionAction::Unchanged),
        }
    }

    /// Ensures every entry, isolating failures per operand.
    pub async fn provision(
        &self,
        registry: &ResolvedRegistry,
        entries: &[&OperandEntry],
    ) -> ProvisionReport {
        let mut report = ProvisionReport::default();
        for &entry in entries {
            match self.ensure(registry, entry).await {
                Ok(ProvisionAction::Created) => report.created.push(entry.name.clone()),
                Ok(ProvisionAction::Patched) => report.patched.push(entry.name.clone()),
                Ok(ProvisionAction::Unchanged) => report.unchanged.push(entry.name.clone()),
                Err(e) => {
                    warn!(
                        operand = %entry.name,
                        category = %e.category(),
                        error = %e,
                        "Failed to provision subscription"
                    );
                    report.errors.insert(entry.name.clone(), e);
                }
            }
        }
        report
    }
}
