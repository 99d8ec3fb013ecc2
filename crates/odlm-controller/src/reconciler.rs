//! One reconcile pass for one config key.
//!
//! A pass reads everything fresh, in order: config, requests, registry,
//! subscriptions (provisioning), installation chains (readiness), and ends
//! with a single conditional status write. Nothing is cached between passes
//! except the previous status carried by the config itself.

use std::collections::{BTreeMap, BTreeSet};

use odlm_core::{Kind, ObjectKey, OperandConfig, OperandEntry, Phase, ServiceStatus, Verdict};
use odlm_storage::{TypedStore, Versioned};
use tracing::{debug, info, warn};

use crate::aggregate::{WriteOutcome, build_status, write_status};
use crate::error::{ReconcileError, ResolveError};
use crate::provision::ProvisioningDriver;
use crate::readiness::{evaluate, hold_failure, observe};
use crate::registry::{RegistryResolver, ResolvedRegistry};
use crate::request::{RequestResolver, ResolvedRequests};

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Status was already up to date; nothing was written.
    Converged,
    /// Status was written.
    Updated,
    /// The config no longer exists. Not an error.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub phase: Option<Phase>,
    /// Every key this pass read on behalf of the config.
    pub watched: BTreeSet<ObjectKey>,
}

impl PassReport {
    fn aborted() -> Self {
        Self {
            outcome: PassOutcome::Aborted,
            phase: None,
            watched: BTreeSet::new(),
        }
    }
}

/// Statuses computed for the operands of one config.
#[derive(Default)]
struct Assessment {
    services: BTreeMap<String, ServiceStatus>,
    message: Option<String>,
    watched: BTreeSet<ObjectKey>,
    provisioning_failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    store: TypedStore,
    registries: RegistryResolver,
    requests: RequestResolver,
    driver: ProvisioningDriver,
    conflict_retries: u32,
}

impl Reconciler {
    pub fn new(store: TypedStore, conflict_retries: u32) -> Self {
        Self {
            registries: RegistryResolver::new(store.clone()),
            requests: RequestResolver::new(store.clone()),
            driver: ProvisioningDriver::new(store.clone()),
            store,
            conflict_retries,
        }
    }

    pub fn store(&self) -> &TypedStore {
        &self.store
    }

    /// Runs a pass, re-running it from fresh reads when the status write
    /// loses a version conflict.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<PassReport, ReconcileError> {
        let key = key.with_kind(Kind::OperandConfig);
        let mut attempts = 0;
        loop {
            match self.pass(&key).await {
                Err(ReconcileError::Storage(e)) if e.is_version_conflict() => {
                    attempts += 1;
                    if attempts > self.conflict_retries {
                        return Err(ReconcileError::ConflictRetriesExhausted {
                            key: key.to_string(),
                            attempts,
                        });
                    }
                    debug!(config = %key, attempts, "Status write conflicted, re-running pass");
                }
                other => return other,
            }
        }
    }

    async fn pass(&self, key: &ObjectKey) -> Result<PassReport, ReconcileError> {
        let config = match self.store.get::<OperandConfig>(key).await? {
            Some(config) if !config.object.metadata.is_being_deleted() => config,
            _ => {
                debug!(config = %key, "Config is gone, aborting pass");
                return Ok(PassReport::aborted());
            }
        };

        let demand = self.requests.resolve(key).await?;
        let registry = match self.registries.resolve(key).await {
            Err(ResolveError::Storage(e)) => return Err(e.into()),
            other => other,
        };
        let registry_generation = registry.as_ref().map(|r| r.generation).unwrap_or(0);
        let previous = &config.object.status;
        let generations_unchanged = previous.observed_generation == config.generation
            && previous.observed_registry_generation == registry_generation;

        let mut assessment = Assessment {
            watched: demand.requests.clone(),
            ..Default::default()
        };
        if !demand.is_empty() {
            match &registry {
                Ok(registry) => {
                    self.assess(&config, registry, &demand, generations_unchanged, &mut assessment)
                        .await?;
                }
                Err(e) => {
                    warn!(config = %key, error = %e, "Registry unusable for active requests");
                    for name in demand.names() {
                        assessment.services.insert(
                            name.to_string(),
                            ServiceStatus::new(Verdict::Failed).with_reason(e.to_string()),
                        );
                    }
                    assessment.message = Some(e.to_string());
                }
            }
        }

        let status = build_status(
            assessment.services,
            assessment.message,
            config.generation,
            registry_generation,
        );
        let phase = status.phase;
        let outcome = match write_status(&self.store, &config, status).await {
            Ok(WriteOutcome::Unchanged) => PassOutcome::Converged,
            Ok(WriteOutcome::Written { .. }) => {
                if previous.phase != phase {
                    info!(config = %key, from = %previous.phase, phase = %phase, "Config phase changed");
                }
                PassOutcome::Updated
            }
            Err(e) if e.is_not_found() => {
                debug!(config = %key, "Config deleted during pass");
                return Ok(PassReport::aborted());
            }
            Err(e) => return Err(e.into()),
        };

        if !assessment.provisioning_failed.is_empty() {
            return Err(ReconcileError::Provisioning {
                operands: assessment.provisioning_failed,
            });
        }

        Ok(PassReport {
            outcome,
            phase: Some(phase),
            watched: assessment.watched,
        })
    }

    /// Provisions and evaluates every actively requested operand.
    ///
    /// Configuration problems are recorded per operand and never stop the
    /// other operands from being evaluated.
    async fn assess(
        &self,
        config: &Versioned<OperandConfig>,
        registry: &ResolvedRegistry,
        demand: &ResolvedRequests,
        generations_unchanged: bool,
        assessment: &mut Assessment,
    ) -> Result<(), ReconcileError> {
        let key = config.key();
        for service in &config.object.spec.services {
            if !registry.contains(&service.name) {
                warn!(config = %key, operand = %service.name, "Config service is not defined in registry, ignoring");
            }
        }

        let mut eligible: Vec<&OperandEntry> = Vec::with_capacity(demand.operands.len());
        for (name, wanted) in &demand.operands {
            let Some(entry) = registry.get(name) else {
                warn!(config = %key, operand = %name, "Requested operand is not defined in registry");
                assessment.services.insert(
                    name.clone(),
                    ServiceStatus::new(Verdict::Failed).with_reason(format!(
                        "operand {name} is not defined in registry {}",
                        registry.key.to_ref()
                    )),
                );
                continue;
            };
            let denied: Vec<&str> = wanted
                .namespaces
                .iter()
                .filter(|ns| !registry.allows(entry, ns))
                .map(String::as_str)
                .collect();
            if !denied.is_empty() {
                warn!(config = %key, operand = %name, "Private operand requested from another namespace");
                assessment.services.insert(
                    name.clone(),
                    ServiceStatus::new(Verdict::Failed).with_reason(format!(
                        "operand {name} is private to namespace {}, requested from {}",
                        registry.key.namespace,
                        denied.join(", ")
                    )),
                );
                continue;
            }
            eligible.push(entry);
        }

        let report = self.driver.provision(registry, &eligible).await;
        if report.has_errors() {
            warn!(
                config = %key,
                failed = report.errors.len(),
                "Some subscriptions could not be provisioned"
            );
        }
        if !report.created.is_empty() || !report.patched.is_empty() {
            debug!(
                config = %key,
                created = ?report.created,
                patched = ?report.patched,
                "Provisioned subscriptions"
            );
        }

        let previous = &config.object.status.service_status;
        for entry in eligible {
            let name = &entry.name;
            if let Some(err) = report.error_for(name) {
                assessment.watched.insert(entry.subscription_key());
                assessment.services.insert(
                    name.clone(),
                    ServiceStatus::new(Verdict::Installing)
                        .with_reason(format!("provisioning failed: {err}")),
                );
                assessment.provisioning_failed.push(name.clone());
                continue;
            }

            let observation = observe(&self.store, entry).await?;
            assessment.watched.extend(observation.watched);
            let evaluation = hold_failure(
                evaluate(&observation.snapshot),
                previous.get(name),
                generations_unchanged,
            );
            debug!(config = %key, operand = %name, verdict = %evaluation.verdict, "Evaluated operand");
            assessment
                .services
                .insert(name.clone(), evaluation.into_status());
        }
        Ok(())
    }

    /// Writes `Phase=Failed` with `message`, keeping the per-operand map.
    ///
    /// Used when retries are exhausted or a pass fails permanently, so that
    /// every permanent failure is visible in status.
    pub async fn mark_failed(&self, key: &ObjectKey, message: &str) -> Result<(), ReconcileError> {
        let key = key.with_kind(Kind::OperandConfig);
        for _ in 0..=self.conflict_retries {
            let Some(config) = self.store.get::<OperandConfig>(&key).await? else {
                return Ok(());
            };
            let mut status = config.object.status.clone();
            status.phase = Phase::Failed;
            status.message = Some(message.to_string());
            status.observed_generation = config.generation;

            match write_status(&self.store, &config, status).await {
                Ok(_) => {
                    warn!(config = %key, reason = %message, "Config marked Failed");
                    return Ok(());
                }
                Err(e) if e.is_version_conflict() => continue,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReconcileError::ConflictRetriesExhausted {
            key: key.to_string(),
            attempts: self.conflict_retries + 1,
        })
    }
}
