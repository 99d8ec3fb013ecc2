//! Readiness Evaluator.
//!
//! The three package-manager objects behind one operand (subscription,
//! installed version, install plan) are populated at different times. They
//! are folded into a single [`InstallSnapshot`] first, and the verdict is
//! computed from the snapshot alone:
//!
//! | snapshot                             | verdict      |
//! |--------------------------------------|--------------|
//! | `Absent`                             | `NotStarted` |
//! | `Subscribed`                         | `Installing` |
//! | `VersionFailed`                      | `Failed`     |
//! | `VersionPending`                     | `Installing` |
//! | `VersionSucceeded`, plan not Complete| `Installing` |
//! | `VersionSucceeded`, plan Failed      | `Failed`     |
//! | `VersionSucceeded`, plan Complete    | `Ready`      |
//!
//! A version can report Succeeded before its install plan catches up, so
//! both are required for `Ready`.

use odlm_core::{
    ClusterServiceVersion, CsvPhase, InstallPlan, InstallPlanPhase, Kind, ObjectKey, OperandEntry,
    ServiceStatus, Subscription, Verdict,
};
use odlm_storage::{StorageError, TypedStore};

/// Folded view of one operand's installation chain.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallSnapshot {
    /// No subscription yet.
    Absent,
    /// Subscribed, but no installed version reported.
    Subscribed { subscription: Subscription },
    /// The installed version is named but missing or still in flight.
    VersionPending {
        installed_version: String,
        csv: Option<ClusterServiceVersion>,
    },
    VersionFailed {
        installed_version: String,
        reason: String,
    },
    VersionSucceeded {
        installed_version: String,
        plan: Option<InstallPlan>,
    },
}

impl InstallSnapshot {
    /// Folds whatever objects currently exist into a snapshot.
    pub fn fold(
        subscription: Option<Subscription>,
        csv: Option<ClusterServiceVersion>,
        plan: Option<InstallPlan>,
    ) -> Self {
        let Some(subscription) = subscription else {
            return Self::Absent;
        };
        let Some(installed_version) = subscription.installed_version().map(str::to_string) else {
            return Self::Subscribed { subscription };
        };
        match csv {
            None => Self::VersionPending {
                installed_version,
                csv: None,
            },
            Some(csv) => match csv.status.phase {
                Some(CsvPhase::Failed) => Self::VersionFailed {
                    reason: csv.failure_reason(),
                    installed_version,
                },
                Some(CsvPhase::Succeeded) => Self::VersionSucceeded {
                    installed_version,
                    plan,
                },
                _ => Self::VersionPending {
                    installed_version,
                    csv: Some(csv),
                },
            },
        }
    }

    pub fn installed_version(&self) -> Option<&str> {
        match self {
            Self::Absent | Self::Subscribed { .. } => None,
            Self::VersionPending {
                installed_version, ..
            }
            | Self::VersionFailed {
                installed_version, ..
            }
            | Self::VersionSucceeded {
                installed_version, ..
            } => Some(installed_version),
        }
    }
}

/// A snapshot plus every key it was read from, present or not.
#[derive(Debug, Clone)]
pub struct Observation {
    pub snapshot: InstallSnapshot,
    pub watched: Vec<ObjectKey>,
}

/// Reads the installation chain of one operand.
pub async fn observe(store: &TypedStore, entry: &OperandEntry) -> Result<Observation, StorageError> {
    let subscription_key = entry.subscription_key();
    let mut watched = vec![subscription_key.clone()];

    let Some(subscription) = store
        .get::<Subscription>(&subscription_key)
        .await?
        .map(|v| v.object)
    else {
        return Ok(Observation {
            snapshot: InstallSnapshot::Absent,
            watched,
        });
    };

    let namespace = subscription.metadata.namespace.clone();
    let csv = match subscription.installed_version() {
        Some(name) => {
            let key = ObjectKey::new(Kind::ClusterServiceVersion, namespace.clone(), name);
            watched.push(key.clone());
            store
                .get::<ClusterServiceVersion>(&key)
                .await?
                .map(|v| v.object)
        }
        None => None,
    };

    let plan = match &subscription.status.install_plan_ref {
        Some(plan_ref) => {
            let mut key = ObjectKey::from_ref(Kind::InstallPlan, plan_ref);
            if key.namespace.is_empty() {
                key.namespace = namespace;
            }
            watched.push(key.clone());
            store.get::<InstallPlan>(&key).await?.map(|v| v.object)
        }
        None => None,
    };

    Ok(Observation {
        snapshot: InstallSnapshot::fold(Some(subscription), csv, plan),
        watched,
    })
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub reason: Option<String>,
    pub installed_version: Option<String>,
}

impl Evaluation {
    fn new(verdict: Verdict, reason: Option<String>, snapshot: &InstallSnapshot) -> Self {
        Self {
            verdict,
            reason,
            installed_version: snapshot.installed_version().map(str::to_string),
        }
    }

    pub fn into_status(self) -> ServiceStatus {
        let status = ServiceStatus::new(self.verdict).with_installed_version(self.installed_version);
        match self.reason {
            Some(reason) => status.with_reason(reason),
            None => status,
        }
    }
}

/// Computes a verdict from a snapshot.
pub fn evaluate(snapshot: &InstallSnapshot) -> Evaluation {
    let (verdict, reason): (Verdict, Option<String>) = match snapshot {
        InstallSnapshot::Absent => (Verdict::NotStarted, Some("subscription not created".into())),
        InstallSnapshot::Subscribed { subscription } => {
            let reason = match subscription.status.state.as_deref() {
                Some(state) if !state.is_empty() => {
                    format!("waiting for installed version (subscription {state})")
                }
                _ => "waiting for installed version".to_string(),
            };
            (Verdict::Installing, Some(reason))
        }
        InstallSnapshot::VersionFailed { reason, .. } => (Verdict::Failed, Some(reason.clone())),
        InstallSnapshot::VersionPending {
            installed_version,
            csv,
        } => {
            let reason = match csv.as_ref().and_then(|c| c.status.phase) {
                Some(phase) => format!("installed version {installed_version} is {phase:?}"),
                None => format!("waiting for installed version {installed_version}"),
            };
            (Verdict::Installing, Some(reason))
        }
        InstallSnapshot::VersionSucceeded { plan: None, .. } => {
            (Verdict::Installing, Some("waiting for install plan".into()))
        }
        InstallSnapshot::VersionSucceeded {
            plan: Some(plan), ..
        } => match plan.status.phase {
            Some(InstallPlanPhase::Complete) => (Verdict::Ready, None),
            Some(InstallPlanPhase::Failed) => {
                let reason = plan
                    .status
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("install plan {} failed", plan.metadata.name));
                (Verdict::Failed, Some(reason))
            }
            Some(InstallPlanPhase::RequiresApproval) => (
                Verdict::Installing,
                Some("install plan requires approval".into()),
            ),
            Some(phase) => (
                Verdict::Installing,
                Some(format!("install plan is {phase:?}")),
            ),
            None => (
                Verdict::Installing,
                Some("waiting for install plan".into()),
            ),
        },
    };
    Evaluation::new(verdict, reason, snapshot)
}

/// Keeps a recorded failure for the same installed version.
///
/// A `Failed` verdict recorded against installed version `V` stands while the
/// snapshot still names `V` and neither the config nor the registry changed
/// since. A new installed version or a spec edit clears it.
pub fn hold_failure(
    evaluation: Evaluation,
    previous: Option<&ServiceStatus>,
    generations_unchanged: bool,
) -> Evaluation {
    let Some(previous) = previous else {
        return evaluation;
    };
    let same_version = previous.installed_version.is_some()
        && previous.installed_version == evaluation.installed_version;
    if previous.verdict == Verdict::Failed
        && evaluation.verdict != Verdict::Failed
        && same_version
        && generations_unchanged
    {
        return Evaluation {
            verdict: Verdict::Failed,
            reason: previous.reason.clone(),
            installed_version: previous.installed_version.clone(),
        };
    }
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use odlm_core::{CsvStatus, InstallPlanStatus, ObjectMeta, ObjectRef, SubscriptionSpec};

    const NS: &str = "ibm-operators";

    fn subscription(installed: Option<&str>) -> Subscription {
        let mut sub = Subscription {
            metadata: ObjectMeta::new(NS, "etcd"),
            spec: SubscriptionSpec::default(),
            status: Default::default(),
        };
        sub.status.installed_csv = installed.map(str::to_string);
        sub.status.install_plan_ref = Some(ObjectRef::new(NS, "etcd-install-plan"));
        sub
    }

    fn csv(phase: CsvPhase) -> ClusterServiceVersion {
        ClusterServiceVersion {
            metadata: ObjectMeta::new(NS, "etcd-csv.v0.0.1"),
            spec: serde_json::Value::Null,
            status: CsvStatus {
                phase: Some(phase),
                reason: None,
                message: None,
            },
        }
    }

    fn plan(phase: InstallPlanPhase) -> InstallPlan {
        InstallPlan {
            metadata: ObjectMeta::new(NS, "etcd-install-plan"),
            spec: Default::default(),
            status: InstallPlanStatus {
                phase: Some(phase),
                message: None,
            },
        }
    }

    fn verdict_of(
        sub: Option<Subscription>,
        csv: Option<ClusterServiceVersion>,
        plan: Option<InstallPlan>,
    ) -> Verdict {
        evaluate(&InstallSnapshot::fold(sub, csv, plan)).verdict
    }

    #[test]
    fn test_decision_table() {
        let installed = Some("etcd-csv.v0.0.1");

        assert_eq!(verdict_of(None, None, None), Verdict::NotStarted);
        assert_eq!(verdict_of(Some(subscription(None)), None, None), Verdict::Installing);
        assert_eq!(
            verdict_of(Some(subscription(installed)), None, None),
            Verdict::Installing
        );
        assert_eq!(
            verdict_of(
                Some(subscription(installed)),
                Some(csv(CsvPhase::Installing)),
                Some(plan(InstallPlanPhase::Complete))
            ),
            Verdict::Installing
        );
        assert_eq!(
            verdict_of(
                Some(subscription(installed)),
                Some(csv(CsvPhase::Succeeded)),
                Some(plan(InstallPlanPhase::Installing))
            ),
            Verdict::Installing
        );
        assert_eq!(
            verdict_of(
                Some(subscription(installed)),
                Some(csv(CsvPhase::Succeeded)),
                Some(plan(InstallPlanPhase::Complete))
            ),
            Verdict::Ready
        );
    }

    #[test]
    fn test_version_failure_overrides_plan() {
        let snapshot = InstallSnapshot::fold(
            Some(subscription(Some("etcd-csv.v0.0.1"))),
            Some(csv(CsvPhase::Failed)),
            Some(plan(InstallPlanPhase::Complete)),
        );
        let evaluation = evaluate(&snapshot);
        assert_eq!(evaluation.verdict, Verdict::Failed);
        assert_eq!(evaluation.installed_version.as_deref(), Some("etcd-csv.v0.0.1"));
        assert_eq!(
            evaluation.reason.as_deref(),
            Some("installed version etcd-csv.v0.0.1 failed")
        );
    }

    #[test]
    fn test_succeeded_version_waits_for_plan() {
        let snapshot = InstallSnapshot::fold(
            Some(subscription(Some("etcd-csv.v0.0.1"))),
            Some(csv(CsvPhase::Succeeded)),
            None,
        );
        let evaluation = evaluate(&snapshot);
        assert_eq!(evaluation.verdict, Verdict::Installing);
        assert_eq!(evaluation.reason.as_deref(), Some("waiting for install plan"));

        let approval = InstallSnapshot::fold(
            Some(subscription(Some("etcd-csv.v0.0.1"))),
            Some(csv(CsvPhase::Succeeded)),
            Some(plan(InstallPlanPhase::RequiresApproval)),
        );
        assert_eq!(
            evaluate(&approval).reason.as_deref(),
            Some("install plan requires approval")
        );
    }

    #[test]
    fn test_failed_plan_surfaces_message() {
        let mut failed = plan(InstallPlanPhase::Failed);
        failed.status.message = Some("bundle unpacking failed".into());
        let snapshot = InstallSnapshot::fold(
            Some(subscription(Some("etcd-csv.v0.0.1"))),
            Some(csv(CsvPhase::Succeeded)),
            Some(failed),
        );
        let evaluation = evaluate(&snapshot);
        assert_eq!(evaluation.verdict, Verdict::Failed);
        assert_eq!(evaluation.reason.as_deref(), Some("bundle unpacking failed"));
    }

    #[test]
    fn test_unknown_csv_phase_is_in_flight() {
        let snapshot = InstallSnapshot::fold(
            Some(subscription(Some("etcd-csv.v0.0.1"))),
            Some(csv(CsvPhase::Unknown)),
            None,
        );
        assert!(matches!(snapshot, InstallSnapshot::VersionPending { .. }));
        assert_eq!(evaluate(&snapshot).verdict, Verdict::Installing);
    }

    #[test]
    fn test_hold_failure_for_same_version() {
        let previous = ServiceStatus::new(Verdict::Failed)
            .with_reason("install strategy failed")
            .with_installed_version(Some("etcd-csv.v0.0.1".into()));
        let ready = Evaluation {
            verdict: Verdict::Ready,
            reason: None,
            installed_version: Some("etcd-csv.v0.0.1".into()),
        };

        let held = hold_failure(ready.clone(), Some(&previous), true);
        assert_eq!(held.verdict, Verdict::Failed);
        assert_eq!(held.reason.as_deref(), Some("install strategy failed"));

        // A spec change clears it.
        assert_eq!(
            hold_failure(ready.clone(), Some(&previous), false).verdict,
            Verdict::Ready
        );

        // So does a new installed version.
        let upgraded = Evaluation {
            installed_version: Some("etcd-csv.v0.0.2".into()),
            ..ready
        };
        assert_eq!(
            hold_failure(upgraded, Some(&previous), true).verdict,
            Verdict::Ready
        );
    }

    #[test]
    fn test_hold_failure_ignores_versionless_failures() {
        let previous = ServiceStatus::new(Verdict::Failed).with_reason("not in registry");
        let not_started = evaluate(&InstallSnapshot::Absent);
        assert_eq!(
            hold_failure(not_started, Some(&previous), true).verdict,
            Verdict::NotStarted
        );
    }
}
