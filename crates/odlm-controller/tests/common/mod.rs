//! Shared harness for controller integration tests.
//!
//! Runs a full [`Controller`] against an evented in-memory store and plays the
//! package manager by writing subscription, installed-version and install-plan
//! objects directly.

#![allow(dead_code)]

pub mod faults;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use odlm_controller::config::{ControllerSettings, RetrySettings};
use odlm_controller::Controller;
use odlm_core::events::EventBus;
use odlm_core::{
    Approval, ClusterServiceVersion, CsvPhase, CsvStatus, InstallPlan, InstallPlanPhase,
    InstallPlanSpec, InstallPlanStatus, Kind, ObjectKey, ObjectMeta, ObjectRef, OperandConfig,
    OperandConfigStatus, OperandEntry, OperandRegistry, OperandRequest, Phase, RequestEntry,
    Scope, Subscription,
};
use odlm_db_memory::InMemoryStore;
use odlm_storage::{DynStore, EventedStore, ResourceStore, TypedStore};

pub const REGISTRY_NS: &str = "ibm-common-services";
pub const REGISTRY_NAME: &str = "common-service";
pub const REQUEST_NS: &str = "ibm-cloudpak";
pub const REQUEST_NAME: &str = "ibm-cloudpak-name";
pub const OPERATOR_NS: &str = "ibm-operators";
pub const VERSION: &str = "0.0.1";

pub const WAIT: Duration = Duration::from_secs(10);
pub const POLL: Duration = Duration::from_millis(20);

/// Polls `check` until it yields a value or `timeout` passes.
pub async fn eventually<T, F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return Some(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}

pub fn entry(name: &str) -> OperandEntry {
    OperandEntry {
        name: name.to_string(),
        namespace: OPERATOR_NS.to_string(),
        channel: "singlenamespace-alpha".to_string(),
        source_name: "community-operators".to_string(),
        source_namespace: "openshift-marketplace".to_string(),
        install_plan_approval: Approval::Automatic,
        scope: Scope::Public,
        ..Default::default()
    }
}

pub fn config_key() -> ObjectKey {
    ObjectKey::new(Kind::OperandConfig, REGISTRY_NS, REGISTRY_NAME)
}

pub fn csv_name(operand: &str) -> String {
    format!("{operand}-csv.v{VERSION}")
}

pub fn plan_name(operand: &str) -> String {
    format!("{operand}-install-plan")
}

pub fn settings() -> ControllerSettings {
    ControllerSettings {
        workers: 2,
        pass_timeout_ms: 5_000,
        ..Default::default()
    }
}

pub fn retry(max_retries: u32) -> RetrySettings {
    RetrySettings {
        base_delay_ms: 10,
        max_delay_ms: 200,
        max_retries,
    }
}

pub struct Harness {
    pub store: TypedStore,
    pub controller: Controller,
}

impl Harness {
    /// Starts a controller with short timings.
    pub async fn start() -> Self {
        Self::start_on(InMemoryStore::new(), settings(), retry(5)).await
    }

    /// Starts a controller over `inner`, which sits below the event layer.
    pub async fn start_on<S: ResourceStore + 'static>(
        inner: S,
        settings: ControllerSettings,
        retry: RetrySettings,
    ) -> Self {
        let bus = EventBus::new_shared();
        let raw: DynStore = Arc::new(EventedStore::new(inner, Arc::clone(&bus)));
        let controller = Controller::new(Arc::clone(&raw), bus, &settings, &retry);
        controller.start().await.expect("controller starts");
        Self {
            store: TypedStore::new(raw),
            controller,
        }
    }

    pub async fn shutdown(self) {
        self.controller.shutdown().await;
    }

    pub async fn create_registry(&self, operands: &[&str]) {
        let registry = operands
            .iter()
            .fold(OperandRegistry::new(REGISTRY_NS, REGISTRY_NAME), |r, name| {
                r.with_operator(entry(name))
            });
        self.store.create(&registry).await.expect("create registry");
    }

    pub async fn create_config(&self) {
        self.store
            .create(&OperandConfig::new(REGISTRY_NS, REGISTRY_NAME))
            .await
            .expect("create config");
    }

    pub async fn create_request(&self, operands: &[&str]) {
        let request = OperandRequest::new(REQUEST_NS, REQUEST_NAME).with_request(
            RequestEntry::new(REGISTRY_NAME, REGISTRY_NS, operands.iter().copied()),
        );
        self.store.create(&request).await.expect("create request");
    }

    pub async fn delete_request(&self) {
        self.store
            .delete(&ObjectKey::new(Kind::OperandRequest, REQUEST_NS, REQUEST_NAME))
            .await
            .expect("delete request");
    }

    pub async fn config(&self) -> Option<(String, OperandConfigStatus)> {
        self.store
            .get::<OperandConfig>(&config_key())
            .await
            .expect("read config")
            .map(|c| (c.resource_version, c.object.status))
    }

    pub async fn status(&self) -> OperandConfigStatus {
        self.config().await.expect("config exists").1
    }

    /// Waits until the config reaches `phase` and returns its status.
    pub async fn wait_for_phase(&self, phase: Phase) -> OperandConfigStatus {
        let found = eventually(WAIT, POLL, || async move {
            let status = self.status().await;
            (status.phase == phase).then_some(status)
        })
        .await;
        match found {
            Some(status) => status,
            None => panic!(
                "config never reached {phase}, last status: {:?}",
                self.status().await
            ),
        }
    }

    /// Waits until `check` holds for the config status.
    pub async fn wait_for_status(
        &self,
        what: &str,
        check: impl Fn(&OperandConfigStatus) -> bool,
    ) -> OperandConfigStatus {
        let check = &check;
        let found = eventually(WAIT, POLL, || async move {
            let status = self.status().await;
            check(&status).then_some(status)
        })
        .await;
        match found {
            Some(status) => status,
            None => panic!("{what} never held, last status: {:?}", self.status().await),
        }
    }

    pub async fn wait_for_subscription(&self, operand: &str) -> Subscription {
        let key = &ObjectKey::new(Kind::Subscription, OPERATOR_NS, operand);
        let found = eventually(WAIT, POLL, || async move {
            self.store
                .get::<Subscription>(key)
                .await
                .expect("read subscription")
                .map(|s| s.object)
        })
        .await;
        found.unwrap_or_else(|| panic!("subscription {operand} was never created"))
    }

    // ------------------------------------------------------------------
    // Package manager
    // ------------------------------------------------------------------

    /// Creates the installed version and install plan of `operand`, then
    /// points its subscription at them.
    pub async fn install(&self, operand: &str, csv_phase: CsvPhase, plan_phase: InstallPlanPhase) {
        let subscription = self.wait_for_subscription(operand).await;

        let plan = InstallPlan {
            metadata: ObjectMeta::new(OPERATOR_NS, plan_name(operand)),
            spec: InstallPlanSpec {
                approval: Approval::Automatic,
                approved: true,
                cluster_service_version_names: vec![csv_name(operand)],
            },
            status: InstallPlanStatus {
                phase: Some(plan_phase),
                message: None,
            },
        };
        self.store.create(&plan).await.expect("create install plan");

        let csv = ClusterServiceVersion {
            metadata: ObjectMeta::new(OPERATOR_NS, csv_name(operand)),
            spec: serde_json::json!({}),
            status: CsvStatus {
                phase: Some(csv_phase),
                ..Default::default()
            },
        };
        self.store.create(&csv).await.expect("create csv");

        let mut subscription = subscription;
        subscription.status.installed_csv = Some(csv_name(operand));
        subscription.status.current_csv = Some(csv_name(operand));
        subscription.status.state = Some("AtLatestKnown".to_string());
        subscription.status.install_plan_ref = Some(ObjectRef::new(OPERATOR_NS, plan_name(operand)));
        self.store
            .update(&subscription, None)
            .await
            .expect("update subscription status");
    }

    pub async fn set_csv_phase(&self, operand: &str, phase: CsvPhase, reason: Option<&str>) {
        let key = ObjectKey::new(Kind::ClusterServiceVersion, OPERATOR_NS, csv_name(operand));
        let mut csv = self
            .store
            .get::<ClusterServiceVersion>(&key)
            .await
            .expect("read csv")
            .expect("csv exists")
            .object;
        csv.status.phase = Some(phase);
        csv.status.reason = reason.map(str::to_string);
        self.store.update(&csv, None).await.expect("update csv");
    }

    pub async fn set_plan_phase(&self, operand: &str, phase: InstallPlanPhase) {
        let key = ObjectKey::new(Kind::InstallPlan, OPERATOR_NS, plan_name(operand));
        let mut plan = self
            .store
            .get::<InstallPlan>(&key)
            .await
            .expect("read install plan")
            .expect("install plan exists")
            .object;
        plan.status.phase = Some(phase);
        self.store.update(&plan, None).await.expect("update install plan");
    }
}
