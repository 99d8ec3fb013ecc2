//! Reconcile scheduler.
//!
//! The [`Controller`] owns a fixed pool of workers draining a deduplicating
//! [`WorkQueue`] of config keys, plus a watch pump that turns store events
//! into queue entries. A key is never processed by two workers at once;
//! unrelated keys run in parallel.
//!
//! Per key the scheduler moves through `Idle -> Queued -> Running` and then
//! back to `Idle` on success, or to `Backoff` on a transient error. After
//! `max_retries` transient failures in a row the config is marked `Failed`
//! and the key is forgotten until the next watch event touches it.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use odlm_core::events::{EventBus, WatchEvent, WatchEventType};
use odlm_core::{Kind, ObjectKey, OperandConfig, OperandRequest};
use odlm_storage::{DynStore, StorageError, TypedStore};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ControllerSettings, RetrySettings};
use crate::error::ReconcileError;
use crate::index::WatchIndex;
use crate::queue::{Backoff, WorkQueue};
use crate::reconciler::{PassOutcome, PassReport, Reconciler};

struct Inner {
    reconciler: Reconciler,
    queue: Arc<WorkQueue<ObjectKey>>,
    index: WatchIndex,
    backoff: Backoff,
    max_retries: u32,
    pass_timeout: Duration,
}

/// Watch-driven controller for every `OperandConfig` in the store.
pub struct Controller {
    inner: Arc<Inner>,
    bus: Arc<EventBus>,
    workers: usize,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(
        store: DynStore,
        bus: Arc<EventBus>,
        settings: &ControllerSettings,
        retry: &RetrySettings,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                reconciler: Reconciler::new(TypedStore::new(store), settings.conflict_retries),
                queue: WorkQueue::new_shared(),
                index: WatchIndex::new(),
                backoff: Backoff::new(retry.base_delay(), retry.max_delay()),
                max_retries: retry.max_retries,
                pass_timeout: settings.pass_timeout(),
            }),
            bus,
            workers: settings.workers.max(1),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Starts the watch pump and the worker pool.
    ///
    /// The event subscription is taken before the initial listing so that no
    /// change made during start-up is missed.
    pub async fn start(&self) -> Result<(), StorageError> {
        let events = self.bus.subscribe();
        let queued = self.inner.resync().await?;
        info!(workers = self.workers, configs = queued, "Starting controller");

        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        let pump = WatchPump {
            inner: Arc::clone(&self.inner),
            shutdown: self.shutdown_tx.subscribe(),
        };
        tasks.push(tokio::spawn(pump.run(events)));

        for id in 0..self.workers {
            let inner = Arc::clone(&self.inner);
            tasks.push(tokio::spawn(async move {
                while let Some(key) = inner.queue.get().await {
                    inner.process(&key).await;
                    inner.queue.done(&key);
                }
                debug!(worker = id, "Worker stopped");
            }));
        }
        Ok(())
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.inner.reconciler
    }

    /// Stops the pump and the workers. In-flight passes finish first.
    pub async fn shutdown(&self) {
        info!("Shutting down controller");
        let _ = self.shutdown_tx.send(true);
        self.inner.queue.shut_down();

        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Controller task failed");
            }
        }
        if !self.inner.index.is_empty() {
            debug!(configs = self.inner.index.len(), "Dropping watch index");
        }
        self.inner.index.clear();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("workers", &self.workers)
            .field("queued", &self.inner.queue.len())
            .field("indexed", &self.inner.index.len())
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Queues every config in the store.
    async fn resync(&self) -> Result<usize, StorageError> {
        let keys = self
            .reconciler
            .store()
            .list_keys(Kind::OperandConfig)
            .await?;
        let count = keys.len();
        for key in keys {
            self.queue.add(key);
        }
        Ok(count)
    }

    /// Runs one pass with timeout and panic protection.
    async fn run_pass(&self, key: &ObjectKey) -> Result<PassReport, ReconcileError> {
        let pass = AssertUnwindSafe(self.reconciler.reconcile(key)).catch_unwind();
        match tokio::time::timeout(self.pass_timeout, pass).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!(config = %key, panic = %message, "Reconcile pass panicked");
                Err(ReconcileError::panicked(message))
            }
            Err(_) => Err(ReconcileError::timeout(
                u64::try_from(self.pass_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    async fn process(&self, key: &ObjectKey) {
        match self.run_pass(key).await {
            Ok(report) => {
                self.queue.forget(key);
                match report.outcome {
                    PassOutcome::Aborted => self.index.remove_config(key),
                    PassOutcome::Converged | PassOutcome::Updated => {
                        // Changes to newly watched keys made during the pass
                        // were not routed here; one more pass picks them up.
                        if self.index.replace(key, report.watched) {
                            self.queue.add(key.clone());
                        }
                    }
                }
                debug!(config = %key, outcome = ?report.outcome, phase = ?report.phase, "Pass finished");
            }
            Err(e) if e.is_transient() => {
                let attempts = self.queue.requeues(key) + 1;
                if attempts > self.max_retries {
                    let message = format!("reconcile failed after {attempts} attempts: {e}");
                    self.fail(key, &message).await;
                    self.queue.forget(key);
                } else {
                    let delay = self.backoff.delay(attempts - 1);
                    warn!(
                        config = %key,
                        error = %e,
                        attempt = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Reconcile failed, backing off"
                    );
                    self.queue.add_rate_limited(key.clone(), &self.backoff);
                }
            }
            Err(e) => {
                self.fail(key, &e.to_string()).await;
                self.queue.forget(key);
            }
        }
    }

    async fn fail(&self, key: &ObjectKey, message: &str) {
        if let Err(e) = self.reconciler.mark_failed(key, message).await {
            error!(config = %key, error = %e, "Failed to record Failed phase");
        }
    }

    /// Config keys a watch event should wake up.
    fn route(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        let key = &event.key;
        match key.kind {
            Kind::OperandConfig => {
                if event.is_deleted() {
                    self.index.remove_config(key);
                    self.queue.forget(key);
                    return vec![key.clone()];
                }
                if is_own_status_write(event) {
                    return Vec::new();
                }
                vec![key.clone()]
            }
            Kind::OperandRegistry => vec![key.with_kind(Kind::OperandConfig)],
            Kind::OperandRequest => {
                let mut configs = event
                    .decode::<OperandRequest>()
                    .map(|request| request.config_keys())
                    .unwrap_or_default();
                configs.extend(self.index.lookup(key));
                configs.sort();
                configs.dedup();
                configs
            }
            Kind::Subscription | Kind::ClusterServiceVersion | Kind::InstallPlan => {
                self.index.lookup(key)
            }
        }
    }
}

/// A modified config whose status already reflects its current generation
/// was written by a pass, not by an administrator.
fn is_own_status_write(event: &WatchEvent) -> bool {
    if event.event_type != WatchEventType::Modified {
        return false;
    }
    match event.decode::<OperandConfig>() {
        Some(config) => {
            !config.metadata.is_being_deleted()
                && config.status.observed_generation == config.metadata.generation
        }
        None => false,
    }
}

struct WatchPump {
    inner: Arc<Inner>,
    shutdown: watch::Receiver<bool>,
}

impl WatchPump {
    async fn run(mut self, mut events: broadcast::Receiver<WatchEvent>) {
        debug!("Watch pump started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        for config in self.inner.route(&event) {
                            debug!(config = %config, cause = %event.key, event = %event.event_type, "Queueing config");
                            self.inner.queue.add(config);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Watch pump lagged, resyncing all configs");
                        if let Err(e) = self.inner.resync().await {
                            error!(error = %e, "Resync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Event bus closed, stopping watch pump");
                        break;
                    }
                },
            }
        }
        debug!("Watch pump stopped");
    }
}
