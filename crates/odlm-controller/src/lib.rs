//! # odlm-controller
//!
//! Reconciliation engine for the operand lifecycle manager.
//!
//! For every `OperandConfig` the engine derives which operands are actively
//! requested, makes sure a subscription exists for each of them, follows the
//! package manager's installation chain (subscription, installed version,
//! install plan) and writes one aggregate phase back into the config status.
//!
//! The pipeline of one pass:
//!
//! 1. [`request::RequestResolver`] collects demand from `OperandRequest`s
//! 2. [`registry::RegistryResolver`] resolves the registry catalog
//! 3. [`provision::ProvisioningDriver`] creates or patches subscriptions
//! 4. [`readiness`] folds the installation chain into a verdict per operand
//! 5. [`aggregate`] derives the phase and writes status conditionally
//!
//! [`scheduler::Controller`] drives passes from watch events with a worker
//! pool over a deduplicating [`queue::WorkQueue`].

pub mod aggregate;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod index;
pub mod observability;
pub mod provision;
pub mod queue;
pub mod readiness;
pub mod reconciler;
pub mod registry;
pub mod request;
pub mod scheduler;

pub use config::{AppConfig, BootstrapConfig, ControllerSettings, LoggingConfig, RetrySettings};
pub use error::{BootstrapError, ReconcileError, ResolveError};
pub use observability::{apply_logging_level, init_tracing};
pub use reconciler::{PassOutcome, PassReport, Reconciler};
pub use scheduler::Controller;
