//! Phase Aggregator: folds per-operand verdicts into the config phase and
//! writes the result with a conditional update.

use std::collections::BTreeMap;

use odlm_core::{OperandConfig, OperandConfigStatus, Phase, ServiceStatus, Verdict};
use odlm_storage::{StorageError, TypedStore, Versioned};
use tracing::debug;

/// Aggregate phase of a set of verdicts.
///
/// Empty is `Init`. Any `Failed` wins, then all `Ready` is `Running`, and
/// everything else is still `Installing`.
pub fn aggregate_phase<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> Phase {
    let mut any = false;
    let mut all_ready = true;
    for verdict in verdicts {
        any = true;
        match verdict {
            Verdict::Failed => return Phase::Failed,
            Verdict::Ready => {}
            Verdict::NotStarted | Verdict::Installing => all_ready = false,
        }
    }
    match (any, all_ready) {
        (false, _) => Phase::Init,
        (true, true) => Phase::Running,
        (true, false) => Phase::Installing,
    }
}

/// Builds the full status for one pass.
pub fn build_status(
    service_status: BTreeMap<String, ServiceStatus>,
    message: Option<String>,
    observed_generation: i64,
    observed_registry_generation: i64,
) -> OperandConfigStatus {
    OperandConfigStatus {
        phase: aggregate_phase(service_status.values().map(|s| &s.verdict)),
        service_status,
        message,
        observed_generation,
        observed_registry_generation,
    }
}

/// Result of a status write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The stored status already matched; nothing was written.
    Unchanged,
    /// The status was written at this resource version.
    Written { resource_version: String },
}

/// Writes `status` if it differs from what `config` carries.
///
/// The write is conditional on the version `config` was read at, so a
/// stale pass loses with `VersionConflict` instead of overwriting.
pub async fn write_status(
    store: &TypedStore,
    config: &Versioned<OperandConfig>,
    status: OperandConfigStatus,
) -> Result<WriteOutcome, StorageError> {
    if config.object.status == status {
        return Ok(WriteOutcome::Unchanged);
    }
    let mut updated = config.object.clone();
    debug!(
        config = %config.key(),
        from = %updated.status.phase,
        to = %status.phase,
        "Writing config status"
    );
    updated.status = status;
    let written = store
        .update(&updated, Some(&config.resource_version))
        .await?;
    Ok(WriteOutcome::Written {
        resource_version: written.resource_version,
    })
}
