//! Start-up manifests.
//!
//! Loads registry, config and request objects from a directory of JSON files
//! into the store, the way an administrator would apply them. Each file holds
//! either one object or an array of objects. Files are read in name order.

use std::path::{Path, PathBuf};

use odlm_core::Kind;
use odlm_storage::DynStore;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::BootstrapError;

/// Statistics about one manifest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub created: usize,
    pub skipped: usize,
}

impl BootstrapStats {
    pub fn total(&self) -> usize {
        self.created + self.skipped
    }
}

/// Reads every `*.json` file in `dir`.
///
/// # Errors
///
/// Fails on unreadable files, invalid JSON, or a document that is neither an
/// object nor an array of objects.
pub fn load_manifests(dir: &Path) -> Result<Vec<Value>, BootstrapError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BootstrapError::Io { path, source }
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut manifests = Vec::new();
    for path in files {
        let content = std::fs::read_to_string(&path).map_err(io_err(&path))?;
        let document: Value =
            serde_json::from_str(&content).map_err(|source| BootstrapError::Parse {
                path: path.clone(),
                source,
            })?;
        match document {
            Value::Object(_) => manifests.push(document),
            Value::Array(items) if items.iter().all(Value::is_object) => manifests.extend(items),
            _ => return Err(BootstrapError::Shape { path }),
        }
        debug!(path = %path.display(), "Loaded manifest file");
    }
    Ok(manifests)
}

fn kind_rank(manifest: &Value) -> usize {
    manifest
        .get("kind")
        .and_then(Value::as_str)
        .and_then(|kind| kind.parse::<Kind>().ok())
        .and_then(|kind| Kind::ALL.iter().position(|k| *k == kind))
        .unwrap_or(Kind::ALL.len())
}

/// Creates every manifest in the store. Objects that already exist are left
/// untouched so a restart does not fail on its own previous run.
///
/// Registries go first, then configs and requests.
pub async fn apply_manifests(
    store: &DynStore,
    mut manifests: Vec<Value>,
) -> Result<BootstrapStats, BootstrapError> {
    manifests.sort_by_key(kind_rank);

    let mut stats = BootstrapStats::default();
    for manifest in &manifests {
        match store.create(manifest).await {
            Ok(stored) => {
                info!(key = %stored.key, "Applied manifest");
                stats.created += 1;
            }
            Err(e) if e.is_already_exists() => {
                info!(error = %e, "Manifest object already exists, skipping");
                stats.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        created = stats.created,
        skipped = stats.skipped,
        "Manifest bootstrap completed"
    );
    Ok(stats)
}
