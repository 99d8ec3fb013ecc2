//! Request Resolver: the set of operands actively requested from one registry.

use std::collections::{BTreeMap, BTreeSet};

use odlm_core::{Kind, ObjectKey, OperandRequest, Resource};
use odlm_storage::{StorageError, TypedStore};

/// Who asks for one operand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandDemand {
    /// Live requests naming the operand.
    pub requested_by: BTreeSet<ObjectKey>,
    /// Namespaces those requests live in.
    pub namespaces: BTreeSet<String>,
}

/// Union of every live request that targets one registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRequests {
    /// Actively requested operands, de-duplicated by name.
    pub operands: BTreeMap<String, OperandDemand>,
    /// Live requests with at least one entry targeting the registry.
    pub requests: BTreeSet<ObjectKey>,
}

impl ResolvedRequests {
    /// Folds requests into the demand on `registry`.
    ///
    /// Requests being deleted are not live and contribute nothing.
    pub fn collect<'a>(
        registry: &ObjectKey,
        requests: impl IntoIterator<Item = &'a OperandRequest>,
    ) -> Self {
        let registry = registry.with_kind(Kind::OperandRegistry);
        let mut resolved = Self::default();

        for request in requests {
            if request.metadata.is_being_deleted() {
                continue;
            }
            let request_key = request.key();
            for entry in &request.spec.requests {
                if request.registry_key(entry) != registry {
                    continue;
                }
                resolved.requests.insert(request_key.clone());
                for operand in &entry.operands {
                    let demand = resolved.operands.entry(operand.clone()).or_default();
                    demand.requested_by.insert(request_key.clone());
                    demand
                        .namespaces
                        .insert(request.metadata.namespace.clone());
                }
            }
        }
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operands.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct RequestResolver {
    store: TypedStore,
}

impl RequestResolver {
    pub fn new(store: TypedStore) -> Self {
        Self { store }
    }

    /// Resolves the demand on the registry peered with `config`.
    ///
    /// Zero matching requests yields an empty result, not an error.
    pub async fn resolve(&self, config: &ObjectKey) -> Result<ResolvedRequests, StorageError> {
        let requests = self.store.list::<OperandRequest>(None).await?;
        Ok(ResolvedRequests::collect(
            config,
            requests.iter().map(|r| &r.object),
        ))
    }
}
