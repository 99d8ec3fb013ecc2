//! Registry Resolver: turns an `OperandRegistry` into an ordered operand catalog.

use std::collections::HashSet;

use indexmap::IndexMap;
use odlm_core::{Kind, ObjectKey, OperandEntry, OperandRegistry, Scope};
use odlm_storage::{StorageError, TypedStore};

use crate::error::ResolveError;

/// The validated catalog of one registry, in declaration order.
#[derive(Debug, Clone)]
pub struct ResolvedRegistry {
    pub key: ObjectKey,
    pub generation: i64,
    pub entries: IndexMap<String, OperandEntry>,
}

impl ResolvedRegistry {
    pub fn get(&self, operand: &str) -> Option<&OperandEntry> {
        self.entries.get(operand)
    }

    pub fn contains(&self, operand: &str) -> bool {
        self.entries.contains_key(operand)
    }

    /// Whether a request living in `namespace` may use `entry`.
    ///
    /// Private operands are reserved for requests in the registry's own
    /// namespace.
    pub fn allows(&self, entry: &OperandEntry, namespace: &str) -> bool {
        match entry.scope {
            Scope::Public => true,
            Scope::Private => namespace == self.key.namespace,
        }
    }

    /// `<namespace>.<name>`, the value of the registry label on subscriptions.
    pub fn label_value(&self) -> String {
        format!("{}.{}", self.key.namespace, self.key.name)
    }
}

/// Checks an operator list and indexes it by name.
///
/// Every problem is reported, not just the first.
pub fn validate(registry: &OperandRegistry) -> Result<IndexMap<String, OperandEntry>, Vec<String>> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let mut entries = IndexMap::with_capacity(registry.spec.operators.len());

    for (index, entry) in registry.spec.operators.iter().enumerate() {
        if entry.name.is_empty() {
            problems.push(format!("operator #{} has no name", index + 1));
            continue;
        }
        let required = [
            ("namespace", &entry.namespace),
            ("channel", &entry.channel),
            ("sourceName", &entry.source_name),
            ("sourceNamespace", &entry.source_namespace),
        ];
        for (field, value) in required {
            if value.is_empty() {
                problems.push(format!("operator {} is missing {field}", entry.name));
            }
        }
        if !seen.insert(entry.name.as_str()) {
            problems.push(format!("operator {} is defined more than once", entry.name));
            continue;
        }
        entries.insert(entry.name.clone(), entry.clone());
    }

    if problems.is_empty() {
        Ok(entries)
    } else {
        Err(problems)
    }
}

#[derive(Debug, Clone)]
pub struct RegistryResolver {
    store: TypedStore,
}

impl RegistryResolver {
    pub fn new(store: TypedStore) -> Self {
        Self { store }
    }

    /// Reads and validates a registry. Read-only.
    ///
    /// A document that does not decode as a registry is invalid, not a store
    /// failure.
    pub async fn resolve(&self, key: &ObjectKey) -> Result<ResolvedRegistry, ResolveError> {
        let key = key.with_kind(Kind::OperandRegistry);
        let registry = match self.store.get::<OperandRegistry>(&key).await {
            Ok(Some(registry)) if !registry.object.metadata.is_being_deleted() => registry,
            Ok(_) => return Err(ResolveError::not_found(&key)),
            Err(StorageError::InvalidObject { message }) => {
                return Err(ResolveError::invalid(&key, vec![message]));
            }
            Err(e) => return Err(e.into()),
        };

        let entries =
            validate(&registry.object).map_err(|problems| ResolveError::invalid(&key, problems))?;

        Ok(ResolvedRegistry {
            key,
            generation: registry.generation,
            entries,
        })
    }
}
