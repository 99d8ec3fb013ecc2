//! Reverse index from watched objects to the configs that read them.
//!
//! Each successful pass replaces the set of keys a config depends on
//! (requests, subscriptions, installed versions, install plans). Watch events
//! on any of those keys are routed back to the config through this index.
//! The index is a cache scoped to one controller run and is never persisted.

use std::collections::HashSet;

use dashmap::DashMap;
use odlm_core::ObjectKey;

#[derive(Debug, Default)]
pub struct WatchIndex {
    /// config -> keys it watches
    forward: DashMap<ObjectKey, HashSet<ObjectKey>>,
    /// watched key -> configs
    reverse: DashMap<ObjectKey, HashSet<ObjectKey>>,
}

impl WatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything `config` watches.
    ///
    /// Returns `true` if a key was not watched before. Events on such a key
    /// that arrived before this call were not routed to `config`.
    pub fn replace(&self, config: &ObjectKey, watched: impl IntoIterator<Item = ObjectKey>) -> bool {
        let watched: HashSet<ObjectKey> = watched.into_iter().collect();
        let previous = self
            .forward
            .insert(config.clone(), watched.clone())
            .unwrap_or_default();

        for stale in previous.difference(&watched) {
            self.unlink(stale, config);
        }
        let mut grew = false;
        for key in watched.difference(&previous) {
            grew = true;
            self.reverse
                .entry(key.clone())
                .or_default()
                .insert(config.clone());
        }
        grew
    }

    /// Drops a config and every link it owns.
    pub fn remove_config(&self, config: &ObjectKey) {
        if let Some((_, watched)) = self.forward.remove(config) {
            for key in &watched {
                self.unlink(key, config);
            }
        }
    }

    fn unlink(&self, key: &ObjectKey, config: &ObjectKey) {
        if let Some(mut configs) = self.reverse.get_mut(key) {
            configs.remove(config);
        }
        self.reverse.remove_if(key, |_, configs| configs.is_empty());
    }

    /// Configs that watch `key`, sorted.
    pub fn lookup(&self, key: &ObjectKey) -> Vec<ObjectKey> {
        let mut configs: Vec<ObjectKey> = self
            .reverse
            .get(key)
            .map(|configs| configs.iter().cloned().collect())
            .unwrap_or_default();
        configs.sort();
        configs
    }

    /// Number of configs indexed.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&self) {
        self.forward.clear();
        self.reverse.clear();
    }
}
