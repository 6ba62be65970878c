// src/core/scope_map.rs

use crate::models::{EnvRef, EnvironmentId, Scope};
use std::collections::HashMap;
use std::path::Path;

/// Active environment assignments keyed by scope, with inherited lookup.
///
/// A lookup for a path that has no assignment of its own walks up the
/// directory hierarchy one parent at a time. Once the filesystem root is
/// passed without a match, the `Scope::Global` assignment (if any) applies.
#[derive(Debug, Default, Clone)]
pub struct ScopeMap {
    map: HashMap<Scope, EnvRef>,
}

impl ScopeMap {
    /// An empty map: every lookup misses until something is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites the assignment for exactly `scope`.
    pub fn set(&mut self, scope: Scope, env: EnvRef) {
        self.map.insert(scope, env);
    }

    /// Removes the assignment for exactly `scope`; ancestors and descendants keep theirs.
    pub fn delete(&mut self, scope: &Scope) -> Option<EnvRef> {
        self.map.remove(scope)
    }

    /// True iff [`ScopeMap::get`] finds an environment for `scope`.
    pub fn has(&self, scope: &Scope) -> bool {
        self.get(scope).is_some()
    }

    /// Assignment stored for exactly `scope`, without walking.
    pub fn get_exact(&self, scope: &Scope) -> Option<&EnvRef> {
        self.map.get(scope)
    }

    /// Effective assignment for `scope`.
    pub fn get(&self, scope: &Scope) -> Option<&EnvRef> {
        match scope {
            Scope::Global => self.map.get(&Scope::Global),
            Scope::Path(start) => self
                .walk_ancestors(start)
                .or_else(|| self.map.get(&Scope::Global)),
        }
    }

    /// Drops every assignment pointing at `id`. Returns the scopes that were cleared.
    pub fn remove_environment(&mut self, id: &EnvironmentId) -> Vec<Scope> {
        let stale: Vec<Scope> = self
            .map
            .iter()
            .filter(|(_, env)| &env.id == id)
            .map(|(scope, _)| scope.clone())
            .collect();
        for scope in &stale {
            self.map.remove(scope);
        }
        stale
    }

    /// Number of explicit assignments.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no scope has an explicit assignment.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn walk_ancestors(&self, start: &Path) -> Option<&EnvRef> {
        let mut candidate = start;
        loop {
            // Scope keys are owned; build one per lookup. Depth bounds the loop.
            if let Some(env) = self.map.get(&Scope::Path(candidate.to_path_buf())) {
                return Some(env);
            }
            match candidate.parent() {
                Some(parent) if parent != candidate => {
                    log::trace!(
                        "No env for {}, trying {}",
                        candidate.display(),
                        parent.display()
                    );
                    candidate = parent;
                }
                _ => {
                    log::trace!("Hit root from {}", start.display());
                    return None;
                }
            }
        }
    }
}
