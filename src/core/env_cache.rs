// src/core/env_cache.rs

use crate::core::paths;
use crate::models::{
    EnvRef, EnvironmentDescriptor, EnvironmentId, HatchEnvInfo, ProjectEnvironmentSet,
    PythonProject, ShellCommand,
};
use crate::system::hatch_cli::{HatchCli, HatchError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment sets of one project before and after a refresh.
/// `before` is `None` when the project had never been fetched.
#[derive(Debug, Clone)]
pub struct ProjectRefresh {
    /// Project root, the cache key.
    pub project: PathBuf,
    pub before: Option<ProjectEnvironmentSet>,
    pub after: ProjectEnvironmentSet,
}

/// Result of refreshing several projects. A failing project does not stop the others.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    /// Projects whose entry was replaced.
    pub refreshed: Vec<ProjectRefresh>,
    /// Projects dropped from the cache because they are no longer known.
    pub evicted: Vec<(PathBuf, ProjectEnvironmentSet)>,
    /// Projects whose fetch failed; their previous entry is kept.
    pub failures: Vec<(PathBuf, HatchError)>,
}

impl RefreshOutcome {
    /// Every descriptor that left the cache, in project order.
    pub fn removed(&self) -> Vec<EnvRef> {
        let mut removed: Vec<EnvRef> = self
            .refreshed
            .iter()
            .filter_map(|r| r.before.as_ref())
            .flat_map(ProjectEnvironmentSet::to_vec)
            .collect();
        removed.extend(self.evicted.iter().flat_map(|(_, set)| set.to_vec()));
        removed
    }

    /// Every descriptor that entered the cache, in project order.
    pub fn added(&self) -> Vec<EnvRef> {
        self.refreshed
            .iter()
            .flat_map(|r| r.after.to_vec())
            .collect()
    }
}

/// Two-level store: project root -> environment name -> descriptor.
///
/// A project is present iff it was fetched since the last [`EnvironmentCache::clear`];
/// a fetched project without environments is present with an empty set.
#[derive(Debug)]
pub struct EnvironmentCache {
    hatch: HatchCli,
    manager_id: String,
    entries: RwLock<HashMap<PathBuf, ProjectEnvironmentSet>>,
}

impl EnvironmentCache {
    /// An empty cache whose descriptors carry `manager_id`.
    pub fn new(hatch: HatchCli, manager_id: impl Into<String>) -> Self {
        Self {
            hatch,
            manager_id: manager_id.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The `hatch` adapter used for fetching.
    pub fn hatch(&self) -> &HatchCli {
        &self.hatch
    }

    /// Cached set of `project`, `None` if it was never fetched.
    pub fn get_cached(&self, project: &Path) -> Option<ProjectEnvironmentSet> {
        self.entries.read().get(project).cloned()
    }

    /// True once `project` was fetched, even if it has no environments.
    pub fn is_cached(&self, project: &Path) -> bool {
        self.entries.read().contains_key(project)
    }

    /// Every cached descriptor, ordered by project root then name.
    pub fn all(&self) -> Vec<EnvRef> {
        let entries = self.entries.read();
        let mut projects: Vec<&PathBuf> = entries.keys().collect();
        projects.sort();
        projects
            .into_iter()
            .filter_map(|p| entries.get(p))
            .flat_map(ProjectEnvironmentSet::to_vec)
            .collect()
    }

    /// Cached project roots, sorted.
    pub fn projects(&self) -> Vec<PathBuf> {
        let mut projects: Vec<PathBuf> = self.entries.read().keys().cloned().collect();
        projects.sort();
        projects
    }

    /// Empties the whole cache. There is no per-project clear.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        log::debug!("Clearing environment cache ({} project(s))", entries.len());
        entries.clear();
    }

    /// Fetches the environments of each project and overwrites its whole entry.
    ///
    /// Projects are fetched one after another; the lock is only taken to swap an
    /// entry in, never while the tool runs.
    pub async fn refresh(&self, projects: &[PythonProject]) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();
        for project in projects {
            match self.fetch_project(&project.root).await {
                Ok(after) => {
                    let before = self
                        .entries
                        .write()
                        .insert(project.root.clone(), after.clone());
                    log::debug!(
                        "Cached {} environment(s) for '{}'",
                        after.len(),
                        project.root.display()
                    );
                    outcome.refreshed.push(ProjectRefresh {
                        project: project.root.clone(),
                        before,
                        after,
                    });
                }
                Err(e) => {
                    log::error!(
                        "Failed to fetch environments for '{}': {}",
                        project.root.display(),
                        e
                    );
                    outcome.failures.push((project.root.clone(), e));
                }
            }
        }
        outcome
    }

    /// Refreshes every given project and evicts cached projects not in the list.
    /// Projects whose fetch fails keep their previous entry.
    pub async fn refresh_all(&self, projects: &[PythonProject]) -> RefreshOutcome {
        let mut outcome = self.refresh(projects).await;
        let mut entries = self.entries.write();
        let stale: Vec<PathBuf> = entries
            .keys()
            .filter(|cached| !projects.iter().any(|p| &&p.root == cached))
            .cloned()
            .collect();
        for project in stale {
            if let Some(set) = entries.remove(&project) {
                log::debug!("Evicting unknown project '{}'", project.display());
                outcome.evicted.push((project, set));
            }
        }
        outcome
    }

    async fn fetch_project(&self, project: &Path) -> Result<ProjectEnvironmentSet, HatchError> {
        let infos = self.hatch.get_envs(project).await?;
        Ok(infos
            .into_iter()
            .map(|info| Arc::new(self.build_descriptor(project, info)))
            .collect())
    }

    fn build_descriptor(&self, project: &Path, info: HatchEnvInfo) -> EnvironmentDescriptor {
        let HatchEnvInfo { name, path, config } = info;
        let display_path = path.display().to_string();
        EnvironmentDescriptor {
            id: EnvironmentId {
                manager_id: self.manager_id.clone(),
                project: project.to_path_buf(),
                name: name.clone(),
            },
            display_name: name.clone(),
            project_path: project.to_path_buf(),
            executable_path: paths::python_executable(&path),
            activation: Some(activation_commands(&path)),
            deactivation: Some(deactivation_commands()),
            description: config.description,
            tooltip: display_path.clone(),
            display_path,
            root_path: path,
            name,
        }
    }
}

fn activation_commands(env_root: &Path) -> Vec<ShellCommand> {
    let scripts = paths::scripts_dir(env_root);
    if cfg!(target_os = "windows") {
        vec![ShellCommand::new(
            scripts.join("activate.bat").display().to_string(),
            &[],
        )]
    } else {
        let script = scripts.join("activate").display().to_string();
        vec![ShellCommand::new("source", &[script.as_str()])]
    }
}

fn deactivation_commands() -> Vec<ShellCommand> {
    if cfg!(target_os = "windows") {
        vec![ShellCommand::new("deactivate.bat", &[])]
    } else {
        vec![ShellCommand::new("deactivate", &[])]
    }
}
