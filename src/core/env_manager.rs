// src/core/env_manager.rs

//! The environment manager the host talks to.
//!
//! It owns the [`EnvironmentCache`] (what environments exist per project) and a
//! [`ScopeMap`] (which environment is active where), and publishes two change
//! streams over `tokio::sync::broadcast`:
//!
//! - per-scope active-environment changes ([`DidChangeEnvironment`]),
//! - bulk cache-content changes ([`DidChangeEnvironments`]), removals first.
//!
//! Subscribers only see events fired after they subscribed.

use crate::constants::{
    DEFAULT_ENV_NAME, EVENT_CHANNEL_CAPACITY, MANAGER_DISPLAY_NAME, MANAGER_ID,
    PREFERRED_PACKAGE_MANAGER_ID,
};
use crate::core::env_cache::{EnvironmentCache, RefreshOutcome};
use crate::core::paths;
use crate::core::projects::ProjectRegistry;
use crate::core::scope_map::ScopeMap;
use crate::models::{
    DidChangeEnvironment, DidChangeEnvironments, EnvRef, EnvironmentChange,
    EnvironmentChangeKind, GetEnvironmentsScope, PythonProject, RefreshScope, Scope,
};
use crate::settings::{Settings, SettingsError};
use crate::system::executor::ProcessRunner;
use crate::system::hatch_cli::{HatchCli, HatchError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OnceCell, broadcast};

/// Errors surfaced by [`EnvironmentManager`] operations.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// A `hatch` invocation failed or produced unusable output.
    #[error(transparent)]
    Hatch(#[from] HatchError),
    /// The operation needs exactly one project scope.
    #[error("Unsupported scope: {0}")]
    UnsupportedScope(String),
    /// Only absolute paths can be resolved.
    #[error("Cannot resolve '{}': only absolute paths can be matched against environments.", .0.display())]
    UnsupportedPath(PathBuf),
    /// No known project contains the path.
    #[error("No project found for '{}'.", .0.display())]
    ProjectNotFound(PathBuf),
    /// `hatch env create` succeeded but the environment is not listed afterwards.
    #[error("Hatch did not report environment '{name}' for project '{}' after creating it.", .project.display())]
    EnvironmentMissing { name: String, project: PathBuf },
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Contract of an environment manager as seen by the host's environment registry.
#[async_trait]
pub trait EnvironmentManager: Send + Sync {
    /// Stable manager id, used in every [`crate::models::EnvironmentId`].
    fn name(&self) -> &str;
    /// Human-readable manager name.
    fn display_name(&self) -> &str;
    /// Package manager the host should pair with these environments.
    fn preferred_package_manager_id(&self) -> &str;

    /// Performs the first full refresh. Concurrent and repeated calls share one run.
    async fn initialize(&self);
    /// Re-fetches one project or every known project and publishes the diff.
    /// Every project is attempted; the first failure is returned afterwards.
    async fn refresh(&self, scope: RefreshScope) -> ManagerResult<()>;
    /// Environments of a project, of every project, or none for the global scope.
    async fn get_environments(&self, scope: GetEnvironmentsScope) -> ManagerResult<Vec<EnvRef>>;
    /// Assigns `env` to every scope, or removes their assignments when `env` is `None`.
    async fn set(&self, scopes: &[Scope], env: Option<EnvRef>) -> ManagerResult<()>;
    /// Effective environment of `scope`. Never fails; problems are logged.
    async fn get(&self, scope: &Scope) -> Option<EnvRef>;
    /// Environment whose root contains the absolute `path`, if any.
    async fn resolve(&self, path: &Path) -> ManagerResult<Option<EnvRef>>;
    /// Drops every cached project. Assignments survive.
    async fn clear_cache(&self);
    /// Runs `hatch env create` in the single project of `scopes`.
    async fn create(&self, scopes: &[Scope], name: &str) -> ManagerResult<EnvRef>;
    /// Runs `hatch env remove` and clears every assignment pointing at `env`.
    async fn remove(&self, env: &EnvRef) -> ManagerResult<()>;

    /// Subscribes to per-scope active environment changes.
    fn on_did_change_environment(&self) -> broadcast::Receiver<DidChangeEnvironment>;
    /// Subscribes to bulk additions and removals in the cache.
    fn on_did_change_environments(&self) -> broadcast::Receiver<DidChangeEnvironments>;
}

/// Environment manager backed by the `hatch` CLI.
pub struct HatchEnvManager {
    projects: Arc<dyn ProjectRegistry>,
    cache: EnvironmentCache,
    active: RwLock<ScopeMap>,
    initialized: OnceCell<()>,
    default_env_name: String,
    env_changed: broadcast::Sender<DidChangeEnvironment>,
    envs_changed: broadcast::Sender<DidChangeEnvironments>,
}

impl fmt::Debug for HatchEnvManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HatchEnvManager")
            .field("cache", &self.cache)
            .field("active", &self.active.read().len())
            .field("initialized", &self.initialized.initialized())
            .field("default_env_name", &self.default_env_name)
            .finish_non_exhaustive()
    }
}

impl HatchEnvManager {
    /// Manager with an empty cache, no assignments and the default environment name.
    pub fn new(hatch: HatchCli, projects: Arc<dyn ProjectRegistry>) -> Self {
        let (env_changed, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (envs_changed, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            projects,
            cache: EnvironmentCache::new(hatch, MANAGER_ID),
            active: RwLock::new(ScopeMap::new()),
            initialized: OnceCell::new(),
            default_env_name: DEFAULT_ENV_NAME.to_string(),
            env_changed,
            envs_changed,
        }
    }

    /// Builds a manager from user settings.
    pub fn from_settings(
        settings: &Settings,
        runner: Arc<dyn ProcessRunner>,
        projects: Arc<dyn ProjectRegistry>,
    ) -> Result<Self, SettingsError> {
        let hatch = HatchCli::new(runner, settings.hatch_command()?);
        Ok(Self::new(hatch, projects).with_default_env_name(&settings.default_env_name))
    }

    /// Name of the environment used when a scope has no explicit assignment.
    pub fn with_default_env_name(mut self, name: impl Into<String>) -> Self {
        self.default_env_name = name.into();
        self
    }

    /// The underlying per-project cache.
    pub fn cache(&self) -> &EnvironmentCache {
        &self.cache
    }

    /// Refreshes the given projects, publishes the diff, and fails with the first
    /// project error after every project had its chance.
    async fn refresh_projects(&self, projects: &[PythonProject]) -> ManagerResult<()> {
        let outcome = self.cache.refresh(projects).await;
        self.settle(outcome)
    }

    /// Refreshes every known project and evicts the rest. Fails like
    /// [`Self::refresh_projects`] once every project was attempted.
    async fn refresh_everything(&self) -> ManagerResult<()> {
        let projects = self.projects.projects();
        log::info!("Refreshing Hatch environments for {} project(s)", projects.len());
        let outcome = self.cache.refresh_all(&projects).await;
        self.settle(outcome)
    }

    fn settle(&self, outcome: RefreshOutcome) -> ManagerResult<()> {
        self.publish_cache_changes(&outcome);
        match outcome.failures.into_iter().next() {
            Some((_, e)) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn publish_cache_changes(&self, outcome: &RefreshOutcome) {
        let changes: DidChangeEnvironments = outcome
            .removed()
            .into_iter()
            .map(|environment| EnvironmentChange {
                kind: EnvironmentChangeKind::Remove,
                environment,
            })
            .chain(outcome.added().into_iter().map(|environment| EnvironmentChange {
                kind: EnvironmentChangeKind::Add,
                environment,
            }))
            .collect();
        if changes.is_empty() {
            return;
        }
        if self.envs_changed.send(changes).is_err() {
            log::trace!("No subscribers for environment list changes");
        }
    }

    fn publish_env_change(&self, event: DidChangeEnvironment) {
        if self.env_changed.send(event).is_err() {
            log::trace!("No subscribers for active environment changes");
        }
    }

    /// The configured default environment of the scope's project; for the global
    /// scope, the first one found across cached projects.
    fn default_for(&self, scope: &Scope) -> Option<EnvRef> {
        match scope {
            Scope::Path(path) => {
                let root = self
                    .projects
                    .project_for(path)
                    .map(|p| p.root)
                    .unwrap_or_else(|| path.clone());
                self.cache
                    .get_cached(&root)?
                    .get(&self.default_env_name)
                    .cloned()
            }
            Scope::Global => self
                .cache
                .all()
                .into_iter()
                .find(|env| env.name == self.default_env_name),
        }
    }

    /// Creates the environment through Hatch when its root is missing on disk.
    async fn ensure_on_disk(&self, env: &EnvRef) -> Result<(), HatchError> {
        if tokio::fs::try_exists(&env.root_path).await.unwrap_or(false) {
            return Ok(());
        }
        log::warn!(
            "Environment '{}' is missing at '{}'",
            env.name,
            env.root_path.display()
        );
        self.cache
            .hatch()
            .create_env(&env.name, &env.project_path)
            .await
    }

    fn single_project(&self, scopes: &[Scope]) -> ManagerResult<PythonProject> {
        match scopes {
            [Scope::Path(path)] => self
                .projects
                .project_for(path)
                .ok_or_else(|| ManagerError::ProjectNotFound(path.clone())),
            [Scope::Global] => Err(ManagerError::UnsupportedScope(
                "the global scope has no project; a single project is required".to_string(),
            )),
            [] => Err(ManagerError::UnsupportedScope(
                "no scope given; a single project is required".to_string(),
            )),
            many => Err(ManagerError::UnsupportedScope(format!(
                "{} scopes given; a single project is required",
                many.len()
            ))),
        }
    }
}

#[async_trait]
impl EnvironmentManager for HatchEnvManager {
    fn name(&self) -> &str {
        MANAGER_ID
    }

    fn display_name(&self) -> &str {
        MANAGER_DISPLAY_NAME
    }

    fn preferred_package_manager_id(&self) -> &str {
        PREFERRED_PACKAGE_MANAGER_ID
    }

    async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                // Failed projects stay absent and are fetched again on demand.
                if let Err(e) = self.refresh_everything().await {
                    log::warn!("Initial refresh was incomplete: {}", e);
                }
            })
            .await;
    }

    async fn refresh(&self, scope: RefreshScope) -> ManagerResult<()> {
        match scope {
            RefreshScope::All => self.refresh_everything().await,
            RefreshScope::Project(path) => match self.projects.project_for(&path) {
                Some(project) => {
                    log::info!("Refreshing project {}", project.root.display());
                    self.refresh_projects(std::slice::from_ref(&project)).await
                }
                None => {
                    log::warn!("No project contains '{}'; nothing to refresh", path.display());
                    Ok(())
                }
            },
        }
    }

    async fn get_environments(&self, scope: GetEnvironmentsScope) -> ManagerResult<Vec<EnvRef>> {
        match scope {
            GetEnvironmentsScope::Global => {
                log::trace!("get_environments called with scope 'global'");
                Ok(Vec::new())
            }
            GetEnvironmentsScope::All => {
                self.initialize().await;
                let all = self.cache.all();
                log::trace!("Found {} environments in cache", all.len());
                Ok(all)
            }
            GetEnvironmentsScope::Project(path) => {
                self.initialize().await;
                let Some(project) = self.projects.project_for(&path) else {
                    log::debug!("No project contains '{}'", path.display());
                    return Ok(Vec::new());
                };
                if let Some(cached) = self.cache.get_cached(&project.root) {
                    log::debug!("Found {} cached envs", cached.len());
                    return Ok(cached.to_vec());
                }
                self.refresh_projects(std::slice::from_ref(&project)).await?;
                Ok(self
                    .cache
                    .get_cached(&project.root)
                    .map(|set| set.to_vec())
                    .unwrap_or_default())
            }
        }
    }

    async fn set(&self, scopes: &[Scope], env: Option<EnvRef>) -> ManagerResult<()> {
        let Some(env) = env else {
            let mut active = self.active.write();
            for scope in scopes {
                log::info!("Unsetting env for scope {}", scope);
                active.delete(scope);
            }
            return Ok(());
        };

        self.ensure_on_disk(&env).await?;

        for scope in scopes {
            log::info!("Setting env {} for scope {}", env.display_name, scope);
            let old = {
                let mut active = self.active.write();
                let old = active.get(scope).cloned();
                active.set(scope.clone(), env.clone());
                old
            };
            if old.as_ref().map(|o| &o.id) != Some(&env.id) {
                self.publish_env_change(DidChangeEnvironment {
                    scope: scope.clone(),
                    old,
                    new: Some(env.clone()),
                });
            }
        }
        Ok(())
    }

    async fn get(&self, scope: &Scope) -> Option<EnvRef> {
        self.initialize().await;

        let assigned = self.active.read().get(scope).cloned();
        let env = match assigned {
            Some(env) => env,
            None => self.default_for(scope)?,
        };

        if let Err(e) = self.ensure_on_disk(&env).await {
            log::error!("Failed to create env for scope {}: {}", scope, e);
            return None;
        }

        log::info!("Got env {} for scope {}", env.display_name, scope);
        Some(env)
    }

    async fn resolve(&self, path: &Path) -> ManagerResult<Option<EnvRef>> {
        if !path.is_absolute() {
            return Err(ManagerError::UnsupportedPath(path.to_path_buf()));
        }
        self.initialize().await;

        // Innermost root wins if environments are nested inside each other.
        Ok(self
            .cache
            .all()
            .into_iter()
            .filter(|env| paths::is_ancestor_or_self(&env.root_path, path))
            .max_by_key(|env| env.root_path.components().count()))
    }

    async fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn create(&self, scopes: &[Scope], name: &str) -> ManagerResult<EnvRef> {
        let project = self.single_project(scopes)?;
        self.cache.hatch().create_env(name, &project.root).await?;
        self.refresh_projects(std::slice::from_ref(&project)).await?;
        self.cache
            .get_cached(&project.root)
            .and_then(|set| set.get(name).cloned())
            .ok_or_else(|| ManagerError::EnvironmentMissing {
                name: name.to_string(),
                project: project.root.clone(),
            })
    }

    async fn remove(&self, env: &EnvRef) -> ManagerResult<()> {
        self.cache
            .hatch()
            .remove_env(&env.name, &env.project_path)
            .await?;

        let cleared = self.active.write().remove_environment(&env.id);
        for scope in cleared {
            self.publish_env_change(DidChangeEnvironment {
                scope,
                old: Some(env.clone()),
                new: None,
            });
        }

        let project = self
            .projects
            .project_for(&env.project_path)
            .unwrap_or_else(|| PythonProject::from_root(env.project_path.clone()));
        self.refresh_projects(std::slice::from_ref(&project)).await
    }

    fn on_did_change_environment(&self) -> broadcast::Receiver<DidChangeEnvironment> {
        self.env_changed.subscribe()
    }

    fn on_did_change_environments(&self) -> broadcast::Receiver<DidChangeEnvironments> {
        self.envs_changed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projects::StaticProjects;
    use crate::system::executor::ExternalToolError;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;

    /// Behaves like `hatch` for projects registered with it: environments live in
    /// `<project>/.venvs/<name>`, `env create` makes the directory.
    #[derive(Default)]
    struct FakeHatch {
        envs: Mutex<HashMap<PathBuf, Vec<String>>>,
        show_calls: AtomicUsize,
        create_calls: AtomicUsize,
        fail_create: AtomicBool,
    }

    impl FakeHatch {
        fn add_project(&self, root: &Path, names: &[&str]) {
            self.envs.lock().insert(
                root.to_path_buf(),
                names.iter().map(|n| (*n).to_string()).collect(),
            );
        }

        fn tool_error(args: &[&str]) -> ExternalToolError {
            ExternalToolError::NonZeroExit {
                command: format!("hatch {}", args.join(" ")),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            }
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeHatch {
        async fn run(
            &self,
            _program: &str,
            args: &[&str],
            cwd: &Path,
        ) -> Result<String, ExternalToolError> {
            match args {
                ["env", "show", "--json"] => {
                    self.show_calls.fetch_add(1, Ordering::SeqCst);
                    // Give concurrent callers a chance to pile up.
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let names = self
                        .envs
                        .lock()
                        .get(cwd)
                        .cloned()
                        .ok_or_else(|| Self::tool_error(args))?;
                    let body: Vec<String> = names
                        .iter()
                        .map(|n| format!("\"{n}\": {{\"type\": \"virtual\"}}"))
                        .collect();
                    Ok(format!("{{{}}}", body.join(",")))
                }
                ["env", "find", name] => Ok(format!("{}\n", cwd.join(".venvs").join(name).display())),
                ["env", "create", name] => {
                    self.create_calls.fetch_add(1, Ordering::SeqCst);
                    if self.fail_create.load(Ordering::SeqCst) {
                        return Err(Self::tool_error(args));
                    }
                    std::fs::create_dir_all(cwd.join(".venvs").join(name))
                        .map_err(|_| Self::tool_error(args))?;
                    let mut envs = self.envs.lock();
                    let names = envs.entry(cwd.to_path_buf()).or_default();
                    if !names.iter().any(|n| n == name) {
                        names.push((*name).to_string());
                    }
                    Ok(String::new())
                }
                ["env", "remove", name] => {
                    let _ = std::fs::remove_dir_all(cwd.join(".venvs").join(name));
                    Ok(String::new())
                }
                _ => Err(Self::tool_error(args)),
            }
        }
    }

    struct Fixture {
        _dirs: Vec<TempDir>,
        roots: Vec<PathBuf>,
        hatch: Arc<FakeHatch>,
        manager: HatchEnvManager,
    }

    /// One project per entry; each env directory exists on disk unless listed in `missing`.
    fn fixture(projects: &[&[&str]], missing: &[&str]) -> Fixture {
        let hatch = Arc::new(FakeHatch::default());
        let mut dirs = Vec::new();
        let mut roots = Vec::new();
        for names in projects {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            for name in names.iter().filter(|n| !missing.contains(n)) {
                std::fs::create_dir_all(root.join(".venvs").join(name)).unwrap();
            }
            hatch.add_project(&root, names);
            roots.push(root);
            dirs.push(dir);
        }
        let registry = Arc::new(StaticProjects::new(roots.clone()));
        let manager = HatchEnvManager::new(HatchCli::new(hatch.clone(), "hatch"), registry);
        Fixture {
            _dirs: dirs,
            roots,
            hatch,
            manager,
        }
    }

    async fn env_named(f: &Fixture, project: usize, name: &str) -> EnvRef {
        f.manager
            .get_environments(GetEnvironmentsScope::Project(f.roots[project].clone()))
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.name == name)
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_one_refresh() {
        let f = fixture(&[&["default"]], &[]);

        tokio::join!(
            f.manager.initialize(),
            f.manager.initialize(),
            f.manager.initialize(),
            f.manager.initialize(),
            f.manager.initialize(),
        );
        f.manager.initialize().await;

        assert_eq!(f.hatch.show_calls.load(Ordering::SeqCst), 1);
        assert!(f.manager.cache().is_cached(&f.roots[0]));
    }

    #[tokio::test]
    async fn test_get_environments_for_project() {
        let f = fixture(&[&["default", "test"]], &[]);

        let envs = f
            .manager
            .get_environments(GetEnvironmentsScope::Project(f.roots[0].clone()))
            .await
            .unwrap();

        assert_eq!(envs.len(), 2);
        let default = envs.iter().find(|e| e.name == "default").unwrap();
        assert_eq!(default.root_path, f.roots[0].join(".venvs").join("default"));
        assert_eq!(
            default.executable_path,
            paths::python_executable(&f.roots[0].join(".venvs").join("default"))
        );
        if cfg!(not(target_os = "windows")) {
            assert!(default.executable_path.ends_with("bin/python"));
        }
    }

    #[tokio::test]
    async fn test_get_environments_global_and_all() {
        let f = fixture(&[&["default"], &["default", "lint"]], &[]);

        let global = f
            .manager
            .get_environments(GetEnvironmentsScope::Global)
            .await
            .unwrap();
        let all = f
            .manager
            .get_environments(GetEnvironmentsScope::All)
            .await
            .unwrap();

        assert!(global.is_empty());
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_get_environments_fetches_uncached_project_only() {
        let f = fixture(&[&["default"]], &[]);
        f.manager.initialize().await;
        f.manager.clear_cache().await;

        let envs = f
            .manager
            .get_environments(GetEnvironmentsScope::Project(f.roots[0].join("src")))
            .await
            .unwrap();

        assert_eq!(envs.len(), 1);
        assert_eq!(f.hatch.show_calls.load(Ordering::SeqCst), 2);

        // Served from cache now.
        f.manager
            .get_environments(GetEnvironmentsScope::Project(f.roots[0].clone()))
            .await
            .unwrap();
        assert_eq!(f.hatch.show_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_broken_project_does_not_hide_others() {
        let f = fixture(&[&["default"], &["default"]], &[]);
        f.hatch.envs.lock().remove(&f.roots[1]);

        let all = f
            .manager
            .get_environments(GetEnvironmentsScope::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let err = f
            .manager
            .refresh(RefreshScope::Project(f.roots[1].clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Hatch(HatchError::Tool(_))));
    }

    #[tokio::test]
    async fn test_refresh_all_reports_failure_after_trying_every_project() {
        let f = fixture(&[&["default"], &["default"]], &[]);
        f.manager.initialize().await;
        f.hatch.envs.lock().remove(&f.roots[0]);

        let err = f.manager.refresh(RefreshScope::All).await.unwrap_err();
        assert!(matches!(err, ManagerError::Hatch(HatchError::Tool(_))));

        // The healthy project was still refreshed and the broken one kept its entry.
        assert_eq!(f.manager.cache().all().len(), 2);

        f.hatch.envs.lock().remove(&f.roots[1]);
        assert!(f.manager.refresh(RefreshScope::All).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_maps_interpreter_to_environment() {
        let f = fixture(&[&["default", "test"]], &[]);

        let interpreter = f.roots[0]
            .join(".venvs")
            .join("default")
            .join("bin")
            .join("python3.11");
        let found = f.manager.resolve(&interpreter).await.unwrap().unwrap();
        assert_eq!(found.name, "default");

        let elsewhere = f.roots[0].parent().unwrap().join("elsewhere/bin/python");
        assert!(f.manager.resolve(&elsewhere).await.unwrap().is_none());

        let err = f
            .manager
            .resolve(Path::new("relative/bin/python"))
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::UnsupportedPath(_)));
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let f = fixture(&[&["default", "test"]], &[]);
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].join("pkg"));

        f.manager.set(&[scope.clone()], Some(test_env.clone())).await.unwrap();

        assert_eq!(f.manager.get(&scope).await, Some(test_env.clone()));
        // Inherited below the assigned scope.
        let deeper = Scope::Path(f.roots[0].join("pkg").join("sub"));
        assert_eq!(f.manager.get(&deeper).await, Some(test_env));
    }

    #[tokio::test]
    async fn test_unset_falls_back_to_default() {
        let f = fixture(&[&["default", "test"]], &[]);
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].clone());

        f.manager.set(&[scope.clone()], Some(test_env)).await.unwrap();
        f.manager.set(&[scope.clone()], None).await.unwrap();

        let got = f.manager.get(&scope).await.unwrap();
        assert_eq!(got.name, "default");
        assert_eq!(got.project_path, f.roots[0]);
    }

    #[tokio::test]
    async fn test_global_scope_uses_global_assignment_then_first_default() {
        let f = fixture(&[&["default"], &["default", "lint"]], &[]);

        let fallback = f.manager.get(&Scope::Global).await.unwrap();
        assert_eq!(fallback.name, "default");

        let lint = env_named(&f, 1, "lint").await;
        f.manager.set(&[Scope::Global], Some(lint.clone())).await.unwrap();
        assert_eq!(f.manager.get(&Scope::Global).await, Some(lint.clone()));

        // Paths outside every project fall back to the global assignment.
        let outside = Scope::path(f.roots[0].parent().unwrap().join("not-a-project"));
        assert_eq!(f.manager.get(&outside).await, Some(lint));
    }

    #[tokio::test]
    async fn test_get_recreates_missing_environment() {
        let f = fixture(&[&["default"]], &["default"]);
        let scope = Scope::Path(f.roots[0].clone());

        let got = f.manager.get(&scope).await.unwrap();

        assert_eq!(f.hatch.create_calls.load(Ordering::SeqCst), 1);
        assert!(got.root_path.exists());
    }

    #[tokio::test]
    async fn test_get_returns_none_when_recreation_fails() {
        let f = fixture(&[&["default"]], &["default"]);
        f.hatch.fail_create.store(true, Ordering::SeqCst);

        assert!(f.manager.get(&Scope::Path(f.roots[0].clone())).await.is_none());
    }

    #[tokio::test]
    async fn test_set_creates_missing_environment_first() {
        let f = fixture(&[&["default", "test"]], &["test"]);
        let test_env = env_named(&f, 0, "test").await;
        assert!(!test_env.root_path.exists());

        f.manager
            .set(&[Scope::Path(f.roots[0].clone())], Some(test_env.clone()))
            .await
            .unwrap();

        assert!(test_env.root_path.exists());
    }

    #[tokio::test]
    async fn test_set_failure_leaves_assignment_untouched() {
        let f = fixture(&[&["default", "test"]], &["test"]);
        f.hatch.fail_create.store(true, Ordering::SeqCst);
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].clone());

        assert!(f.manager.set(&[scope.clone()], Some(test_env)).await.is_err());
        assert_eq!(f.manager.get(&scope).await.unwrap().name, "default");
    }

    #[tokio::test]
    async fn test_set_fires_only_on_identity_change() {
        let f = fixture(&[&["default", "test"]], &[]);
        let default = env_named(&f, 0, "default").await;
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].clone());
        let mut events = f.manager.on_did_change_environment();

        f.manager.set(&[scope.clone()], Some(test_env.clone())).await.unwrap();
        f.manager.set(&[scope.clone()], Some(test_env.clone())).await.unwrap();
        f.manager.set(&[scope.clone()], Some(default.clone())).await.unwrap();

        let first = events.try_recv().unwrap();
        assert_eq!(first.scope, scope);
        assert!(first.old.is_none());
        assert_eq!(first.new, Some(test_env.clone()));

        let second = events.try_recv().unwrap();
        assert_eq!(second.old, Some(test_env));
        assert_eq!(second.new, Some(default));

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_refresh_reports_full_swap() {
        let f = fixture(&[&["default", "test"]], &[]);
        f.manager.initialize().await;
        let before = f.manager.cache().get_cached(&f.roots[0]).unwrap();
        let mut events = f.manager.on_did_change_environments();

        f.manager
            .refresh(RefreshScope::Project(f.roots[0].clone()))
            .await
            .unwrap();

        let after = f.manager.cache().get_cached(&f.roots[0]).unwrap();
        assert_eq!(before, after);

        let changes = events.try_recv().unwrap();
        let kinds: Vec<EnvironmentChangeKind> = changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EnvironmentChangeKind::Remove,
                EnvironmentChangeKind::Remove,
                EnvironmentChangeKind::Add,
                EnvironmentChangeKind::Add,
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_assignments() {
        let f = fixture(&[&["default", "test"]], &[]);
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].clone());
        f.manager.set(&[scope.clone()], Some(test_env.clone())).await.unwrap();

        f.manager.clear_cache().await;

        assert!(f.manager.cache().all().is_empty());
        assert_eq!(f.manager.get(&scope).await, Some(test_env));
    }

    #[tokio::test]
    async fn test_create_requires_single_project_scope() {
        let f = fixture(&[&["default"], &["default"]], &[]);

        let global = f.manager.create(&[Scope::Global], "docs").await.unwrap_err();
        assert!(matches!(global, ManagerError::UnsupportedScope(_)));

        let both = [Scope::Path(f.roots[0].clone()), Scope::Path(f.roots[1].clone())];
        let many = f.manager.create(&both, "docs").await.unwrap_err();
        assert!(matches!(many, ManagerError::UnsupportedScope(_)));

        let created = f
            .manager
            .create(&[Scope::Path(f.roots[0].clone())], "docs")
            .await
            .unwrap();
        assert_eq!(created.name, "docs");
        assert!(created.root_path.exists());
        assert!(f.manager.cache().get_cached(&f.roots[0]).unwrap().get("docs").is_some());
    }

    #[tokio::test]
    async fn test_remove_drops_assignments() {
        let f = fixture(&[&["default", "test"]], &[]);
        let test_env = env_named(&f, 0, "test").await;
        let scope = Scope::Path(f.roots[0].clone());
        f.manager.set(&[scope.clone()], Some(test_env.clone())).await.unwrap();
        let mut events = f.manager.on_did_change_environment();

        f.manager.remove(&test_env).await.unwrap();

        assert!(!test_env.root_path.exists());
        let event = events.try_recv().unwrap();
        assert_eq!(event.old, Some(test_env));
        assert!(event.new.is_none());
        assert_eq!(f.manager.get(&scope).await.unwrap().name, "default");
    }
}
