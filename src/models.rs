// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// --- SCOPES ---

/// The context an environment query or assignment applies to.
///
/// `Global` is a real key of its own: it is not the same thing as
/// "nothing has been looked up yet".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// No path; the process-wide default.
    Global,
    /// A project root or any path below it.
    Path(PathBuf),
}

impl Scope {
    /// Builds a path scope.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "<global>"),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Scope accepted by `get_environments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetEnvironmentsScope {
    /// Interpreters not tied to any project. Always empty for this manager.
    Global,
    /// Every cached environment of every known project.
    All,
    /// Environments of the project containing this path.
    Project(PathBuf),
}

/// Scope accepted by `refresh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshScope {
    /// Re-fetch every known project.
    All,
    /// Re-fetch only the project containing this path.
    Project(PathBuf),
}

// --- HOST PROJECTS ---

/// A unit of source code recognized by the host, rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PythonProject {
    pub name: String,
    pub root: PathBuf,
}

impl PythonProject {
    /// Creates a project whose name is the last component of its root.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { name, root }
    }
}

// --- HATCH CONFIGURATION (as reported by `hatch env show --json`) ---

/// Installer used by Hatch to populate an environment.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Installer {
    Uv,
    Pip,
}

/// Platforms an environment may be restricted to.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
}

/// The configuration object Hatch reports for one environment.
/// Only read, never written back; unknown keys are ignored.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct HatchEnvConfig {
    pub installer: Option<Installer>,
    #[serde(rename = "type")]
    pub env_type: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub extra_dependencies: Vec<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub default_args: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub python: Option<String>,
    #[serde(default)]
    pub skip_install: bool,
    #[serde(default)]
    pub pre_install_commands: Vec<String>,
    #[serde(default)]
    pub post_install_commands: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    pub description: Option<String>,
}

/// One environment of a project: its Hatch name, configuration and on-disk root.
#[derive(Debug, Clone, PartialEq)]
pub struct HatchEnvInfo {
    pub name: String,
    pub path: PathBuf,
    pub config: HatchEnvConfig,
}

// --- ENVIRONMENT DESCRIPTORS ---

/// Identity of a descriptor. Two projects may both define an environment
/// called `default`, so the project root is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentId {
    pub manager_id: String,
    pub project: PathBuf,
    pub name: String,
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}::{}",
            self.manager_id,
            self.project.display(),
            self.name
        )
    }
}

/// A shell command line: executable plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub executable: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new(executable: impl Into<String>, args: &[&str]) -> Self {
        Self {
            executable: executable.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// A runnable Python environment. Immutable once built; shared as `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDescriptor {
    pub id: EnvironmentId,
    /// Hatch-level environment name (`default`, `test`, ...).
    pub name: String,
    /// Root of the project that declares this environment.
    pub project_path: PathBuf,
    /// Root directory of the virtual environment.
    pub root_path: PathBuf,
    /// Python interpreter inside `root_path`.
    pub executable_path: PathBuf,
    pub description: Option<String>,
    pub display_name: String,
    pub display_path: String,
    pub tooltip: String,
    pub activation: Option<Vec<ShellCommand>>,
    pub deactivation: Option<Vec<ShellCommand>>,
}

/// Shared handle to a descriptor.
pub type EnvRef = Arc<EnvironmentDescriptor>;

/// The environments of one project, keyed by Hatch name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectEnvironmentSet {
    envs: BTreeMap<String, EnvRef>,
}

impl ProjectEnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor, replacing any previous one with the same name.
    pub fn insert(&mut self, env: EnvRef) {
        self.envs.insert(env.name.clone(), env);
    }

    pub fn get(&self, name: &str) -> Option<&EnvRef> {
        self.envs.get(name)
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    /// Clones the descriptor handles into a vector.
    pub fn to_vec(&self) -> Vec<EnvRef> {
        self.envs.values().cloned().collect()
    }
}

impl FromIterator<EnvRef> for ProjectEnvironmentSet {
    fn from_iter<T: IntoIterator<Item = EnvRef>>(iter: T) -> Self {
        let mut set = Self::new();
        for env in iter {
            set.insert(env);
        }
        set
    }
}

// --- CHANGE EVENTS ---

/// The active environment of a scope changed.
#[derive(Debug, Clone)]
pub struct DidChangeEnvironment {
    pub scope: Scope,
    pub old: Option<EnvRef>,
    pub new: Option<EnvRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentChangeKind {
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct EnvironmentChange {
    pub kind: EnvironmentChangeKind,
    pub environment: EnvRef,
}

/// The cache contents changed: removals first, then additions.
pub type DidChangeEnvironments = Vec<EnvironmentChange>;
