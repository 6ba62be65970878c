// src/core/projects.rs

use crate::core::paths;
use crate::models::PythonProject;
use std::path::{Path, PathBuf};

/// The host's view of which projects exist.
pub trait ProjectRegistry: Send + Sync {
    /// Every project currently known to the host.
    fn projects(&self) -> Vec<PythonProject>;

    /// The project that contains `path`, if any.
    fn project_for(&self, path: &Path) -> Option<PythonProject>;
}

/// A fixed set of project roots.
#[derive(Debug, Default, Clone)]
pub struct StaticProjects {
    projects: Vec<PythonProject>,
}

impl StaticProjects {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut projects: Vec<PythonProject> = Vec::new();
        for root in roots {
            let root = dunce::simplified(&root).to_path_buf();
            if projects.iter().any(|p| p.root == root) {
                continue;
            }
            projects.push(PythonProject::from_root(root));
        }
        Self { projects }
    }
}

impl ProjectRegistry for StaticProjects {
    fn projects(&self) -> Vec<PythonProject> {
        self.projects.clone()
    }

    /// Nested projects resolve to the innermost root.
    fn project_for(&self, path: &Path) -> Option<PythonProject> {
        self.projects
            .iter()
            .filter(|p| paths::is_ancestor_or_self(&p.root, path))
            .max_by_key(|p| p.root.components().count())
            .cloned()
    }
}
