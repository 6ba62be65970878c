// src/system/hatch_cli.rs

use crate::models::{HatchEnvConfig, HatchEnvInfo};
use crate::system::executor::{ExternalToolError, ProcessRunner};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors from talking to the `hatch` CLI.
#[derive(Error, Debug)]
pub enum HatchError {
    #[error(transparent)]
    Tool(#[from] ExternalToolError),
    #[error("Could not parse environment listing for project '{}': {source}", .project.display())]
    InvalidJson {
        project: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Hatch did not report a location for environment '{name}' in project '{}'.", .project.display())]
    EnvNotFound { name: String, project: PathBuf },
}

type HatchResult<T> = Result<T, HatchError>;

/// Thin adapter over the `hatch env` subcommands.
/// Every invocation runs with the project root as working directory.
#[derive(Clone)]
pub struct HatchCli {
    runner: Arc<dyn ProcessRunner>,
    executable: String,
}

impl fmt::Debug for HatchCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HatchCli")
            .field("executable", &self.executable)
            .finish_non_exhaustive()
    }
}

impl HatchCli {
    /// Adapter invoking `executable` through `runner`.
    pub fn new(runner: Arc<dyn ProcessRunner>, executable: impl Into<String>) -> Self {
        Self {
            runner,
            executable: executable.into(),
        }
    }

    /// Lists every environment of a project together with its on-disk location.
    ///
    /// One `env show --json` call, then one `env find <name>` call per environment.
    pub async fn get_envs(&self, project: &Path) -> HatchResult<Vec<HatchEnvInfo>> {
        let configs = self.show_envs(project).await?;
        let mut envs = Vec::with_capacity(configs.len());
        for (name, config) in configs {
            let path = self.find_env(&name, project).await?;
            envs.push(HatchEnvInfo { name, path, config });
        }
        log::debug!(
            "Hatch reported {} environment(s) for '{}'",
            envs.len(),
            project.display()
        );
        Ok(envs)
    }

    /// Runs `hatch env show --json`.
    pub async fn show_envs(&self, project: &Path) -> HatchResult<BTreeMap<String, HatchEnvConfig>> {
        let json = self
            .runner
            .run(&self.executable, &["env", "show", "--json"], project)
            .await?;
        parse_env_listing(&json).map_err(|source| HatchError::InvalidJson {
            project: project.to_path_buf(),
            source,
        })
    }

    /// Runs `hatch env find <name>` and returns the first non-blank line.
    pub async fn find_env(&self, name: &str, project: &Path) -> HatchResult<PathBuf> {
        let output = self
            .runner
            .run(&self.executable, &["env", "find", name], project)
            .await?;
        first_non_blank_line(&output)
            .map(PathBuf::from)
            .ok_or_else(|| HatchError::EnvNotFound {
                name: name.to_string(),
                project: project.to_path_buf(),
            })
    }

    /// Runs `hatch env create <name>`.
    pub async fn create_env(&self, name: &str, project: &Path) -> HatchResult<()> {
        log::info!("Creating environment '{}' in '{}'", name, project.display());
        self.runner
            .run(&self.executable, &["env", "create", name], project)
            .await?;
        Ok(())
    }

    /// Runs `hatch env remove <name>`.
    pub async fn remove_env(&self, name: &str, project: &Path) -> HatchResult<()> {
        log::info!("Removing environment '{}' in '{}'", name, project.display());
        self.runner
            .run(&self.executable, &["env", "remove", name], project)
            .await?;
        Ok(())
    }
}

fn parse_env_listing(json: &str) -> Result<BTreeMap<String, HatchEnvConfig>, serde_json::Error> {
    serde_json::from_str(json)
}

fn first_non_blank_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}
