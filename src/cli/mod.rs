// src/cli/mod.rs

pub mod args;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    core::{
        env_manager::{EnvironmentManager, HatchEnvManager},
        projects::StaticProjects,
    },
    models::{EnvRef, GetEnvironmentsScope, Scope},
    settings::{self, Settings},
    system::executor::TokioProcessRunner,
};
use args::{CreateArgs, GetArgs, ListArgs, RemoveArgs, ResolveArgs};

/// hatch-envs: per-project Hatch environments, resolved and cached.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Project root to manage. Repeatable. Defaults to the configured projects,
    /// then to the current directory.
    #[arg(long = "project", short = 'p', global = true)]
    pub projects: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lists the environments of a project (or of every project).
    #[command(alias = "ls")]
    List(ListArgs),
    /// Shows the environment active for a path.
    Get(GetArgs),
    /// Finds the environment that contains an interpreter path.
    Resolve(ResolveArgs),
    /// Creates a Hatch environment in a project.
    Create(CreateArgs),
    /// Removes a Hatch environment from a project.
    #[command(alias = "rm")]
    Remove(RemoveArgs),
}

/// Builds the manager from settings and dispatches the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let settings = settings::load_settings().context("Failed to load settings")?;
    let cwd = env::current_dir()?;
    let roots = project_roots(&cli.projects, &settings, &cwd);
    log::debug!("Known projects: {:?}", roots);

    let manager = HatchEnvManager::from_settings(
        &settings,
        Arc::new(TokioProcessRunner::new()),
        Arc::new(StaticProjects::new(roots)),
    )?;

    match cli.command {
        Command::List(args) => {
            let scope = if args.all {
                GetEnvironmentsScope::All
            } else {
                GetEnvironmentsScope::Project(target_path(args.path, &cwd))
            };
            let envs = manager.get_environments(scope).await?;
            if envs.is_empty() {
                println!("{}", "No Hatch environments found.".yellow());
            }
            for env in &envs {
                print_env(env);
            }
        }
        Command::Get(args) => {
            let scope = if args.global {
                Scope::Global
            } else {
                Scope::Path(target_path(args.path, &cwd))
            };
            match manager.get(&scope).await {
                Some(env) => print_env(&env),
                None => println!("{} {}", "No environment for".yellow(), scope),
            }
        }
        Command::Resolve(args) => {
            let path = target_path(Some(args.path), &cwd);
            let env = manager
                .resolve(&path)
                .await?
                .ok_or_else(|| anyhow!("No Hatch environment contains '{}'.", path.display()))?;
            print_env(&env);
        }
        Command::Create(args) => {
            let scope = Scope::Path(target_path(args.path, &cwd));
            let env = manager.create(&[scope], &args.name).await?;
            println!("{} {}", "Created".green().bold(), env.name.cyan());
            print_env(&env);
        }
        Command::Remove(args) => {
            let project = target_path(args.path, &cwd);
            let env = manager
                .get_environments(GetEnvironmentsScope::Project(project.clone()))
                .await?
                .into_iter()
                .find(|e| e.name == args.name)
                .ok_or_else(|| {
                    anyhow!(
                        "Environment '{}' not found in project at '{}'.",
                        args.name,
                        project.display()
                    )
                })?;
            manager.remove(&env).await?;
            println!("{} {}", "Removed".green().bold(), env.name.cyan());
        }
    }
    Ok(())
}

/// Explicit `--project` flags win over configured projects; with neither,
/// the current directory is the only project.
fn project_roots(flags: &[PathBuf], settings: &Settings, cwd: &Path) -> Vec<PathBuf> {
    let chosen: &[PathBuf] = if !flags.is_empty() {
        flags
    } else if !settings.projects.is_empty() {
        &settings.projects
    } else {
        return vec![cwd.to_path_buf()];
    };
    chosen.iter().map(|p| absolutize(p, cwd)).collect()
}

fn target_path(path: Option<PathBuf>, cwd: &Path) -> PathBuf {
    match path {
        Some(p) => absolutize(&p, cwd),
        None => cwd.to_path_buf(),
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn print_env(env: &EnvRef) {
    println!(
        "{}  {}",
        env.display_name.cyan().bold(),
        env.executable_path.display().to_string().dimmed()
    );
    if let Some(description) = &env.description {
        println!("    {}", description);
    }
}
