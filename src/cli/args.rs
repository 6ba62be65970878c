// src/cli/args.rs
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// A path inside the project to list. Defaults to the current directory.
    pub path: Option<PathBuf>,

    /// List the environments of every known project.
    #[arg(long, conflicts_with = "path")]
    pub all: bool,
}

#[derive(Args, Debug, Default)]
pub struct GetArgs {
    /// The path whose active environment to show. Defaults to the current directory.
    pub path: Option<PathBuf>,

    /// Ask for the process-wide default instead of a path.
    #[arg(long, conflicts_with = "path")]
    pub global: bool,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// An interpreter (or any file) inside an environment.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// The Hatch environment name.
    pub name: String,

    /// A path inside the project. Defaults to the current directory.
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// The Hatch environment name.
    pub name: String,

    /// A path inside the project. Defaults to the current directory.
    pub path: Option<PathBuf>,
}
