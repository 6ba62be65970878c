// src/bin/hatch-envs.rs

use clap::Parser;
use colored::*;
use hatch_envs::cli::{self, Cli};

/// The main entry point of the `hatch-envs` application.
/// It sets up logging, parses arguments, and performs centralized error handling.
#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = cli::run(Cli::parse()).await {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
