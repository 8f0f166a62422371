mod config;
mod error;
mod git;
mod github;
mod logging;
mod registry;
mod sync;
#[cfg(test)]
mod test_utils;
mod tooling;

use clap::{Parser, Subcommand};
use config::Config;
use error::Result;
use git::repo::Git2Vcs;
use github::client::GitHubClient;
use std::path::PathBuf;
use std::process::ExitCode;
use sync::{SyncOptions, Synchronizer};
use tooling::ShellRunner;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "devsync",
    about = "Bootstrap and sync the module repositories of a multi-repo project",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, help = "Project root; modules live next to it")]
    root: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Log debug output")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull, clone or fork every module
    Sync {
        #[arg(long, help = "Leave existing working copies untouched")]
        no_pull: bool,

        #[arg(long, help = "Fork missing modules under your account (needs GITHUB_TOKEN)")]
        fork: bool,

        #[arg(long, value_name = "NAME", num_args = 1.., help = "Only these modules")]
        only: Vec<String>,

        #[arg(long, help = "Exit non-zero if any module failed")]
        strict: bool,
    },

    /// Show the modules and whether they are present
    List,

    /// Create or update the conda environment
    Conda,

    /// Install requirements and every present module in editable mode
    Pip,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("ignoring .env: {e}");
        }
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.root)?;
    let registry = config.registry()?;

    match cli.command {
        Commands::Sync {
            no_pull,
            fork,
            only,
            strict,
        } => {
            let registry = if only.is_empty() {
                registry
            } else {
                registry.select(&only)?
            };
            let options = SyncOptions {
                pull: !no_pull,
                fork,
            };

            let workspace = config.workspace()?;
            info!("folder: {}", workspace.display());

            let vcs = Git2Vcs::new(config.token().map(String::from));
            let mut synchronizer = Synchronizer::new(vcs, workspace)
                .with_fork_branch(config.fork_branch.clone())
                .with_protocol(config.clone_protocol);
            if fork {
                let token = config.require_token()?;
                synchronizer = synchronizer.with_hosting(GitHubClient::new(token)?);
            }

            if registry.is_empty() {
                warn!("no modules configured");
            }
            info!("syncing {} modules", registry.len());

            let failed: Vec<_> = synchronizer
                .sync(&registry, options)?
                .filter(|outcome| outcome.is_failure())
                .collect();
            for outcome in &failed {
                warn!(
                    "{} ({:?}) failed in {}",
                    outcome.name,
                    outcome.action,
                    outcome.path.display()
                );
            }
            info!("{} modules processed, {} failed", registry.len(), failed.len());

            if strict && !failed.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List => {
            let workspace = config.workspace()?;
            for entry in registry.entries() {
                let state = if workspace.join(&entry.name).exists() {
                    "present"
                } else {
                    "missing"
                };
                println!("{:<20} {:<8} {}", entry.name, state, entry.url);
            }
        }
        Commands::Conda => {
            let action = tooling::conda_install(&ShellRunner, &config)?;
            info!("conda environment {}: {action:?}", config.conda_env);
        }
        Commands::Pip => {
            let installs = tooling::pip_install(&ShellRunner, &config, &registry)?;
            let failed: Vec<_> = installs.iter().filter(|i| i.result.is_err()).collect();
            for install in &failed {
                warn!("{} not installed ({})", install.name, install.path.display());
            }
            info!(
                "{} modules installed, {} failed",
                installs.len() - failed.len(),
                failed.len()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
