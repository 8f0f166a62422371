use crate::config::Config;
use crate::error::{DevsyncError, Result};
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Runs external programs to completion in an explicit directory.
pub trait CommandRunner {
    /// Output goes straight to the terminal.
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<()>;

    /// Returns stdout instead of printing it.
    fn capture(&self, program: &str, args: &[&str], dir: &Path) -> Result<String>;
}

pub struct ShellRunner;

impl ShellRunner {
    fn command(program: &str, args: &[&str], dir: &Path) -> (String, Command) {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("running `{line}` in {}", dir.display());

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());
        (line, command)
    }
}

fn command_failed(line: String, dir: &Path, reason: String) -> DevsyncError {
    DevsyncError::Command {
        command: line,
        dir: dir.to_path_buf(),
        reason,
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<()> {
        let (line, mut command) = Self::command(program, args, dir);
        let status = command
            .stdout(Stdio::inherit())
            .status()
            .map_err(|e| command_failed(line.clone(), dir, e.to_string()))?;

        if !status.success() {
            return Err(command_failed(line, dir, status.to_string()));
        }
        Ok(())
    }

    fn capture(&self, program: &str, args: &[&str], dir: &Path) -> Result<String> {
        let (line, mut command) = Self::command(program, args, dir);
        let output = command
            .output()
            .map_err(|e| command_failed(line.clone(), dir, e.to_string()))?;

        if !output.status.success() {
            return Err(command_failed(line, dir, output.status.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondaAction {
    Create,
    Update,
}

/// Finds the first environment in `conda info --envs` output whose name
/// starts with `env`, returning its path.
pub fn find_conda_env<'a>(listing: &'a str, env: &str) -> Option<&'a str> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .find(|line| line.starts_with(env))
        .map(|line| line.split_whitespace().last().unwrap_or(line))
}

/// Creates the conda environment from the environment file, or updates it
/// when it already exists.
pub fn conda_install(runner: &impl CommandRunner, config: &Config) -> Result<CondaAction> {
    let root = config.resolved_root()?;
    let listing = runner.capture("conda", &["info", "--envs"], &root)?;

    let action = match find_conda_env(&listing, &config.conda_env) {
        Some(path) => {
            debug!("{} found here: {path}", config.conda_env);
            CondaAction::Update
        }
        None => CondaAction::Create,
    };

    let file = config.environment_file.to_string_lossy();
    let verb = match action {
        CondaAction::Create => "create",
        CondaAction::Update => "update",
    };
    info!("conda env {verb} from {file}");
    runner.run(
        "conda",
        &["env", verb, "-c", "conda-forge", "--file", &*file],
        &root,
    )?;
    Ok(action)
}

#[derive(Debug)]
pub struct ModuleInstall {
    pub name: String,
    pub path: PathBuf,
    pub result: Result<()>,
}

/// Installs the project requirements, then every module present in the
/// workspace in editable mode. A failing module does not stop the rest.
pub fn pip_install(
    runner: &impl CommandRunner,
    config: &Config,
    registry: &Registry,
) -> Result<Vec<ModuleInstall>> {
    let root = config.resolved_root()?;
    let workspace = config.workspace()?;

    let requirements = config.requirements_file.to_string_lossy();
    runner.run("pip", &["install", "-r", &*requirements], &root)?;

    let mut installs = Vec::new();
    for entry in registry.entries() {
        let path = workspace.join(&entry.name);
        if !path.exists() {
            debug!("{} not present, skipping", entry.name);
            continue;
        }

        info!("running pip install for module {}", entry.name);
        let result = runner.run("pip", &["install", "-e", "."], &path);
        match &result {
            Ok(()) => info!("pip install succeeded for {}", entry.name),
            Err(e) => error!("pip install FAILED for module {}: {e}", entry.name),
        }
        installs.push(ModuleInstall {
            name: entry.name.clone(),
            path,
            result,
        });
    }
    Ok(installs)
}
