use crate::error::{DevsyncError, Result};
use crate::registry::{Registry, RepositoryEntry};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Value some `.env` files carry in place of a real token.
pub const TOKEN_SENTINEL: &str = "NO_TOKEN";

const PROJECT_FILE: &str = "devsync.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneProtocol {
    Ssh,
    Https,
}

impl CloneProtocol {
    pub fn url(&self, owner: &str, repo: &str) -> String {
        match self {
            CloneProtocol::Ssh => format!("git@github.com:{owner}/{repo}.git"),
            CloneProtocol::Https => format!("https://github.com/{owner}/{repo}.git"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub project_root: PathBuf,
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,
    pub github_token: Option<String>,
    pub clone_protocol: CloneProtocol,
    pub fork_branch: String,
    pub conda_env: String,
    pub environment_file: PathBuf,
    pub requirements_file: PathBuf,
    #[serde(default)]
    pub modules: Vec<RepositoryEntry>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("project_root", &self.project_root)
            .field("workspace_dir", &self.workspace_dir)
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("clone_protocol", &self.clone_protocol)
            .field("fork_branch", &self.fork_branch)
            .field("conda_env", &self.conda_env)
            .field("environment_file", &self.environment_file)
            .field("requirements_file", &self.requirements_file)
            .field("modules", &self.modules)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            workspace_dir: None,
            github_token: None,
            clone_protocol: CloneProtocol::Ssh,
            fork_branch: "master".to_string(),
            conda_env: "compas".to_string(),
            environment_file: PathBuf::from("environment.yml"),
            requirements_file: PathBuf::from("requirements.txt"),
            modules: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(cli_root: Option<PathBuf>) -> Result<Self> {
        let user_file = config_dir().join("devsync").join("config.toml");
        let root = cli_root.clone().unwrap_or_else(|| PathBuf::from("."));
        Self::figment(&user_file, &root.join(PROJECT_FILE), cli_root)
            .extract()
            .map_err(DevsyncError::from)
    }

    fn figment(user_file: &Path, project_file: &Path, cli_root: Option<PathBuf>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if user_file.exists() {
            figment = figment.merge(Toml::file(user_file));
        }
        if project_file.exists() {
            figment = figment.merge(Toml::file(project_file));
        }

        figment = figment.merge(Env::prefixed("DEVSYNC_")).merge(
            Env::raw()
                .only(&["GITHUB_TOKEN"])
                .map(|_| "github_token".into()),
        );

        if let Some(path) = cli_root {
            figment = figment.merge(Serialized::default("project_root", path));
        }

        figment
    }

    pub fn registry(&self) -> Result<Registry> {
        if self.modules.is_empty() {
            Ok(Registry::default())
        } else {
            Registry::new(self.modules.clone())
        }
    }

    /// The token, unless it is unset, blank or the placeholder value.
    pub fn token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != TOKEN_SENTINEL)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token().ok_or(DevsyncError::MissingToken)
    }

    pub fn resolved_root(&self) -> Result<PathBuf> {
        self.project_root.canonicalize().map_err(|e| {
            DevsyncError::Config(format!(
                "project root {}: {e}",
                self.project_root.display()
            ))
        })
    }

    /// Directory the modules live in: the explicit override (relative to the
    /// project root), or the parent of the project root.
    pub fn workspace(&self) -> Result<PathBuf> {
        let root = self.resolved_root()?;
        if let Some(dir) = &self.workspace_dir {
            return Ok(root.join(dir));
        }
        root.parent().map(Path::to_path_buf).ok_or_else(|| {
            DevsyncError::Config(format!("project root {} has no parent", root.display()))
        })
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
