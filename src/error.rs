use std::path::PathBuf;
use thiserror::Error;

pub const TOKEN_PAGE: &str = "https://github.com/settings/tokens";

#[derive(Error, Debug)]
pub enum DevsyncError {
    #[error("git error: {0}")]
    Git(#[from] VcsError),

    #[error("github error: {0}")]
    GitHub(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GITHUB_TOKEN is not set; create one at {}", TOKEN_PAGE)]
    MissingToken,

    #[error("not a repository url of the form https://host/OWNER/REPO: {0}")]
    InvalidUrl(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("module listed twice: {0}")]
    DuplicateModule(String),

    #[error("`{command}` failed in {}: {reason}", .dir.display())]
    Command {
        command: String,
        dir: PathBuf,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("destination {} already exists and is not empty", .0.display())]
    DestinationOccupied(PathBuf),

    #[error("{branch} has diverged from origin, merge manually")]
    Diverged { branch: String },

    #[error("HEAD is detached, nothing to pull")]
    DetachedHead,

    #[error(transparent)]
    Git(#[from] git2::Error),
}

impl From<figment::Error> for DevsyncError {
    fn from(e: figment::Error) -> Self {
        DevsyncError::Config(e.to_string())
    }
}

impl From<octocrab::Error> for DevsyncError {
    fn from(e: octocrab::Error) -> Self {
        DevsyncError::GitHub(e.to_string())
    }
}

impl From<git2::Error> for DevsyncError {
    fn from(e: git2::Error) -> Self {
        DevsyncError::Git(VcsError::Git(e))
    }
}

pub type Result<T> = std::result::Result<T, DevsyncError>;
