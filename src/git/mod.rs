pub mod repo;
pub mod types;

use crate::error::VcsError;
use std::path::Path;
use types::PullStatus;

pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Version-control operations the synchronizer needs. Every call takes the
/// working copy as an explicit path.
pub trait Vcs {
    fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<()>;

    fn clone_branch(&self, url: &str, dest: &Path, branch: &str) -> VcsResult<()>;

    fn pull(&self, dir: &Path) -> VcsResult<PullStatus>;

    fn create_remote(&self, dir: &Path, name: &str, url: &str) -> VcsResult<()>;
}
