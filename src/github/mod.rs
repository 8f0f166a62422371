pub mod client;
pub mod types;

use crate::error::Result;
use types::RemoteRepo;

/// The slice of the hosting API the fork workflow uses.
pub trait Hosting {
    /// Login of the user the token belongs to.
    fn authenticated_user(&self) -> Result<String>;

    fn repository(&self, owner: &str, repo: &str) -> Result<RemoteRepo>;

    /// Forks `upstream` under the authenticated user and returns the fork.
    fn create_fork(&self, upstream: &RemoteRepo) -> Result<RemoteRepo>;
}
