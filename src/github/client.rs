use crate::error::{DevsyncError, Result};
use crate::github::types::RemoteRepo;
use crate::github::Hosting;
use octocrab::models::Repository;
use octocrab::Octocrab;
use tokio::runtime::Runtime;

/// GitHub client for the fork workflow. octocrab is async, so every call is
/// driven to completion on a private current-thread runtime.
pub struct GitHubClient {
    octo: Octocrab,
    runtime: Runtime,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let octo = {
            let _guard = runtime.enter();
            Octocrab::builder()
                .personal_token(token.to_string())
                .build()?
        };

        Ok(Self { octo, runtime })
    }
}

impl Hosting for GitHubClient {
    fn authenticated_user(&self) -> Result<String> {
        let user = self.runtime.block_on(self.octo.current().user())?;
        Ok(user.login)
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<RemoteRepo> {
        let found = self.runtime.block_on(self.octo.repos(owner, repo).get())?;
        Ok(to_remote(found, owner))
    }

    fn create_fork(&self, upstream: &RemoteRepo) -> Result<RemoteRepo> {
        let fork = self.runtime.block_on(
            self.octo
                .repos(&upstream.owner, &upstream.repo)
                .create_fork()
                .send(),
        )?;
        let owner = fork
            .owner
            .as_ref()
            .map(|o| o.login.clone())
            .ok_or_else(|| {
                DevsyncError::GitHub(format!("fork of {} has no owner", upstream.full_name()))
            })?;
        Ok(to_remote(fork, &owner))
    }
}

fn to_remote(repo: Repository, fallback_owner: &str) -> RemoteRepo {
    let owner = repo
        .owner
        .map(|o| o.login)
        .unwrap_or_else(|| fallback_owner.to_string());
    RemoteRepo::new(owner, repo.name)
}
