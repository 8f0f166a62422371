use crate::error::VcsError;
use crate::git::types::PullStatus;
use crate::git::{Vcs, VcsResult};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, CredentialType, ErrorCode, FetchOptions, RemoteCallbacks, Repository};
use std::cell::Cell;
use std::path::Path;
use tracing::debug;

// libgit2 keeps asking while the callback keeps answering
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// libgit2-backed [`Vcs`]. The token, when present, authenticates https remotes.
#[derive(Clone, Default)]
pub struct Git2Vcs {
    token: Option<String>,
}

impl Git2Vcs {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    fn fetch_options<'a>(&'a self, attempts: &'a Cell<u32>) -> FetchOptions<'a> {
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |url, username, allowed| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str(&format!(
                    "authentication failed for {url}"
                )));
            }
            let git_config = git2::Config::open_default()?;
            self.credentials(&git_config, url, username, allowed)
        });

        callbacks.transfer_progress(|stats| {
            if stats.total_objects() > 0 && stats.received_objects() == stats.total_objects() {
                debug!(
                    "resolving deltas {}/{}",
                    stats.indexed_deltas(),
                    stats.total_deltas()
                );
            }
            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options
    }

    /// ssh-agent for ssh remotes; the token, or git's credential helpers, for
    /// https.
    fn credentials(
        &self,
        git_config: &git2::Config,
        url: &str,
        username: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return match &self.token {
                Some(token) => Cred::userpass_plaintext("x-access-token", token),
                None => Cred::credential_helper(git_config, url, username),
            };
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        Err(git2::Error::from_str(&format!(
            "no supported credential type for {url}"
        )))
    }

    fn clone_into(&self, url: &str, dest: &Path, branch: Option<&str>) -> VcsResult<()> {
        if is_occupied(dest) {
            return Err(VcsError::DestinationOccupied(dest.to_path_buf()));
        }

        let attempts = Cell::new(0);
        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_options(&attempts));
        if let Some(branch) = branch {
            builder.branch(branch);
        }

        builder.clone(url, dest).map(|_| ()).map_err(|e| {
            if e.code() == ErrorCode::Exists {
                VcsError::DestinationOccupied(dest.to_path_buf())
            } else {
                VcsError::Git(e)
            }
        })
    }
}

impl Vcs for Git2Vcs {
    fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<()> {
        self.clone_into(url, dest, None)
    }

    fn clone_branch(&self, url: &str, dest: &Path, branch: &str) -> VcsResult<()> {
        self.clone_into(url, dest, Some(branch))
    }

    fn pull(&self, dir: &Path) -> VcsResult<PullStatus> {
        let repo = Repository::open(dir)?;

        let head = repo.head()?;
        if !head.is_branch() {
            return Err(VcsError::DetachedHead);
        }
        let branch = head.shorthand().ok_or(VcsError::DetachedHead)?.to_string();

        let attempts = Cell::new(0);
        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[&branch], Some(&mut self.fetch_options(&attempts)), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            return Ok(PullStatus::UpToDate);
        }
        if !analysis.is_fast_forward() {
            return Err(VcsError::Diverged { branch });
        }

        // Check out against the old HEAD first so local edits abort the update.
        let target = repo.find_object(incoming.id(), None)?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;

        let refname = format!("refs/heads/{branch}");
        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(incoming.id(), "devsync: fast-forward")?;
        repo.set_head(&refname)?;

        Ok(PullStatus::FastForwarded)
    }

    fn create_remote(&self, dir: &Path, name: &str, url: &str) -> VcsResult<()> {
        let repo = Repository::open(dir)?;
        repo.remote(name, url)?;
        Ok(())
    }
}

fn is_occupied(dest: &Path) -> bool {
    std::fs::read_dir(dest)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
