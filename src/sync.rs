use crate::config::CloneProtocol;
use crate::error::{DevsyncError, Result, VcsError};
use crate::git::types::PullStatus;
use crate::git::Vcs;
use crate::github::types::RemoteRepo;
use crate::github::Hosting;
use crate::registry::{Registry, RepositoryEntry};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const UPSTREAM_REMOTE: &str = "upstream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Pull,
    Clone,
    ForkAndClone,
}

impl SyncAction {
    pub fn select(exists: bool, fork: bool) -> Self {
        match (exists, fork) {
            (true, _) => SyncAction::Pull,
            (false, false) => SyncAction::Clone,
            (false, true) => SyncAction::ForkAndClone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub pull: bool,
    pub fork: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            pull: true,
            fork: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkResult {
    pub fork: RemoteRepo,
    pub upstream_remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Pulled(PullStatus),
    PullSkipped,
    Cloned,
    Forked(ForkResult),
    /// The fork clone found the destination already populated and left it alone.
    DestinationOccupied,
}

#[derive(Debug)]
pub struct EntryOutcome {
    pub name: String,
    pub path: PathBuf,
    pub action: SyncAction,
    pub result: Result<SyncStatus>,
}

impl EntryOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Brings every module of a registry into the workspace, one at a time.
pub struct Synchronizer<V, H> {
    vcs: V,
    hosting: Option<H>,
    workspace: PathBuf,
    fork_branch: String,
    protocol: CloneProtocol,
}

impl<V: Vcs, H: Hosting> Synchronizer<V, H> {
    pub fn new(vcs: V, workspace: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            hosting: None,
            workspace: workspace.into(),
            fork_branch: "master".to_string(),
            protocol: CloneProtocol::Ssh,
        }
    }

    pub fn with_hosting(mut self, hosting: H) -> Self {
        self.hosting = Some(hosting);
        self
    }

    pub fn with_fork_branch(mut self, branch: impl Into<String>) -> Self {
        self.fork_branch = branch.into();
        self
    }

    pub fn with_protocol(mut self, protocol: CloneProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn local_path(&self, entry: &RepositoryEntry) -> PathBuf {
        self.workspace.join(&entry.name)
    }

    /// Starts a run over `registry`. Nothing happens until the returned
    /// iterator is advanced; each step fully processes one entry.
    ///
    /// Fork mode without a hosting client fails here, before any git or
    /// network call.
    pub fn sync<'a>(
        &'a self,
        registry: &'a Registry,
        options: SyncOptions,
    ) -> Result<SyncRun<'a, V, H>> {
        if options.fork && self.hosting.is_none() {
            return Err(DevsyncError::MissingToken);
        }
        Ok(SyncRun {
            synchronizer: self,
            entries: registry.entries().iter(),
            options,
        })
    }

    fn process(&self, entry: &RepositoryEntry, options: SyncOptions) -> EntryOutcome {
        let path = self.local_path(entry);
        let action = SyncAction::select(path.exists(), options.fork);
        info!("{}: {}", entry.name, entry.url);

        let result = match action {
            SyncAction::Pull if options.pull => {
                info!("updating git repo {}", entry.name);
                self.vcs
                    .pull(&path)
                    .map(SyncStatus::Pulled)
                    .map_err(DevsyncError::from)
            }
            SyncAction::Pull => {
                debug!("{} present, pull disabled", entry.name);
                Ok(SyncStatus::PullSkipped)
            }
            SyncAction::Clone => {
                info!("cloning {} into {}", entry.url, path.display());
                self.vcs
                    .clone_repo(&entry.url, &path)
                    .map(|_| SyncStatus::Cloned)
                    .map_err(DevsyncError::from)
            }
            SyncAction::ForkAndClone => match &self.hosting {
                Some(hosting) => self.fork_and_clone(hosting, entry, &path),
                None => Err(DevsyncError::MissingToken),
            },
        };

        match &result {
            Ok(status) => info!("{}: {}", entry.name, describe(status)),
            Err(e) => warn!("{}: {e}", entry.name),
        }

        EntryOutcome {
            name: entry.name.clone(),
            path,
            action,
            result,
        }
    }

    fn fork_and_clone(
        &self,
        hosting: &H,
        entry: &RepositoryEntry,
        path: &std::path::Path,
    ) -> Result<SyncStatus> {
        let coords = entry.coordinates()?;
        let login = hosting.authenticated_user()?;
        let upstream = hosting.repository(&coords.owner, &coords.repo)?;
        let fork = hosting.create_fork(&upstream)?;
        debug!("forked {} for {login}", upstream.full_name());

        let fork_url = self.protocol.url(&login, &fork.repo);
        match self.vcs.clone_branch(&fork_url, path, &self.fork_branch) {
            Ok(()) => {}
            Err(VcsError::DestinationOccupied(dest)) => {
                info!("{} already exists and is not empty, not cloning", dest.display());
                return Ok(SyncStatus::DestinationOccupied);
            }
            Err(e) => return Err(e.into()),
        }

        let upstream_url = self.protocol.url(&coords.owner, &coords.repo);
        self.vcs.create_remote(path, UPSTREAM_REMOTE, &upstream_url)?;

        Ok(SyncStatus::Forked(ForkResult {
            fork: RemoteRepo::new(login, fork.repo),
            upstream_remote: UPSTREAM_REMOTE.to_string(),
        }))
    }
}

fn describe(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Pulled(pull) => format!("update complete ({pull})"),
        SyncStatus::PullSkipped => "present, not pulled".to_string(),
        SyncStatus::Cloned => "cloned".to_string(),
        SyncStatus::Forked(result) => format!(
            "cloned fork {} with remote {}",
            result.fork.full_name(),
            result.upstream_remote
        ),
        SyncStatus::DestinationOccupied => "skipped, destination occupied".to_string(),
    }
}

/// Lazy sequence of per-entry outcomes, in registry order.
pub struct SyncRun<'a, V, H> {
    synchronizer: &'a Synchronizer<V, H>,
    entries: std::slice::Iter<'a, RepositoryEntry>,
    options: SyncOptions,
}

impl<V: Vcs, H: Hosting> Iterator for SyncRun<'_, V, H> {
    type Item = EntryOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(self.synchronizer.process(entry, self.options))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
