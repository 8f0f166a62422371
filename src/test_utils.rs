#![cfg(test)]

use crate::error::{DevsyncError, Result, VcsError};
use crate::git::types::PullStatus;
use crate::git::{Vcs, VcsResult};
use crate::github::types::RemoteRepo;
use crate::github::Hosting;
use crate::tooling::CommandRunner;
use git2::{Repository, RepositoryInitOptions, Signature};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Clone { url: String, dest: PathBuf },
    CloneBranch { url: String, dest: PathBuf, branch: String },
    Pull(PathBuf),
    CreateRemote { dir: PathBuf, name: String, url: String },
    AuthenticatedUser,
    Repository { owner: String, repo: String },
    CreateFork(String),
    Run { command: String, dir: PathBuf },
    Capture { command: String, dir: PathBuf },
}

/// Shared, ordered record of every call the fakes receive.
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn record(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }
}

pub struct FakeVcs {
    log: CallLog,
    failing_pulls: HashSet<PathBuf>,
    occupied: HashSet<PathBuf>,
}

impl FakeVcs {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing_pulls: HashSet::new(),
            occupied: HashSet::new(),
        }
    }

    pub fn failing_pull(mut self, dir: PathBuf) -> Self {
        self.failing_pulls.insert(dir);
        self
    }

    pub fn occupied(mut self, dest: PathBuf) -> Self {
        self.occupied.insert(dest);
        self
    }
}

impl Vcs for FakeVcs {
    fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<()> {
        self.log.record(Call::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        Ok(())
    }

    fn clone_branch(&self, url: &str, dest: &Path, branch: &str) -> VcsResult<()> {
        self.log.record(Call::CloneBranch {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            branch: branch.to_string(),
        });
        if self.occupied.contains(dest) {
            return Err(VcsError::DestinationOccupied(dest.to_path_buf()));
        }
        Ok(())
    }

    fn pull(&self, dir: &Path) -> VcsResult<PullStatus> {
        self.log.record(Call::Pull(dir.to_path_buf()));
        if self.failing_pulls.contains(dir) {
            return Err(VcsError::Git(git2::Error::from_str("could not resolve host")));
        }
        Ok(PullStatus::UpToDate)
    }

    fn create_remote(&self, dir: &Path, name: &str, url: &str) -> VcsResult<()> {
        self.log.record(Call::CreateRemote {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }
}

pub struct FakeHosting {
    log: CallLog,
    login: String,
    failing_forks: HashSet<String>,
}

impl FakeHosting {
    pub fn new(log: CallLog, login: &str) -> Self {
        Self {
            log,
            login: login.to_string(),
            failing_forks: HashSet::new(),
        }
    }

    pub fn failing_fork(mut self, full_name: &str) -> Self {
        self.failing_forks.insert(full_name.to_string());
        self
    }
}

impl Hosting for FakeHosting {
    fn authenticated_user(&self) -> Result<String> {
        self.log.record(Call::AuthenticatedUser);
        Ok(self.login.clone())
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<RemoteRepo> {
        self.log.record(Call::Repository {
            owner: owner.to_string(),
            repo: repo.to_string(),
        });
        Ok(RemoteRepo::new(owner, repo))
    }

    fn create_fork(&self, upstream: &RemoteRepo) -> Result<RemoteRepo> {
        self.log.record(Call::CreateFork(upstream.full_name()));
        if self.failing_forks.contains(&upstream.full_name()) {
            return Err(DevsyncError::GitHub("403 Forbidden".to_string()));
        }
        Ok(RemoteRepo::new(self.login.clone(), upstream.repo.clone()))
    }
}

/// Records commands and answers them from canned output. Commands listed in
/// `failing` exit non-zero.
pub struct FakeRunner {
    log: CallLog,
    outputs: HashMap<String, String>,
    failing: HashSet<(String, PathBuf)>,
}

impl FakeRunner {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            outputs: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn output(mut self, command: &str, stdout: &str) -> Self {
        self.outputs.insert(command.to_string(), stdout.to_string());
        self
    }

    pub fn failing(mut self, command: &str, dir: &Path) -> Self {
        self.failing.insert((command.to_string(), dir.to_path_buf()));
        self
    }
}

impl FakeRunner {
    fn answer(&self, program: &str, args: &[&str], dir: &Path, captured: bool) -> Result<String> {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let dir = dir.to_path_buf();
        self.log.record(if captured {
            Call::Capture {
                command: command.clone(),
                dir: dir.clone(),
            }
        } else {
            Call::Run {
                command: command.clone(),
                dir: dir.clone(),
            }
        });
        if self.failing.contains(&(command.clone(), dir.clone())) {
            return Err(DevsyncError::Command {
                command,
                dir,
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(self.outputs.get(&command).cloned().unwrap_or_default())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<()> {
        self.answer(program, args, dir, false).map(|_| ())
    }

    fn capture(&self, program: &str, args: &[&str], dir: &Path) -> Result<String> {
        self.answer(program, args, dir, true)
    }
}

pub fn init_repo(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    Repository::init_opts(path, &opts).unwrap()
}

pub fn commit_file(repo: &Repository, name: &str, content: &str) -> git2::Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::now("test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, &format!("add {name}"), &tree, &parents)
        .unwrap()
}
