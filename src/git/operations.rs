use anyhow::{Context, Result};
use git2::{Cred, ErrorCode, PushOptions, RemoteCallbacks, Repository, Signature, Tree};
use std::path::Path;
use tracing::{debug, warn};

/// Identity recorded on data commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Outcome of a push the remote answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Accepted,
    /// The remote refused the update (non-fast-forward, protected branch, ...)
    Rejected(String),
}

/// Git operations the publisher needs (replaces `git add/commit/push`)
#[cfg_attr(test, mockall::automock)]
pub trait GitOperations {
    /// Stage exactly these paths, relative to the working tree root.
    /// Paths deleted from disk are staged as removals.
    fn stage_paths(&self, paths: &[String]) -> Result<()>;

    /// Paths whose index entry differs from HEAD (replaces `git diff --staged --name-only`)
    fn staged_changes(&self) -> Result<Vec<String>>;

    /// Commit the index on top of HEAD, returning the new commit id
    fn commit(&self, author: &CommitAuthor, message: &str) -> Result<String>;

    /// Branch HEAD points to, also when HEAD is unborn
    fn current_branch(&self) -> Result<String>;

    /// Push `branch` to the same name on `remote`
    fn push(&self, remote: &str, branch: &str) -> Result<PushStatus>;

    /// Commit id HEAD resolves to, `None` before the first commit
    fn head_commit(&self) -> Result<Option<String>>;
}

/// Implementation of GitOperations using git2
pub struct Git2Operations {
    repo: Repository,
    token: Option<String>,
}

impl Git2Operations {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self { repo, token: None })
    }

    /// Authenticate HTTPS pushes with this token (`x-access-token` user)
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to resolve HEAD"),
        }
    }

    fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working tree (bare repositories cannot be published from)")
    }
}

impl GitOperations for Git2Operations {
    fn stage_paths(&self, paths: &[String]) -> Result<()> {
        let workdir = self.workdir()?.to_path_buf();
        let mut index = self.repo.index().context("Failed to open index")?;

        let (present, gone): (Vec<&String>, Vec<&String>) =
            paths.iter().partition(|p| workdir.join(p.as_str()).exists());

        for path in present {
            index
                .add_path(Path::new(path.as_str()))
                .with_context(|| format!("Failed to stage {path}"))?;
        }

        for path in gone {
            debug!(path = %path, "Staging removal");
            if let Err(e) = index.remove_path(Path::new(path.as_str())) {
                warn!(path = %path, error = %e, "Could not stage removal");
            }
        }

        index.write().context("Failed to write index")?;
        Ok(())
    }

    fn staged_changes(&self) -> Result<Vec<String>> {
        let head_tree = self.head_tree()?;
        let index = self.repo.index()?;
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)
            .context("Failed to diff index against HEAD")?;

        let mut changed: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        changed.sort();
        changed.dedup();
        Ok(changed)
    }

    fn commit(&self, author: &CommitAuthor, message: &str) -> Result<String> {
        let signature = Signature::now(&author.name, &author.email)
            .context("Failed to create commit signature")?;

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree().context("Failed to write tree from index")?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e).context("Failed to resolve HEAD"),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .context("Failed to create commit")?;

        Ok(oid.to_string())
    }

    fn current_branch(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) => {
                if !head.is_branch() {
                    anyhow::bail!("HEAD is detached; check out a branch before publishing");
                }
                head.shorthand()
                    .map(str::to_string)
                    .context("Branch name is not valid UTF-8")
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                let target = head.symbolic_target().context("HEAD is not a symbolic reference")?;
                Ok(target.trim_start_matches("refs/heads/").to_string())
            }
            Err(e) => Err(e).context("Failed to resolve HEAD"),
        }
    }

    fn push(&self, remote_name: &str, branch: &str) -> Result<PushStatus> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .with_context(|| format!("Remote '{remote_name}' not found"))?;

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let token = self.token.as_deref();
        let mut rejection: Option<String> = None;

        let result = {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(|_url, username_from_url, _allowed_types| match token {
                Some(token) => Cred::userpass_plaintext("x-access-token", token),
                None => Cred::default().or_else(|_| Cred::username(username_from_url.unwrap_or("git"))),
            });
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{refname}: {status}"));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote.push(&[&refspec], Some(&mut push_options))
        };

        match result {
            Ok(()) => Ok(rejection.map_or(PushStatus::Accepted, PushStatus::Rejected)),
            Err(e) if e.code() == ErrorCode::NotFastForward => {
                Ok(PushStatus::Rejected(e.message().to_string()))
            }
            Err(e) => Err(e).with_context(|| format!("Failed to push {branch} to {remote_name}")),
        }
    }

    fn head_commit(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to resolve HEAD"),
        }
    }
}
