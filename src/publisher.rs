//! Publisher
//!
//! Stages exactly the output set, commits it under the automation identity
//! and pushes to the remote branch. An unchanged output set is a failure,
//! not a silent no-op.

use tracing::{info, warn};

use crate::config::PublishConfig;
use crate::error::PipelineError;
use crate::git::{CommitAuthor, GitOperations, PushStatus};
use crate::outputs::OutputSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub commit: String,
    pub branch: String,
    /// Paths that differed from HEAD
    pub changed: Vec<String>,
    pub pushed: bool,
}

pub struct Publisher {
    git: Box<dyn GitOperations>,
    config: PublishConfig,
    remote: String,
    branch: Option<String>,
}

impl Publisher {
    pub fn new(git: Box<dyn GitOperations>, config: PublishConfig, remote: String, branch: Option<String>) -> Self {
        Self {
            git,
            config,
            remote,
            branch,
        }
    }

    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.config.author_name.clone(),
            email: self.config.author_email.clone(),
        }
    }

    pub fn publish(&self, outputs: &OutputSet) -> Result<PublishReport, PipelineError> {
        // The commit lands on HEAD, so HEAD must be the branch that gets pushed
        let branch = self.git.current_branch().map_err(PipelineError::Git)?;
        if let Some(configured) = &self.branch {
            if *configured != branch {
                return Err(PipelineError::Config(format!(
                    "HEAD is on '{branch}' but repository.branch is '{configured}'; check out '{configured}' before publishing"
                )));
            }
        }

        let paths = outputs.relative_paths();
        self.git.stage_paths(&paths).map_err(PipelineError::Git)?;

        let changed = self.git.staged_changes().map_err(PipelineError::Git)?;
        if changed.is_empty() {
            warn!("Output set identical to HEAD, nothing to commit");
            return Err(PipelineError::NothingToCommit);
        }
        info!(files = changed.len(), "Staged output changes");

        let commit = self
            .git
            .commit(&self.author(), &self.config.message)
            .map_err(PipelineError::Git)?;
        info!(commit = %commit, "Committed data update");

        if !self.config.enabled {
            info!("Push disabled, leaving commit local");
            return Ok(PublishReport {
                commit,
                branch,
                changed,
                pushed: false,
            });
        }

        let rejected = |message: String| PipelineError::PushRejected {
            remote: self.remote.clone(),
            branch: branch.clone(),
            message,
        };

        match self.git.push(&self.remote, &branch) {
            Ok(PushStatus::Accepted) => {}
            Ok(PushStatus::Rejected(message)) => return Err(rejected(message)),
            Err(e) => return Err(rejected(format!("{e:#}"))),
        }
        info!(remote = %self.remote, branch = %branch, "Pushed data update");

        Ok(PublishReport {
            commit,
            branch,
            changed,
            pushed: true,
        })
    }
}
