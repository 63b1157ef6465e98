//! Temporary working trees wired to a local bare remote
#![allow(dead_code)]

use git2::{Repository, RepositoryInitOptions, Signature};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BRANCH: &str = "main";

pub struct RemoteFixture {
    root: TempDir,
    pub remote: PathBuf,
    pub work: PathBuf,
}

impl RemoteFixture {
    /// Bare remote plus a working clone sharing one initial commit on `main`
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");

        let mut bare_opts = RepositoryInitOptions::new();
        bare_opts.bare(true).initial_head(BRANCH);
        Repository::init_opts(&remote, &bare_opts).unwrap();

        let mut work_opts = RepositoryInitOptions::new();
        work_opts.initial_head(BRANCH);
        let repo = Repository::init_opts(&work, &work_opts).unwrap();
        std::fs::write(work.join("README.md"), "# HFpEF trials data\n").unwrap();
        commit_all(&repo, "Initial commit");
        repo.remote("origin", remote.to_str().unwrap()).unwrap();
        push(&repo);

        Self {
            root,
            remote,
            work,
        }
    }

    /// A second clone of the remote, for racing pushes
    pub fn clone_into(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        Repository::clone(self.remote.to_str().unwrap(), &path).unwrap();
        path
    }

    pub fn remote_head(&self) -> git2::Oid {
        let repo = Repository::open_bare(&self.remote).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{BRANCH}")).unwrap();
        reference.target().unwrap()
    }

    /// Paths in the tree of the remote branch tip
    pub fn remote_files(&self) -> Vec<String> {
        let repo = Repository::open_bare(&self.remote).unwrap();
        let commit = repo.find_commit(self.remote_head()).unwrap();
        let mut files = Vec::new();
        commit
            .tree()
            .unwrap()
            .walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
                if entry.kind() == Some(git2::ObjectType::Blob) {
                    files.push(format!("{dir}{}", entry.name().unwrap()));
                }
                git2::TreeWalkResult::Ok
            })
            .unwrap();
        files.sort();
        files
    }

    pub fn remote_tree_id(&self) -> git2::Oid {
        let repo = Repository::open_bare(&self.remote).unwrap();
        let id = repo.find_commit(self.remote_head()).unwrap().tree_id();
        id
    }

    pub fn remote_author(&self) -> String {
        let repo = Repository::open_bare(&self.remote).unwrap();
        let commit = repo.find_commit(self.remote_head()).unwrap();
        let name = commit.author().name().unwrap().to_string();
        name
    }

    /// Create `name` at the current commit and point HEAD at it
    pub fn checkout_new_branch(&self, name: &str) {
        let repo = Repository::open(&self.work).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(name, &head, false).unwrap();
        repo.set_head(&format!("refs/heads/{name}")).unwrap();
    }

    pub fn remote_branch(&self, name: &str) -> Option<git2::Oid> {
        let repo = Repository::open_bare(&self.remote).unwrap();
        let target = repo
            .find_reference(&format!("refs/heads/{name}"))
            .ok()
            .and_then(|r| r.target());
        target
    }

    pub fn local_head(&self) -> git2::Oid {
        Repository::open(&self.work).unwrap().head().unwrap().target().unwrap()
    }
}

pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap();
}

pub fn push(repo: &Repository) {
    let mut remote = repo.find_remote("origin").unwrap();
    let refspec = format!("refs/heads/{BRANCH}:refs/heads/{BRANCH}");
    remote.push(&[refspec.as_str()], None).unwrap();
}

/// Commit a file in `path` and push it, moving the remote ahead
pub fn advance_remote_from(path: &Path, file: &str, content: &str) {
    let repo = Repository::open(path).unwrap();
    std::fs::write(path.join(file), content).unwrap();
    commit_all(&repo, "Concurrent update");
    push(&repo);
}
