//! Git operations module
//!
//! Trait-based access to the working tree the pipeline publishes from,
//! backed by libgit2.

pub mod operations;

pub use operations::{CommitAuthor, Git2Operations, GitOperations, PushStatus};
