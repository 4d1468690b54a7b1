/*!
 * Version-control collaborator.
 *
 * The engine reads two things from version control: the zero-context diff
 * between two revisions and a file's full text at a revision. Nothing is
 * ever written back.
 *
 * - `git`: adapter around the git command line
 * - `cache`: memoizing wrapper used for the duration of one computation
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

use crate::compute::diff::FilePatch;

pub mod cache;
pub mod git;

pub use cache::CachedVersionControl;
pub use git::GitCli;

/// Read-only access to a repository's history
#[async_trait]
pub trait VersionControl: Send + Sync + Debug {
    /// Name of the repository, used to tag computed operations
    fn repository_name(&self) -> String;

    /// Changed files between two revisions, with zero-context hunks
    async fn changed_files(&self, from_revision: &str, to_revision: &str) -> Result<Vec<FilePatch>>;

    /// Full text of a file at a revision
    async fn file_contents(&self, path: &str, revision: &str) -> Result<String>;
}
