/*!
 * Git command line adapter.
 */

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use crate::compute::diff::{parse_unified_diff, FilePatch};

use super::VersionControl;

/// Reads diffs and blobs by running `git` in a working copy
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    name: String,
}

impl GitCli {
    /// Adapter for the repository at `repo_dir`, named after the directory
    pub fn new<P: AsRef<Path>>(repo_dir: P) -> Self {
        let repo_dir = repo_dir.as_ref().to_path_buf();
        let name = repo_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { repo_dir, name }
    }

    /// Override the repository name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!("Running git {} in {:?}", args.join(" "), self.repo_dir);
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to execute git command: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("git {} failed: {}", args.join(" "), stderr.trim());
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }

        String::from_utf8(output.stdout).context("git produced non UTF-8 output")
    }
}

#[async_trait]
impl VersionControl for GitCli {
    fn repository_name(&self) -> String {
        self.name.clone()
    }

    async fn changed_files(&self, from_revision: &str, to_revision: &str) -> Result<Vec<FilePatch>> {
        let diff = self
            .git(&["diff", "-U0", "--no-color", "--no-ext-diff", from_revision, to_revision])
            .await?;
        parse_unified_diff(&diff)
            .with_context(|| format!("Failed to parse diff {}..{}", from_revision, to_revision))
    }

    async fn file_contents(&self, path: &str, revision: &str) -> Result<String> {
        let object = format!("{}:{}", revision, path);
        self.git(&["show", object.as_str()])
            .await
            .with_context(|| format!("Failed to read {} at {}", path, revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_shouldNameAfterDirectory() {
        let git = GitCli::new("/data/repos/english");
        assert_eq!(git.repository_name(), "english");
        assert_eq!(git.with_name("eng").repository_name(), "eng");
    }

    #[tokio::test]
    async fn test_changedFiles_notARepository_shouldFail() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(dir.path());
        assert!(git.changed_files("HEAD~1", "HEAD").await.is_err());
    }
}
