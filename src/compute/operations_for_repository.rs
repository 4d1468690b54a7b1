/*!
 * Computes subtitle operations for an entire repository, going from one
 * revision to another.
 *
 * Files are independent, so they are computed concurrently. A file that
 * fails is reported and left out; the other files still produce their
 * operations.
 */

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use log::{debug, error, info};
use regex::Regex;

use crate::compute::diff::FilePatch;
use crate::subtitle::{OperationsForFile, OperationsForRepository};
use crate::vcs::VersionControl;

use super::operations_for_file::{extract_file_identity, FileRevisions, SubtitleOperationsForFile};

/// A file whose operations could not be computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Operations for every file that succeeded plus the files that failed
#[derive(Debug, Clone)]
pub struct RepositoryOperations {
    pub operations: OperationsForRepository,
    pub failures: Vec<FileFailure>,
}

impl RepositoryOperations {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Computes operations for all changed content files of a repository
#[derive(Debug)]
pub struct SubtitleOperationsForRepository<V: VersionControl> {
    vcs: V,
    computer: SubtitleOperationsForFile,
    content_pattern: Regex,
    existing_stids: HashMap<String, Vec<String>>,
}

impl<V: VersionControl> SubtitleOperationsForRepository<V> {
    /// Runner over `vcs`, tracking files whose path matches `content_pattern`
    pub fn new(vcs: V, computer: SubtitleOperationsForFile, content_pattern: Regex) -> Self {
        Self {
            vcs,
            computer,
            content_pattern,
            existing_stids: HashMap::new(),
        }
    }

    /// Persistent ids of the old revision's subtitles, keyed by file identity
    pub fn with_existing_stids(mut self, existing_stids: HashMap<String, Vec<String>>) -> Self {
        self.existing_stids = existing_stids;
        self
    }

    /// Whether a path belongs to the content area
    pub fn is_content_file(&self, path: &str) -> bool {
        self.content_pattern.is_match(path)
    }

    /// Compute operations for every changed content file between the two revisions
    pub async fn compute(&self, from_revision: &str, to_revision: &str) -> Result<RepositoryOperations> {
        let patches = self.vcs.changed_files(from_revision, to_revision).await?;
        let total = patches.len();

        let content_patches: Vec<&FilePatch> = patches
            .iter()
            .filter(|patch| {
                let tracked = patch.is_modification() && self.is_content_file(patch.path());
                if !tracked {
                    debug!("Skipping {} (not a modified content file)", patch.path());
                }
                tracked
            })
            .collect();

        let futures = content_patches
            .iter()
            .map(|patch| self.compute_file(patch, from_revision, to_revision));
        let results = join_all(futures).await;

        let mut operations_for_files = Vec::new();
        let mut failures = Vec::new();
        for (patch, result) in content_patches.iter().zip(results) {
            match result {
                Ok(ops) => operations_for_files.push(ops),
                Err(e) => {
                    error!("Failed to compute subtitle operations for {}: {:#}", patch.path(), e);
                    failures.push(FileFailure {
                        path: patch.path().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Computed subtitle operations for {} of {} changed files ({} failed)",
            operations_for_files.len(),
            total,
            failures.len()
        );

        Ok(RepositoryOperations {
            operations: OperationsForRepository::new(
                self.vcs.repository_name(),
                from_revision,
                to_revision,
                operations_for_files,
            ),
            failures,
        })
    }

    async fn compute_file(
        &self,
        patch: &FilePatch,
        from_revision: &str,
        to_revision: &str,
    ) -> Result<OperationsForFile> {
        let old_path = patch.old_path.as_deref().unwrap_or_default();
        let new_path = patch.new_path.as_deref().unwrap_or_default();
        let file_identity = extract_file_identity(old_path)
            .ok_or_else(|| anyhow!("No file identity in {}", old_path))?;

        let old_text = self.vcs.file_contents(old_path, from_revision).await?;
        let new_text = self.vcs.file_contents(new_path, to_revision).await?;
        let revisions = FileRevisions {
            old_text: &old_text,
            new_text: &new_text,
            from_revision,
            to_revision,
        };

        let existing = self.existing_stids.get(&file_identity).map(Vec::as_slice);
        Ok(self
            .computer
            .compute(&file_identity, &revisions, &patch.hunks, existing)?)
    }
}
