/*!
 * Subtitle operations for an entire repository, going from one revision
 * to another.
 */

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::operations_for_file::OperationsForFile;

/// Operations for every changed document of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsForRepository {
    /// Repository name
    #[serde(rename = "repository")]
    pub repository_name: String,

    /// Revision the comparison starts from
    #[serde(rename = "fromGitCommit")]
    pub from_revision: String,

    /// Revision the comparison leads to
    #[serde(rename = "toGitCommit")]
    pub to_revision: String,

    /// Per-document operations, in diff order
    pub operations_for_files: Vec<OperationsForFile>,
}

impl OperationsForRepository {
    /// Create a new repository operations set
    pub fn new(
        repository_name: impl Into<String>,
        from_revision: impl Into<String>,
        to_revision: impl Into<String>,
        operations_for_files: Vec<OperationsForFile>,
    ) -> Self {
        Self {
            repository_name: repository_name.into(),
            from_revision: from_revision.into(),
            to_revision: to_revision.into(),
            operations_for_files,
        }
    }

    /// Operations for the document with the given identity
    pub fn for_file(&self, file_identity: &str) -> Option<&OperationsForFile> {
        self.operations_for_files
            .iter()
            .find(|ops| ops.file_identity == file_identity)
    }

    /// Total number of operations across all documents
    pub fn operations_count(&self) -> usize {
        self.operations_for_files.iter().map(|f| f.operations.len()).sum()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize subtitle operations")
    }

    /// Parse from JSON, validating every operation
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse subtitle operations")
    }

    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read operations file: {:?}", path))?;
        Self::from_json(&json)
    }

    /// Write to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write operations file: {:?}", path))
    }
}
