/*!
 * Common test utilities for the stsync test suite
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use stsync::compute::diff::{parse_unified_diff, FilePatch};
use stsync::vcs::VersionControl;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent directories
pub fn create_test_file(dir: &Path, relative_path: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative_path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Marker file contents with persistent ids, one row per (persistent id, record id)
pub fn marker_file(rows: &[(&str, &str)]) -> String {
    let mut out = "relativeMS\tsamples\tcharLength\tpersistentId\trecordId\n".to_string();
    for (idx, (pid, rid)) in rows.iter().enumerate() {
        out.push_str(&format!("{}\t{}\t5\t{}\t{}\n", idx * 1000, idx * 44100, pid, rid));
    }
    out
}

/// Timing-only marker file contents with `count` rows
pub fn import_file(count: usize) -> String {
    let mut out = "relativeMS\tsamples\tcharLength\n".to_string();
    for idx in 0..count {
        out.push_str(&format!("{}\t{}\t0\n", idx * 1500, idx * 66150));
    }
    out
}

/// Version control stand-in serving a fixed diff and fixed blobs
#[derive(Debug, Default)]
pub struct MockVersionControl {
    pub name: String,
    pub diff: String,
    blobs: HashMap<(String, String), String>,
    requests: RequestLog,
}

/// Blob requests seen by a mock, shared with the test after the mock is moved
pub type RequestLog = Arc<Mutex<Vec<(String, String)>>>;

impl MockVersionControl {
    pub fn new(name: &str, diff: &str) -> Self {
        Self {
            name: name.to_string(),
            diff: diff.to_string(),
            ..Default::default()
        }
    }

    /// Serve `contents` for `path` at `revision`
    pub fn with_blob(mut self, path: &str, revision: &str, contents: &str) -> Self {
        self.blobs
            .insert((path.to_string(), revision.to_string()), contents.to_string());
        self
    }

    /// Handle on the blob requests this mock receives
    pub fn request_log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl VersionControl for MockVersionControl {
    fn repository_name(&self) -> String {
        self.name.clone()
    }

    async fn changed_files(&self, _from_revision: &str, _to_revision: &str) -> Result<Vec<FilePatch>> {
        Ok(parse_unified_diff(&self.diff)?)
    }

    async fn file_contents(&self, path: &str, revision: &str) -> Result<String> {
        self.requests
            .lock()
            .push((path.to_string(), revision.to_string()));
        self.blobs
            .get(&(path.to_string(), revision.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("No blob for {} at {}", path, revision))
    }
}
