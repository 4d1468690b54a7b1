/*!
 * Memoizing version-control wrapper.
 *
 * Each diff and each (path, revision) blob is fetched once and then served
 * from memory. A cache lives for one computation and is dropped with it.
 */

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;

use crate::compute::diff::FilePatch;

use super::VersionControl;

/// Caches diffs and blobs of the wrapped collaborator
#[derive(Debug)]
pub struct CachedVersionControl<V: VersionControl> {
    inner: V,
    diffs: Mutex<HashMap<(String, String), Vec<FilePatch>>>,
    blobs: Mutex<HashMap<(String, String), String>>,
}

impl<V: VersionControl> CachedVersionControl<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            diffs: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    /// Number of cached blobs
    pub fn cached_blobs(&self) -> usize {
        self.blobs.lock().len()
    }
}

#[async_trait]
impl<V: VersionControl> VersionControl for CachedVersionControl<V> {
    fn repository_name(&self) -> String {
        self.inner.repository_name()
    }

    async fn changed_files(&self, from_revision: &str, to_revision: &str) -> Result<Vec<FilePatch>> {
        let key = (from_revision.to_string(), to_revision.to_string());
        let cached = self.diffs.lock().get(&key).cloned();
        if let Some(patches) = cached {
            return Ok(patches);
        }

        let patches = self.inner.changed_files(from_revision, to_revision).await?;
        self.diffs.lock().insert(key, patches.clone());
        Ok(patches)
    }

    async fn file_contents(&self, path: &str, revision: &str) -> Result<String> {
        let key = (path.to_string(), revision.to_string());
        let cached = self.blobs.lock().get(&key).cloned();
        if let Some(contents) = cached {
            debug!("Cache hit for {} at {}", path, revision);
            return Ok(contents);
        }

        let contents = self.inner.file_contents(path, revision).await?;
        self.blobs.lock().insert(key, contents.clone());
        Ok(contents)
    }
}
