/*!
 * Marker record synchronization.
 *
 * After a document changed, its subtitle marker records are rebuilt from
 * the previous records, the operations explaining the change, fresh timing
 * data and the current text. The pipeline runs these stages in order:
 *
 * 1. `ApplyOperations`: previous identities to new identities
 * 2. `ValidateCounts`: identities, timings and captions must agree
 * 3. `AssignRecordIds`: new subtitles join the record before them
 * 4. `AllocateIds`: placeholders get persistent ids
 * 5. `Assemble`: identities zipped with timings and lengths
 *
 * A file either syncs completely or produces nothing. Across a repository,
 * failing files are reported and the remaining files still sync.
 */

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info};
use regex::Regex;

use crate::app_config::RepositoryConfig;
use crate::captions::CaptionExtractor;
use crate::compute::{extract_file_identity, FileFailure};
use crate::errors::SyncError;
use crate::file_utils::FileManager;
use crate::subtitle::persistent_id::InventoryStore;
use crate::subtitle::{
    IdInventory, OperationsForFile, OperationsForRepository, PersistentIdAllocator, Subtitle, SubtitleMarkerCsv,
    TimeSlice,
};

pub mod stages;

pub use stages::{AllocateIds, ApplyOperations, Assemble, AssignRecordIds, RecordedIdentity, ValidateCounts};

/// Everything needed to sync one document
#[derive(Debug, Clone, Copy)]
pub struct FileSyncInput<'a> {
    pub file_identity: &'a str,
    /// Marker records of the previous revision
    pub previous: &'a SubtitleMarkerCsv,
    /// Timing of the new subtitles
    pub time_slices: &'a [TimeSlice],
    /// Current text of the document
    pub text: &'a str,
    pub operations: &'a OperationsForFile,
}

/// Outcome of a repository sync
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Marker files that were rewritten
    pub synced: Vec<PathBuf>,
    /// Content files without operations
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Rebuilds subtitle marker records after documents changed
#[derive(Debug, Clone)]
pub struct SubtitleSync {
    extractor: CaptionExtractor,
    allocator: PersistentIdAllocator,
    layout: RepositoryConfig,
    content_pattern: Regex,
}

impl SubtitleSync {
    pub fn new(extractor: CaptionExtractor, allocator: PersistentIdAllocator, layout: RepositoryConfig) -> Result<Self> {
        let content_pattern = Regex::new(&layout.content_file_pattern)
            .with_context(|| format!("Invalid content file pattern: {}", layout.content_file_pattern))?;
        Ok(Self {
            extractor,
            allocator,
            layout,
            content_pattern,
        })
    }

    /// Run the pipeline for one document
    pub fn sync_file<S: InventoryStore>(
        &self,
        input: &FileSyncInput<'_>,
        inventory: &mut IdInventory<S>,
    ) -> Result<Vec<Subtitle>, SyncError> {
        let file = input.file_identity;
        let char_lengths: Vec<usize> = self
            .extractor
            .extract(input.text)
            .iter()
            .map(|c| c.char_length)
            .collect();

        let identities = ApplyOperations {
            operations: input.operations,
        }
        .run(input.previous.identities())?;

        ValidateCounts {
            file,
            old_count: input.previous.len(),
            delta: input.operations.subtitles_count_delta(),
            timing_count: input.time_slices.len(),
            caption_count: char_lengths.len(),
        }
        .run(&identities)?;

        let recorded = AssignRecordIds { file }.run(identities)?;
        let allocated = AllocateIds {
            allocator: &self.allocator,
        }
        .run(recorded, inventory)?;
        let subtitles = Assemble.run(allocated, input.time_slices, &char_lengths);

        debug!(
            "Synced {}: {} -> {} subtitles",
            file,
            input.previous.len(),
            subtitles.len()
        );
        Ok(subtitles)
    }

    /// Sync every content file under `repo_dir` that has operations
    pub fn sync_repository<S: InventoryStore>(
        &self,
        repo_dir: &Path,
        operations: &OperationsForRepository,
        inventory: &mut IdInventory<S>,
    ) -> Result<SyncReport> {
        let content_files = FileManager::find_content_files(repo_dir, &self.content_pattern)?;
        let mut report = SyncReport::default();

        for path in content_files {
            let identity = extract_file_identity(&path.to_string_lossy());
            let Some(ops) = identity.as_deref().and_then(|id| operations.for_file(id)) else {
                report.skipped += 1;
                continue;
            };
            if ops.is_empty() {
                report.skipped += 1;
                continue;
            }

            match self.sync_content_file(&path, ops, inventory) {
                Ok(marker_path) => {
                    info!("Updated {}", marker_path.display());
                    report.synced.push(marker_path);
                }
                Err(e) => {
                    error!("Failed to sync subtitle markers for {}: {:#}", path.display(), e);
                    report.failures.push(FileFailure {
                        path: path.display().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Synced {} marker files ({} skipped, {} failed)",
            report.synced.len(),
            report.skipped,
            report.failures.len()
        );
        Ok(report)
    }

    fn sync_content_file<S: InventoryStore>(
        &self,
        path: &Path,
        operations: &OperationsForFile,
        inventory: &mut IdInventory<S>,
    ) -> Result<PathBuf> {
        let text = FileManager::read_to_string(path)?;
        let marker_path = FileManager::sibling_path(path, &self.layout.marker_file_extension)
            .ok_or_else(|| anyhow!("No file name in {}", path.display()))?;
        let previous = SubtitleMarkerCsv::load(&marker_path)?;
        if previous.is_legacy() {
            bail!(
                "{} has no persistent ids yet, assign initial ids first",
                marker_path.display()
            );
        }

        let import_path = FileManager::sibling_path(path, &self.layout.import_file_extension)
            .ok_or_else(|| anyhow!("No file name in {}", path.display()))?;
        let time_slices = if FileManager::file_exists(&import_path) {
            SubtitleMarkerCsv::load(&import_path)?.time_slices()
        } else if !operations.adds_or_removes_subtitles() {
            debug!("No subtitle import for {}, keeping existing timings", path.display());
            previous.time_slices()
        } else {
            bail!(
                "No subtitle import file {} and the operations change the subtitle count",
                import_path.display()
            );
        };

        let subtitles = self.sync_file(
            &FileSyncInput {
                file_identity: &operations.file_identity,
                previous: &previous,
                time_slices: &time_slices,
                text: &text,
                operations,
            },
            inventory,
        )?;

        SubtitleMarkerCsv::from_subtitles(&subtitles).save(&marker_path)?;
        Ok(marker_path)
    }
}
