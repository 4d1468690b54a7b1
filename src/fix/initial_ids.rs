/*!
 * Gives persistent ids to marker files that only carry timings.
 *
 * Record ids come from the record headers of the document text; every
 * caption after a header belongs to that record. The number of captions
 * inside records must equal the number of marker rows.
 */

use std::path::Path;

use anyhow::{anyhow, Result};
use log::info;

use crate::captions::CaptionExtractor;
use crate::document::DocumentTree;
use crate::errors::SyncError;
use crate::file_utils::FileManager;
use crate::subtitle::marker_csv::MarkerRow;
use crate::subtitle::persistent_id::InventoryStore;
use crate::subtitle::{IdInventory, PersistentIdAllocator, SubtitleMarkerCsv};

#[derive(Debug, Clone)]
pub struct AddInitialPersistentSubtitleIds {
    extractor: CaptionExtractor,
    allocator: PersistentIdAllocator,
}

impl AddInitialPersistentSubtitleIds {
    pub fn new(extractor: CaptionExtractor, allocator: PersistentIdAllocator) -> Self {
        Self { extractor, allocator }
    }

    /// Marker records with a new persistent id and the record id for every row
    pub fn run<S: InventoryStore>(
        &self,
        file_identity: &str,
        markers: &SubtitleMarkerCsv,
        text: &str,
        inventory: &mut IdInventory<S>,
    ) -> Result<SubtitleMarkerCsv, SyncError> {
        if markers.rows().iter().any(|r| r.persistent_id.is_some()) {
            return Err(SyncError::PersistentIdsPresent {
                file: file_identity.to_string(),
            });
        }

        let record_ids = DocumentTree::parse(text, &self.extractor).record_ids();
        if record_ids.len() != markers.len() {
            return Err(SyncError::RecordIdCountMismatch {
                file: file_identity.to_string(),
                record_ids: record_ids.len(),
                subtitles: markers.len(),
            });
        }

        let ids = self.allocator.allocate(inventory, markers.len())?;
        let rows = markers
            .rows()
            .iter()
            .zip(ids)
            .zip(record_ids)
            .map(|((row, persistent_id), record_id)| MarkerRow {
                persistent_id: Some(persistent_id),
                record_id: Some(record_id),
                ..row.clone()
            })
            .collect();

        Ok(SubtitleMarkerCsv::new(rows))
    }

    /// Rewrite the marker file of a content file in place. Returns the number of ids assigned.
    pub fn run_for_file<S: InventoryStore>(
        &self,
        content_path: &Path,
        marker_file_extension: &str,
        inventory: &mut IdInventory<S>,
    ) -> Result<usize> {
        let marker_path = FileManager::sibling_path(content_path, marker_file_extension)
            .ok_or_else(|| anyhow!("No file name in {}", content_path.display()))?;
        let text = FileManager::read_to_string(content_path)?;
        let markers = SubtitleMarkerCsv::load(&marker_path)?;
        let identity = content_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let updated = self.run(&identity, &markers, &text, inventory)?;
        updated.save(&marker_path)?;
        info!(
            "Assigned {} persistent ids in {}",
            updated.len(),
            marker_path.display()
        );
        Ok(updated.len())
    }
}
