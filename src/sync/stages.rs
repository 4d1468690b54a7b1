/*!
 * Stages of the marker record synchronization pipeline.
 *
 * Each stage is a small struct holding what it needs and a `run` method
 * from one typed value to the next. Only `AllocateIds` has a side effect
 * (it extends the id inventory), and every check happens before it.
 */

use log::debug;

use crate::errors::SyncError;
use crate::subtitle::persistent_id::InventoryStore;
use crate::subtitle::{IdInventory, OperationsForFile, PersistentIdAllocator, Subtitle, SubtitleIdentity, TimeSlice};

/// Identity whose record id is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIdentity {
    pub stid: String,
    pub record_id: String,
    /// Whether `stid` still is a placeholder
    pub pending: bool,
}

/// Applies a file's operations to the identities of the previous revision
#[derive(Debug, Clone, Copy)]
pub struct ApplyOperations<'a> {
    pub operations: &'a OperationsForFile,
}

impl ApplyOperations<'_> {
    pub fn run(&self, previous: Vec<SubtitleIdentity>) -> Result<Vec<SubtitleIdentity>, SyncError> {
        self.operations.apply_to(previous)
    }
}

/// Checks that identities, timings and captions line up
#[derive(Debug, Clone, Copy)]
pub struct ValidateCounts<'a> {
    pub file: &'a str,
    /// Subtitles in the previous marker records
    pub old_count: usize,
    /// Net delta of the operations
    pub delta: i64,
    /// Subtitles in the new timing data
    pub timing_count: usize,
    /// Captions in the current text
    pub caption_count: usize,
}

impl ValidateCounts<'_> {
    pub fn run(&self, identities: &[SubtitleIdentity]) -> Result<(), SyncError> {
        let mismatch = |delta: i64| SyncError::SubtitleCountMismatch {
            file: self.file.to_string(),
            old_count: self.old_count,
            delta,
            new_count: self.timing_count,
        };

        if self.old_count as i64 + self.delta != self.timing_count as i64 {
            return Err(mismatch(self.delta));
        }
        // Operations whose records don't agree with their own delta
        if identities.len() != self.timing_count {
            return Err(mismatch(identities.len() as i64 - self.old_count as i64));
        }
        if self.caption_count != self.timing_count {
            return Err(SyncError::CaptionCountMismatch {
                file: self.file.to_string(),
                expected: self.timing_count,
                found: self.caption_count,
            });
        }
        Ok(())
    }
}

/// Gives new subtitles the record id of the subtitle before them
#[derive(Debug, Clone, Copy)]
pub struct AssignRecordIds<'a> {
    pub file: &'a str,
}

impl AssignRecordIds<'_> {
    pub fn run(&self, identities: Vec<SubtitleIdentity>) -> Result<Vec<RecordedIdentity>, SyncError> {
        let mut out: Vec<RecordedIdentity> = Vec::with_capacity(identities.len());
        for identity in identities {
            let record_id = match identity.record_id {
                Some(rid) => rid,
                None => match out.last() {
                    Some(previous) => previous.record_id.clone(),
                    None => {
                        return Err(SyncError::MissingRecordId {
                            file: self.file.to_string(),
                        });
                    }
                },
            };
            out.push(RecordedIdentity {
                stid: identity.stid,
                record_id,
                pending: identity.pending,
            });
        }
        Ok(out)
    }
}

/// Replaces placeholders with freshly allocated persistent ids
#[derive(Debug, Clone, Copy)]
pub struct AllocateIds<'a> {
    pub allocator: &'a PersistentIdAllocator,
}

impl AllocateIds<'_> {
    pub fn run<S: InventoryStore>(
        &self,
        mut identities: Vec<RecordedIdentity>,
        inventory: &mut IdInventory<S>,
    ) -> Result<Vec<RecordedIdentity>, SyncError> {
        let pending = identities.iter().filter(|i| i.pending).count();
        if pending == 0 {
            return Ok(identities);
        }

        let ids = self.allocator.allocate(inventory, pending)?;
        for (identity, id) in identities.iter_mut().filter(|i| i.pending).zip(ids) {
            debug!("Subtitle {} gets persistent id {}", identity.stid, id);
            identity.stid = id;
            identity.pending = false;
        }
        Ok(identities)
    }
}

/// Zips identities with timings and caption lengths
#[derive(Debug, Clone, Copy, Default)]
pub struct Assemble;

impl Assemble {
    pub fn run(&self, identities: Vec<RecordedIdentity>, time_slices: &[TimeSlice], char_lengths: &[usize]) -> Vec<Subtitle> {
        identities
            .into_iter()
            .zip(time_slices)
            .zip(char_lengths)
            .enumerate()
            .map(|(sequence_index, ((identity, slice), char_length))| Subtitle {
                persistent_id: identity.stid,
                record_id: identity.record_id,
                relative_milliseconds: slice.relative_milliseconds,
                sample_count: slice.sample_count,
                char_length: *char_length,
                sequence_index,
            })
            .collect()
    }
}
