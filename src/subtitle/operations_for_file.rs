/*!
 * Subtitle operations for a single document.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SyncError;

use super::operation::{Operation, OperationType};
use super::{parse_positional_placeholder, SubtitleIdentity};

/// Operations for one document between two revisions, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsForFile {
    /// Key identifying the document, stable across renames
    pub file_identity: String,

    /// Revision the operations start from
    #[serde(rename = "fromGitCommit")]
    pub from_revision: String,

    /// Revision the operations lead to
    #[serde(rename = "toGitCommit")]
    pub to_revision: String,

    /// Operations in document order
    pub operations: Vec<Operation>,
}

impl OperationsForFile {
    /// Create a new set of operations for a file
    pub fn new(
        file_identity: impl Into<String>,
        from_revision: impl Into<String>,
        to_revision: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            file_identity: file_identity.into(),
            from_revision: from_revision.into(),
            to_revision: to_revision.into(),
            operations,
        }
    }

    /// Net change in subtitle count implied by the operations
    pub fn subtitles_count_delta(&self) -> i64 {
        self.operations.iter().map(Operation::subtitles_count_delta).sum()
    }

    /// Whether any operation adds or removes subtitles
    pub fn adds_or_removes_subtitles(&self) -> bool {
        self.operations.iter().any(Operation::adds_or_removes_subtitles)
    }

    /// Whether there are no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Apply the operations to the identities of the old revision.
    ///
    /// Removed subtitles drop out of the sequence, created subtitles are
    /// inserted as pending identities at their position.
    pub fn apply_to(&self, identities: Vec<SubtitleIdentity>) -> Result<Vec<SubtitleIdentity>, SyncError> {
        let mut seq = identities;

        for op in &self.operations {
            let records = op.affected_stids();
            match op.operation_type() {
                OperationType::ContentChange | OperationType::MoveLeft | OperationType::MoveRight => {
                    for record in records {
                        resolve(&seq, op, &record.stid)?;
                    }
                }
                OperationType::Insert => {
                    let record = &records[0];
                    let idx = match record.after_stid.as_deref() {
                        Some(anchor) => resolve(&seq, op, anchor)? + 1,
                        None => 0,
                    };
                    seq.insert(idx, SubtitleIdentity::pending(record.stid.clone()));
                }
                OperationType::Delete => {
                    let idx = resolve(&seq, op, &records[0].stid)?;
                    seq.remove(idx);
                }
                OperationType::Merge => {
                    for record in records.iter().filter(|r| r.after.is_none()) {
                        let idx = resolve(&seq, op, &record.stid)?;
                        seq.remove(idx);
                    }
                }
                OperationType::Split => {
                    let Some(kept) = records.iter().position(|r| r.before.is_some()) else {
                        continue;
                    };
                    let base = resolve(&seq, op, &records[kept].stid)?;
                    let original = seq.remove(base);
                    for (offset, record) in records.iter().enumerate() {
                        let identity = if offset == kept {
                            original.clone()
                        } else {
                            SubtitleIdentity::pending(record.stid.clone())
                        };
                        seq.insert(base + offset, identity);
                    }
                }
            }
            debug!("Applied {} -> {} identities", op, seq.len());
        }

        Ok(seq)
    }
}

/// Position of the identity an operation refers to
fn resolve(seq: &[SubtitleIdentity], op: &Operation, stid: &str) -> Result<usize, SyncError> {
    if let Some(idx) = seq.iter().position(|i| i.stid == stid) {
        return Ok(idx);
    }
    parse_positional_placeholder(stid)
        .and_then(|origin| seq.iter().position(|i| i.origin == Some(origin)))
        .ok_or_else(|| SyncError::OperationTargetNotFound {
            operation_id: op.operation_id().to_string(),
            stid: stid.to_string(),
        })
}
