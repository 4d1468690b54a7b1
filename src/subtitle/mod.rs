/*!
 * Subtitle data model.
 *
 * - `operation`: typed subtitle operations with encode/decode and inverse
 * - `operations_for_file`: operations for one document between two revisions
 * - `operations_for_repository`: operations for all changed documents
 * - `persistent_id`: persistent id allocation from a shared inventory
 * - `marker_csv`: subtitle marker record files
 */

use serde::{Deserialize, Serialize};

pub mod marker_csv;
pub mod operation;
pub mod operations_for_file;
pub mod operations_for_repository;
pub mod persistent_id;

pub use marker_csv::SubtitleMarkerCsv;
pub use operation::{AffectedStid, Operation, OperationType};
pub use operations_for_file::OperationsForFile;
pub use operations_for_repository::OperationsForRepository;
pub use persistent_id::{IdInventory, PersistentIdAllocator, PersistentIdConfig};

/// Prefix for references to existing subtitles by their position in the old revision
const POSITIONAL_PLACEHOLDER_PREFIX: &str = "tmp-";

/// Prefix for subtitles created by an operation, pending id allocation
const NEW_PLACEHOLDER_PREFIX: &str = "new-";

/// One timed caption segment of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    /// Stable id, assigned once and never reused
    pub persistent_id: String,

    /// Id of the record (paragraph group) the subtitle belongs to
    pub record_id: String,

    /// Start time relative to the recording, in milliseconds
    pub relative_milliseconds: u64,

    /// Start position in audio samples
    pub sample_count: u64,

    /// Caption length in chars
    pub char_length: usize,

    /// Position within the document (0-based, contiguous)
    pub sequence_index: usize,
}

/// Timing of one subtitle, as imported from external timing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSlice {
    /// Start time relative to the recording, in milliseconds
    pub relative_milliseconds: u64,

    /// Start position in audio samples
    pub sample_count: u64,
}

/// Identity half of a subtitle, tracked while operations are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleIdentity {
    /// Persistent id, or a placeholder while `pending`
    pub stid: String,

    /// Record id, none for subtitles created by an operation
    pub record_id: Option<String>,

    /// Index in the old revision for subtitles that existed before
    pub origin: Option<usize>,

    /// Whether `stid` is a placeholder waiting for allocation
    pub pending: bool,
}

impl SubtitleIdentity {
    /// Identity of a subtitle that existed at the given old index
    pub fn existing(stid: impl Into<String>, record_id: Option<String>, origin: usize) -> Self {
        Self {
            stid: stid.into(),
            record_id,
            origin: Some(origin),
            pending: false,
        }
    }

    /// Identity of a newly created subtitle
    pub fn pending(placeholder: impl Into<String>) -> Self {
        Self {
            stid: placeholder.into(),
            record_id: None,
            origin: None,
            pending: true,
        }
    }
}

/// Reference to the subtitle at `index` in the old revision
pub fn positional_placeholder(index: usize) -> String {
    format!("{}{}", POSITIONAL_PLACEHOLDER_PREFIX, index)
}

/// Parse a positional placeholder back into the old index
pub fn parse_positional_placeholder(stid: &str) -> Option<usize> {
    stid.strip_prefix(POSITIONAL_PLACEHOLDER_PREFIX)?.parse().ok()
}

/// Placeholder for the `n`th subtitle created in a file
pub fn new_placeholder(n: usize) -> String {
    format!("{}{}", NEW_PLACEHOLDER_PREFIX, n)
}
