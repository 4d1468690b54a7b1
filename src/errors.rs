/*!
 * Error types for the stsync engine.
 *
 * This module contains custom error types for the different stages of the
 * subtitle pipeline, using the thiserror crate for ergonomic error definitions.
 * Every error is fatal to the file or operation in progress; batch runners
 * report the failing file and continue with the remaining ones.
 */

use thiserror::Error;

/// Errors raised while constructing or decoding subtitle operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    /// Affected records do not match the cardinality table for the operation type
    #[error("Invalid {operation_type} operation shape: {reason}")]
    InvalidOperationShape {
        /// Name of the operation type being constructed
        operation_type: String,
        /// What was wrong with the affected records
        reason: String,
    },

    /// Encoded operation names a type we don't know
    #[error("Unknown operation type: {0}")]
    UnknownOperationType(String),

    /// Encoded operation could not be parsed
    #[error("Failed to decode operation: {0}")]
    Decode(String),
}

/// Errors raised while computing operations from a diff
#[derive(Error, Debug)]
pub enum ComputeError {
    /// No classification cleared the confidence threshold for a hunk
    #[error(
        "Ambiguous subtitle operation in {file}, hunk {hunk}: best score {best_score:.3} is below threshold {threshold:.3}"
    )]
    AmbiguousOperation {
        /// File identity the hunk belongs to
        file: String,
        /// Hunk header, e.g. "@@ -3,2 +3,3 @@"
        hunk: String,
        /// Best candidate score that was found
        best_score: f64,
        /// Threshold in effect
        threshold: f64,
    },

    /// The diff could not be parsed or does not fit the file contents
    #[error("Invalid diff: {0}")]
    InvalidDiff(String),

    /// A computed operation failed shape validation
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),
}

/// Errors raised by the persistent id allocator
#[derive(Error, Debug)]
pub enum AllocationError {
    /// Not enough unused identifiers left in the alphabet
    #[error("Identifier pool exhausted: requested {requested}, only {available} unused ids remain")]
    ExhaustedIdentifierPool {
        /// Number of ids requested
        requested: usize,
        /// Number of unused ids left
        available: u128,
    },

    /// Alphabet or id length can't produce any identifiers
    #[error("Invalid identifier alphabet: {0}")]
    InvalidAlphabet(String),

    /// Reading or extending the inventory failed
    #[error("Inventory IO error: {0}")]
    Inventory(#[from] std::io::Error),
}

/// Errors raised by the marker record synchronizer
#[derive(Error, Debug)]
pub enum SyncError {
    /// Old count plus operations delta does not equal the new timing count
    #[error(
        "Subtitle count mismatch in {file}: existing marker file contains {old_count} subtitles, operations changed count by {delta}, new timing data contains {new_count} subtitles"
    )]
    SubtitleCountMismatch {
        /// File identity
        file: String,
        /// Subtitles in the existing marker records
        old_count: usize,
        /// Net delta implied by the operations
        delta: i64,
        /// Subtitles in the new timing data
        new_count: usize,
    },

    /// The current text has a different number of captions than the timing data
    #[error("Caption count mismatch in {file}: timing data has {expected} subtitles, text has {found} captions")]
    CaptionCountMismatch {
        /// File identity
        file: String,
        /// Subtitles in the new timing data
        expected: usize,
        /// Captions extracted from the current text
        found: usize,
    },

    /// Record headers don't cover every subtitle
    #[error("Record id count mismatch in {file}: text has {record_ids} record ids for {subtitles} subtitles")]
    RecordIdCountMismatch {
        /// File identity
        file: String,
        /// Captions that belong to a record
        record_ids: usize,
        /// Rows in the marker file
        subtitles: usize,
    },

    /// Initial ids requested for a file that already has persistent ids
    #[error("Marker records of {file} already carry persistent ids")]
    PersistentIdsPresent {
        /// File identity
        file: String,
    },

    /// The first subtitle has no record id to inherit
    #[error("First subtitle in {file} has no record id")]
    MissingRecordId {
        /// File identity
        file: String,
    },

    /// An operation references a subtitle that isn't in the identity sequence
    #[error("Operation {operation_id} references unknown subtitle {stid}")]
    OperationTargetNotFound {
        /// Operation that failed to apply
        operation_id: String,
        /// The unresolved subtitle reference
        stid: String,
    },

    /// Allocating persistent ids failed
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),
}

/// Errors raised by the sentence alignment and boundary transfer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// Primary text has marks but foreign text has nothing to carry them
    #[error("Cannot transfer {marks} subtitle marks onto empty foreign text")]
    EmptyForeignText {
        /// Number of primary marks that could not be placed
        marks: usize,
    },

    /// Transferred mark count differs from primary mark count
    #[error("Subtitle count not conserved: primary has {primary}, foreign received {foreign}")]
    CountNotConserved {
        /// Primary mark count
        primary: usize,
        /// Foreign mark count
        foreign: usize,
    },
}

/// Errors raised while reading subtitle marker record files
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkerCsvError {
    /// Header row missing or has unexpected columns
    #[error("Invalid marker file header: {0}")]
    InvalidHeader(String),

    /// A data row could not be parsed
    #[error("Invalid marker file row {line}: {reason}")]
    InvalidRow {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from operation construction
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    /// Error from operation computation
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Error from id allocation
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Error from marker synchronization
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Error from subtitle splitting
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    /// Error from marker file parsing
    #[error("Marker file error: {0}")]
    MarkerCsv(#[from] MarkerCsvError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countMismatch_message_shouldNameEveryCount() {
        let error = SyncError::SubtitleCountMismatch {
            file: "0212".to_string(),
            old_count: 10,
            delta: 2,
            new_count: 11,
        };
        let message = error.to_string();
        assert!(message.contains("0212"));
        assert!(message.contains("10 subtitles"));
        assert!(message.contains("by 2"));
        assert!(message.contains("11 subtitles"));
    }

    #[test]
    fn test_appError_fromComponentErrors_shouldWrap() {
        let error: AppError = SyncError::from(AllocationError::ExhaustedIdentifierPool {
            requested: 3,
            available: 1,
        })
        .into();
        assert!(matches!(error, AppError::Sync(SyncError::Allocation(_))));

        let error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(error, AppError::File(_)));
    }
}
