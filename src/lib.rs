/*!
 * # stsync - subtitle synchronization and alignment
 *
 * Keeps subtitle marker records in step with documents that change over
 * time, and carries subtitle boundaries over from a primary text to its
 * translations.
 *
 * ## Features
 *
 * - Compute typed subtitle operations (insert, delete, content change,
 *   merge, split, boundary moves) from the diff between two revisions
 * - Rebuild subtitle marker records from operations, fresh timings and
 *   the current text
 * - Allocate persistent subtitle ids from a shared, locked inventory
 * - Transfer subtitle marks to a foreign text through sentence alignment
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `captions`: Caption extraction from marked-up text
 * - `document`: Owned document tree of records, paragraphs and captions
 * - `compute`: Operation computation:
 *   - `compute::similarity`: Jaccard similarity scoring
 *   - `compute::diff`: Zero-context unified diff parsing
 *   - `compute::operations_for_hunk`: Hunk classification
 *   - `compute::operations_for_file`, `compute::operations_for_repository`: Aggregation
 * - `subtitle`: Subtitle data model, operations, persistent ids, marker files
 * - `sync`: Marker record synchronization pipeline
 * - `split`: Sentence alignment and subtitle mark transfer
 * - `fix`: Initial persistent id assignment
 * - `vcs`: Version control access
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod captions;
pub mod compute;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod fix;
pub mod split;
pub mod subtitle;
pub mod sync;
pub mod vcs;

// Re-export main types for easier usage
pub use app_config::Config;
pub use captions::{Caption, CaptionConfig, CaptionExtractor};
pub use compute::{SubtitleOperationsForFile, SubtitleOperationsForRepository};
pub use errors::{AlignmentError, AllocationError, AppError, ComputeError, OperationError, SyncError};
pub use split::SubtitleSplitter;
pub use subtitle::{Operation, OperationType, OperationsForFile, OperationsForRepository, Subtitle};
pub use sync::SubtitleSync;
