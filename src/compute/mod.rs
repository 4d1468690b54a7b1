/*!
 * Computing subtitle operations from diffs.
 *
 * - `similarity`: token-set similarity with directional truncation
 * - `diff`: zero-context unified diff model and parser
 * - `operations_for_hunk`: classifies the caption changes of one hunk
 * - `operations_for_file`: composes hunk results for one file
 * - `operations_for_repository`: runs all changed content files of a repository
 */

pub mod diff;
pub mod operations_for_file;
pub mod operations_for_hunk;
pub mod operations_for_repository;
pub mod similarity;

pub use diff::{parse_unified_diff, FilePatch, Hunk};
pub use operations_for_file::{extract_file_identity, FileRevisions, SubtitleOperationsForFile};
pub use operations_for_hunk::{OperationComputerConfig, SubtitleOperationsForHunk};
pub use operations_for_repository::{FileFailure, RepositoryOperations, SubtitleOperationsForRepository};
pub use similarity::{Alignment, JaccardSimilarity, Similarity, SimilarityConfig};
