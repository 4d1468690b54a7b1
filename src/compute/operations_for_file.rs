/*!
 * Computes subtitle operations for one file from its two revisions and
 * the zero-context diff between them.
 */

use std::ops::Range;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::captions::{CaptionConfig, CaptionExtractor};
use crate::errors::ComputeError;
use crate::subtitle::{positional_placeholder, OperationsForFile};

use super::diff::Hunk;
use super::operations_for_hunk::{HunkInput, OperationComputerConfig, SubtitleOperationsForHunk};

/// Four digit product identity at the end of a content file name
static FILE_IDENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\.[[:alnum:]]+$").expect("Invalid file identity regex"));

/// Key identifying a content file across renames, e.g. `0212` for `content/57/eng57-0212.at`
pub fn extract_file_identity(path: &str) -> Option<String> {
    FILE_IDENTITY_REGEX
        .captures(path)
        .map(|caps| caps[1].to_string())
}

/// Both revisions of a file
#[derive(Debug, Clone, Copy)]
pub struct FileRevisions<'a> {
    pub old_text: &'a str,
    pub new_text: &'a str,
    pub from_revision: &'a str,
    pub to_revision: &'a str,
}

/// Computes operations for every hunk of a file and concatenates them in document order
#[derive(Debug, Clone, Default)]
pub struct SubtitleOperationsForFile {
    extractor: CaptionExtractor,
    computer: SubtitleOperationsForHunk,
}

impl SubtitleOperationsForFile {
    pub fn new(captions: CaptionConfig, operations: OperationComputerConfig) -> Self {
        Self {
            extractor: CaptionExtractor::new(captions),
            computer: SubtitleOperationsForHunk::new(operations),
        }
    }

    /// Compute operations for a file.
    ///
    /// `existing_stids` are the persistent ids of the old revision's subtitles. Without
    /// them, old subtitles are referenced by positional placeholders.
    pub fn compute(
        &self,
        file_identity: &str,
        revisions: &FileRevisions<'_>,
        hunks: &[Hunk],
        existing_stids: Option<&[String]>,
    ) -> Result<OperationsForFile, ComputeError> {
        let old_captions = self.extractor.extract(revisions.old_text);
        let new_captions = self.extractor.extract(revisions.new_text);

        let old_stids: Vec<String> = match existing_stids {
            Some(stids) if stids.len() == old_captions.len() => stids.to_vec(),
            Some(stids) => {
                return Err(ComputeError::InvalidDiff(format!(
                    "{}: {} existing stids for {} captions",
                    file_identity,
                    stids.len(),
                    old_captions.len()
                )));
            }
            None => (0..old_captions.len()).map(positional_placeholder).collect(),
        };

        let old_lines = line_starts(revisions.old_text);
        let new_lines = line_starts(revisions.new_text);
        let old_positions: Vec<usize> = old_captions.iter().map(|c| c.position).collect();
        let new_positions: Vec<usize> = new_captions.iter().map(|c| c.position).collect();

        let mut operations = Vec::new();
        let mut consumed_old = 0;
        let mut consumed_new = 0;
        let mut anchor: Option<String> = None;
        let mut next_new = 1;

        for hunk in hunks {
            let old_bytes = byte_range(&old_lines, revisions.old_text.len(), hunk.old_range())
                .ok_or_else(|| out_of_bounds(file_identity, hunk, "old"))?;
            let new_bytes = byte_range(&new_lines, revisions.new_text.len(), hunk.new_range())
                .ok_or_else(|| out_of_bounds(file_identity, hunk, "new"))?;

            let (mut old_start, old_end) = caption_span(&old_positions, &old_bytes);
            let (mut new_start, new_end) = caption_span(&new_positions, &new_bytes);
            if old_start < consumed_old || new_start < consumed_new {
                return Err(ComputeError::InvalidDiff(format!(
                    "{}: hunk {} overlaps the previous one",
                    file_identity, hunk
                )));
            }

            // The caption running into the hunk may have changed too
            if old_start > consumed_old && new_start > consumed_new {
                old_start -= 1;
                new_start -= 1;
            }
            if old_start > consumed_old {
                anchor = Some(old_stids[old_start - 1].clone());
            }

            let input = HunkInput {
                header: hunk.header(),
                old: &old_captions[old_start..old_end],
                new: &new_captions[new_start..new_end],
                old_stids: &old_stids[old_start..old_end],
                anchor: anchor.clone(),
            };
            let result = self.computer.compute(file_identity, &input, &mut next_new)?;
            debug!(
                "{} {}: old captions {}..{}, new captions {}..{}, {} operations",
                file_identity,
                hunk,
                old_start,
                old_end,
                new_start,
                new_end,
                result.operations.len()
            );

            operations.extend(result.operations);
            anchor = result.trailing_stid;
            consumed_old = old_end;
            consumed_new = new_end;
        }

        info!(
            "Computed {} subtitle operations for {} from {} hunks",
            operations.len(),
            file_identity,
            hunks.len()
        );

        Ok(OperationsForFile::new(
            file_identity,
            revisions.from_revision,
            revisions.to_revision,
            operations,
        ))
    }
}

fn out_of_bounds(file_identity: &str, hunk: &Hunk, side: &str) -> ComputeError {
    ComputeError::InvalidDiff(format!(
        "{}: hunk {} is outside the {} text",
        file_identity, hunk, side
    ))
}

/// Byte offset of the start of every line
fn line_starts(text: &str) -> Vec<usize> {
    if text.is_empty() {
        return Vec::new();
    }
    std::iter::once(0)
        .chain(
            text.match_indices('\n')
                .map(|(idx, _)| idx + 1)
                .filter(|&idx| idx < text.len()),
        )
        .collect()
}

fn line_offset(starts: &[usize], text_len: usize, line: usize) -> Option<usize> {
    match line.cmp(&starts.len()) {
        std::cmp::Ordering::Less => Some(starts[line]),
        std::cmp::Ordering::Equal => Some(text_len),
        std::cmp::Ordering::Greater => None,
    }
}

fn byte_range(starts: &[usize], text_len: usize, lines: Range<usize>) -> Option<Range<usize>> {
    Some(line_offset(starts, text_len, lines.start)?..line_offset(starts, text_len, lines.end)?)
}

/// Indexes of the first caption at or after `bytes.start` and the first at or after `bytes.end`
fn caption_span(positions: &[usize], bytes: &Range<usize>) -> (usize, usize) {
    let start = positions.partition_point(|&p| p < bytes.start);
    let end = positions.partition_point(|&p| p < bytes.end);
    (start, end)
}
