/*!
 * Unified diff model.
 *
 * Parses the output of `git diff -U0` into per-file patches. Hunks carry
 * their old/new line ranges so callers can locate the hunk in the full
 * file contents at either revision.
 */

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ComputeError;

static HUNK_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("Invalid hunk header regex")
});

const DEV_NULL: &str = "/dev/null";

/// A contiguous changed region
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hunk {
    /// 1-based first old line (for pure insertions: the line after which new lines go)
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based first new line (for pure deletions: the line after which old lines were)
    pub new_start: usize,
    pub new_count: usize,
    /// Removed lines, without the `-` prefix
    pub old_lines: Vec<String>,
    /// Added lines, without the `+` prefix
    pub new_lines: Vec<String>,
}

impl Hunk {
    /// Create an empty hunk for the given ranges
    pub fn new(old_start: usize, old_count: usize, new_start: usize, new_count: usize) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
            ..Default::default()
        }
    }

    /// 0-based line index range in the old text
    pub fn old_range(&self) -> Range<usize> {
        line_range(self.old_start, self.old_count)
    }

    /// 0-based line index range in the new text
    pub fn new_range(&self) -> Range<usize> {
        line_range(self.new_start, self.new_count)
    }

    /// Hunk header, e.g. `@@ -3,2 +3,3 @@`
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header())
    }
}

fn line_range(start: usize, count: usize) -> Range<usize> {
    if count == 0 {
        start..start
    } else {
        let first = start.saturating_sub(1);
        first..first + count
    }
}

/// Changes to one file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePatch {
    /// Path at the old revision, none for added files
    pub old_path: Option<String>,
    /// Path at the new revision, none for deleted files
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// Path used to identify the file, preferring the old side
    pub fn path(&self) -> &str {
        self.old_path
            .as_deref()
            .or(self.new_path.as_deref())
            .unwrap_or_default()
    }

    /// Whether the file exists on both sides
    pub fn is_modification(&self) -> bool {
        self.old_path.is_some() && self.new_path.is_some()
    }
}

/// Parse `git diff` output into file patches
pub fn parse_unified_diff(diff: &str) -> Result<Vec<FilePatch>, ComputeError> {
    let mut patches: Vec<FilePatch> = Vec::new();
    // Lines still expected for the current hunk body (old, new)
    let mut remaining = (0usize, 0usize);

    for (idx, line) in diff.lines().enumerate() {
        let line_no = idx + 1;

        if remaining.0 > 0 || remaining.1 > 0 {
            let hunk = current_hunk(&mut patches, line_no)?;
            if let Some(removed) = line.strip_prefix('-') {
                if remaining.0 == 0 {
                    return Err(invalid(line_no, "too many removed lines"));
                }
                hunk.old_lines.push(removed.to_string());
                remaining.0 -= 1;
            } else if let Some(added) = line.strip_prefix('+') {
                if remaining.1 == 0 {
                    return Err(invalid(line_no, "too many added lines"));
                }
                hunk.new_lines.push(added.to_string());
                remaining.1 -= 1;
            } else if let Some(context) = line.strip_prefix(' ') {
                if remaining.0 == 0 || remaining.1 == 0 {
                    return Err(invalid(line_no, "unexpected context line"));
                }
                hunk.old_lines.push(context.to_string());
                hunk.new_lines.push(context.to_string());
                remaining.0 -= 1;
                remaining.1 -= 1;
            } else if !line.starts_with('\\') {
                return Err(invalid(line_no, "hunk body ended early"));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old_path, new_path) = split_git_header(rest);
            patches.push(FilePatch {
                old_path,
                new_path,
                hunks: Vec::new(),
            });
        } else if let Some(path) = line.strip_prefix("--- ") {
            if patches.is_empty() {
                patches.push(FilePatch::default());
            }
            if let Some(patch) = patches.last_mut() {
                patch.old_path = diff_path(path, "a/");
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            let patch = patches
                .last_mut()
                .ok_or_else(|| invalid(line_no, "`+++` before any file header"))?;
            patch.new_path = diff_path(path, "b/");
        } else if line.starts_with("@@") {
            let caps = HUNK_HEADER_REGEX
                .captures(line)
                .ok_or_else(|| invalid(line_no, "malformed hunk header"))?;
            let number = |i: usize, default: usize| -> Result<usize, ComputeError> {
                match caps.get(i) {
                    Some(m) => m
                        .as_str()
                        .parse()
                        .map_err(|_| invalid(line_no, "hunk range out of bounds")),
                    None => Ok(default),
                }
            };
            let hunk = Hunk::new(number(1, 0)?, number(2, 1)?, number(3, 0)?, number(4, 1)?);
            remaining = (hunk.old_count, hunk.new_count);
            patches
                .last_mut()
                .ok_or_else(|| invalid(line_no, "hunk before any file header"))?
                .hunks
                .push(hunk);
        }
        // index, mode, rename and binary lines carry nothing we use
    }

    if remaining.0 > 0 || remaining.1 > 0 {
        return Err(ComputeError::InvalidDiff(format!(
            "diff ended inside a hunk ({} old, {} new lines missing)",
            remaining.0, remaining.1
        )));
    }

    Ok(patches)
}

fn current_hunk(patches: &mut [FilePatch], line_no: usize) -> Result<&mut Hunk, ComputeError> {
    patches
        .last_mut()
        .and_then(|p| p.hunks.last_mut())
        .ok_or_else(|| invalid(line_no, "hunk body without header"))
}

fn invalid(line_no: usize, reason: &str) -> ComputeError {
    ComputeError::InvalidDiff(format!("line {}: {}", line_no, reason))
}

fn diff_path(path: &str, prefix: &str) -> Option<String> {
    let path = path.split('\t').next().unwrap_or(path).trim();
    if path == DEV_NULL {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(path).to_string())
}

fn split_git_header(rest: &str) -> (Option<String>, Option<String>) {
    match rest.split_once(" b/") {
        Some((old, new)) => (
            Some(old.strip_prefix("a/").unwrap_or(old).to_string()),
            Some(new.to_string()),
        ),
        None => (None, None),
    }
}
