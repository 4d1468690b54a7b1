/*!
 * Subtitle marker record files.
 *
 * Tab separated, header row first. The current format carries five columns
 * (`relativeMS samples charLength persistentId recordId`); subtitle import
 * files and files that predate persistent ids carry only the first three.
 * Files are read as ordered rows and always written by full replacement.
 */

use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::MarkerCsvError;

use super::{Subtitle, SubtitleIdentity, TimeSlice};

/// Columns of a marker file with persistent ids
pub const MARKER_CSV_HEADER: [&str; 5] = ["relativeMS", "samples", "charLength", "persistentId", "recordId"];

/// Columns of a timing-only marker file
pub const LEGACY_MARKER_CSV_HEADER: [&str; 3] = ["relativeMS", "samples", "charLength"];

/// One row of a marker file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkerRow {
    pub relative_milliseconds: u64,
    pub sample_count: u64,
    pub char_length: usize,
    pub persistent_id: Option<String>,
    pub record_id: Option<String>,
}

impl MarkerRow {
    /// Timing of this row
    pub fn time_slice(&self) -> TimeSlice {
        TimeSlice {
            relative_milliseconds: self.relative_milliseconds,
            sample_count: self.sample_count,
        }
    }
}

impl From<&Subtitle> for MarkerRow {
    fn from(st: &Subtitle) -> Self {
        Self {
            relative_milliseconds: st.relative_milliseconds,
            sample_count: st.sample_count,
            char_length: st.char_length,
            persistent_id: Some(st.persistent_id.clone()),
            record_id: Some(st.record_id.clone()),
        }
    }
}

/// Parsed contents of a marker file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleMarkerCsv {
    rows: Vec<MarkerRow>,
    legacy: bool,
}

impl SubtitleMarkerCsv {
    /// Build a five-column file from rows
    pub fn new(rows: Vec<MarkerRow>) -> Self {
        Self { rows, legacy: false }
    }

    /// Build a five-column file from subtitles
    pub fn from_subtitles(subtitles: &[Subtitle]) -> Self {
        Self::new(subtitles.iter().map(MarkerRow::from).collect())
    }

    /// Parse file contents
    pub fn parse(contents: &str) -> Result<Self, MarkerCsvError> {
        let mut lines = contents.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| MarkerCsvError::InvalidHeader("file is empty".to_string()))?;
        let columns: Vec<&str> = header.trim_end_matches('\r').split('\t').collect();
        let legacy = if columns == MARKER_CSV_HEADER {
            false
        } else if columns == LEGACY_MARKER_CSV_HEADER {
            true
        } else {
            return Err(MarkerCsvError::InvalidHeader(header.to_string()));
        };

        let mut rows = Vec::new();
        for (idx, line) in lines {
            rows.push(parse_row(line.trim_end_matches('\r'), columns.len(), idx + 1)?);
        }

        Ok(Self { rows, legacy })
    }

    /// Read and parse a marker file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read marker file: {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse marker file: {:?}", path))
    }

    /// Replace the file at `path` with the rendered rows
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write marker file: {:?}", path))
    }

    /// Render as five-column file contents
    pub fn render(&self) -> String {
        let mut out = MARKER_CSV_HEADER.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                row.relative_milliseconds,
                row.sample_count,
                row.char_length,
                row.persistent_id.as_deref().unwrap_or(""),
                row.record_id.as_deref().unwrap_or(""),
            ));
        }
        out
    }

    pub fn rows(&self) -> &[MarkerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the file was read from the timing-only format
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Timing of every row, in order
    pub fn time_slices(&self) -> Vec<TimeSlice> {
        self.rows.iter().map(MarkerRow::time_slice).collect()
    }

    /// Identities of every row, in order. Rows without a persistent id get a positional placeholder.
    pub fn identities(&self) -> Vec<SubtitleIdentity> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let stid = row
                    .persistent_id
                    .clone()
                    .unwrap_or_else(|| super::positional_placeholder(idx));
                SubtitleIdentity::existing(stid, row.record_id.clone(), idx)
            })
            .collect()
    }

    /// Persistent ids of every row that has one
    pub fn persistent_ids(&self) -> Vec<String> {
        self.rows.iter().filter_map(|r| r.persistent_id.clone()).collect()
    }

    /// Rows as complete subtitles
    pub fn subtitles(&self) -> Result<Vec<Subtitle>, MarkerCsvError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let missing = |column: &str| MarkerCsvError::InvalidRow {
                    line: idx + 2,
                    reason: format!("missing {}", column),
                };
                Ok(Subtitle {
                    persistent_id: row.persistent_id.clone().ok_or_else(|| missing("persistentId"))?,
                    record_id: row.record_id.clone().ok_or_else(|| missing("recordId"))?,
                    relative_milliseconds: row.relative_milliseconds,
                    sample_count: row.sample_count,
                    char_length: row.char_length,
                    sequence_index: idx,
                })
            })
            .collect()
    }
}

fn parse_row(line: &str, expected: usize, line_no: usize) -> Result<MarkerRow, MarkerCsvError> {
    let cells: Vec<&str> = line.split('\t').collect();
    if cells.len() != expected {
        return Err(MarkerCsvError::InvalidRow {
            line: line_no,
            reason: format!("expected {} columns, found {}", expected, cells.len()),
        });
    }

    let number = |idx: usize, name: &str| -> Result<u64, MarkerCsvError> {
        cells[idx].trim().parse::<u64>().map_err(|e| MarkerCsvError::InvalidRow {
            line: line_no,
            reason: format!("{} {:?}: {}", name, cells[idx], e),
        })
    };
    let text = |idx: usize| {
        cells
            .get(idx)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };

    Ok(MarkerRow {
        relative_milliseconds: number(0, "relativeMS")?,
        sample_count: number(1, "samples")?,
        char_length: number(2, "charLength")? as usize,
        persistent_id: text(3),
        record_id: text(4),
    })
}
