/*!
 * Splits a foreign text into subtitles based on the subtitles of its
 * primary text.
 *
 * - `sentences`: regex sentence segmentation
 * - `aligner`: global alignment of sentence and paragraph sequences
 * - `transfer`: maps primary marks onto aligned foreign sentences
 *
 * Paragraphs (non-blank lines) are paired first: positionally when both
 * texts have the same number, otherwise by length alignment. Within each
 * paragraph pair sentences are aligned and the primary marks transferred.
 * Every primary mark produces exactly one foreign mark.
 *
 * Sentence alignment is never perfect. A primary sentence may become two
 * foreign sentences or the other way round; such marks get a low confidence.
 */

use log::{debug, info, warn};

use crate::captions::SUBTITLE_MARK;
use crate::errors::AlignmentError;

pub mod aligner;
pub mod sentences;
pub mod transfer;

pub use aligner::{AlignmentConfig, AlignmentPair, SentenceAligner};
pub use sentences::{Sentence, SentenceSegmenter};
pub use transfer::{BoundaryTransfer, SentenceMark, TransferredMark};

use transfer::{char_to_byte, insert_marks, locate_marks, strip_marks, word_starts};

/// Foreign text with transferred marks
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// Foreign text including the new marks
    pub text: String,
    /// Confidence of each new mark, in document order
    pub confidences: Vec<f64>,
}

impl SplitResult {
    /// Number of marks below the threshold
    pub fn low_confidence_count(&self, threshold: f64) -> usize {
        self.confidences.iter().filter(|c| **c < threshold).count()
    }
}

struct PrimaryParagraph {
    plain: String,
    marks: Vec<usize>,
}

struct ForeignParagraph {
    line: usize,
    text: String,
}

/// A mark placed in a foreign line
#[derive(Clone, Copy)]
struct Placement {
    line: usize,
    byte: usize,
    confidence: f64,
}

/// Transfers subtitle marks from a primary to a foreign text
#[derive(Debug, Clone)]
pub struct SubtitleSplitter {
    mark: char,
    aligner: SentenceAligner,
    segmenter: SentenceSegmenter,
    remove_existing_marks: bool,
}

impl Default for SubtitleSplitter {
    fn default() -> Self {
        Self::new(SUBTITLE_MARK, AlignmentConfig::default())
    }
}

impl SubtitleSplitter {
    pub fn new(mark: char, config: AlignmentConfig) -> Self {
        Self {
            mark,
            aligner: SentenceAligner::new(config),
            segmenter: SentenceSegmenter::new(),
            remove_existing_marks: false,
        }
    }

    /// Remove marks already present in the foreign text before splitting
    pub fn with_remove_existing_marks(mut self, remove: bool) -> Self {
        self.remove_existing_marks = remove;
        self
    }

    /// Add one mark to the foreign text for every mark in the primary text
    pub fn split(&self, primary: &str, foreign: &str) -> Result<SplitResult, AlignmentError> {
        let primary_marks = primary.chars().filter(|c| *c == self.mark).count();
        let foreign = if self.remove_existing_marks {
            foreign.chars().filter(|c| *c != self.mark).collect::<String>()
        } else {
            foreign.to_string()
        };

        let primary_paragraphs: Vec<PrimaryParagraph> = primary
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (plain, marks) = strip_marks(line, self.mark);
                PrimaryParagraph { plain, marks }
            })
            .filter(|p| !p.marks.is_empty() || !p.plain.trim().is_empty())
            .collect();

        let foreign_paragraphs: Vec<ForeignParagraph> = foreign
            .split('\n')
            .enumerate()
            .filter(|(_, line)| line.chars().any(|c| c != self.mark && !c.is_whitespace()))
            .map(|(line, text)| ForeignParagraph {
                line,
                text: text.to_string(),
            })
            .collect();

        if primary_marks > 0 && foreign_paragraphs.is_empty() {
            return Err(AlignmentError::EmptyForeignText { marks: primary_marks });
        }

        let paragraph_pairs = if primary_paragraphs.len() == foreign_paragraphs.len() {
            (0..primary_paragraphs.len())
                .map(|i| AlignmentPair {
                    primary: Some(i),
                    foreign: Some(i),
                    score: 1.0,
                })
                .collect::<Vec<_>>()
        } else {
            let primary_lengths: Vec<usize> = primary_paragraphs.iter().map(|p| p.plain.chars().count()).collect();
            let foreign_lengths: Vec<usize> = foreign_paragraphs.iter().map(|p| p.text.chars().count()).collect();
            info!(
                "Aligning {} primary with {} foreign paragraphs",
                primary_lengths.len(),
                foreign_lengths.len()
            );
            self.aligner.align_lengths(&primary_lengths, &foreign_lengths)
        };

        let mut placements: Vec<Placement> = Vec::with_capacity(primary_marks);
        for (idx, pair) in paragraph_pairs.iter().enumerate() {
            let Some(p) = pair.primary else { continue };
            let paragraph = &primary_paragraphs[p];
            if paragraph.marks.is_empty() {
                continue;
            }

            match pair.foreign {
                Some(f) => {
                    placements.extend(self.split_paragraph(paragraph, &foreign_paragraphs[f])?);
                }
                None => {
                    let placement = self.attach_paragraph(&paragraph_pairs, idx, &foreign_paragraphs)?;
                    warn!(
                        "Primary paragraph {} has no foreign counterpart, attaching {} marks to foreign line {}",
                        p,
                        paragraph.marks.len(),
                        placement.line + 1
                    );
                    for _ in 0..paragraph.marks.len() {
                        placements.push(placement);
                    }
                }
            }
        }

        if placements.len() != primary_marks {
            return Err(AlignmentError::CountNotConserved {
                primary: primary_marks,
                foreign: placements.len(),
            });
        }

        placements.sort_by_key(|p| (p.line, p.byte));
        let mut lines: Vec<String> = foreign.split('\n').map(str::to_string).collect();
        separate_placements(&mut placements, &lines);
        for (line_idx, line) in lines.iter_mut().enumerate() {
            let positions: Vec<usize> = placements
                .iter()
                .filter(|p| p.line == line_idx)
                .map(|p| p.byte)
                .collect();
            if !positions.is_empty() {
                *line = insert_marks(line, &positions, self.mark);
            }
        }

        let threshold = self.aligner.config().low_confidence_threshold;
        for placement in placements.iter().filter(|p| p.confidence < threshold) {
            warn!(
                "Low confidence {:.2} for subtitle mark on foreign line {}",
                placement.confidence,
                placement.line + 1
            );
        }

        let result = SplitResult {
            text: lines.join("\n"),
            confidences: placements.iter().map(|p| p.confidence).collect(),
        };
        info!(
            "Transferred {} subtitle marks ({} below confidence {:.2})",
            result.confidences.len(),
            result.low_confidence_count(threshold),
            threshold
        );
        Ok(result)
    }

    fn split_paragraph(
        &self,
        primary: &PrimaryParagraph,
        foreign: &ForeignParagraph,
    ) -> Result<Vec<Placement>, AlignmentError> {
        let mut primary_sentences = self.segmenter.segment(&primary.plain);
        if primary_sentences.is_empty() {
            primary_sentences.push(Sentence {
                text: String::new(),
                range: 0..0,
            });
        }
        let foreign_sentences = self.segmenter.segment(&foreign.text);

        let primary_texts: Vec<&str> = primary_sentences.iter().map(|s| s.text.as_str()).collect();
        let foreign_texts: Vec<&str> = foreign_sentences.iter().map(|s| s.text.as_str()).collect();
        let alignment = self.aligner.align(&primary_texts, &foreign_texts);
        debug!(
            "Aligned {} primary with {} foreign sentences on foreign line {}",
            primary_texts.len(),
            foreign_texts.len(),
            foreign.line + 1
        );

        let marks = locate_marks(&primary.plain, &primary.marks, &primary_sentences);
        let transferred = BoundaryTransfer::new(&primary_sentences, &foreign_sentences, &alignment).transfer(&marks)?;

        Ok(transferred
            .into_iter()
            .map(|t| {
                let sentence = &foreign_sentences[t.sentence];
                Placement {
                    line: foreign.line,
                    byte: sentence.range.start + char_to_byte(&sentence.text, t.offset),
                    confidence: t.confidence,
                }
            })
            .collect())
    }

    /// Spot in the nearest paired foreign paragraph for marks of an unpaired primary paragraph
    fn attach_paragraph(
        &self,
        pairs: &[AlignmentPair],
        idx: usize,
        foreign: &[ForeignParagraph],
    ) -> Result<Placement, AlignmentError> {
        for distance in 1..=pairs.len() {
            if let Some(f) = pairs.get(idx + distance).and_then(|p| p.foreign) {
                let paragraph = &foreign[f];
                let start = word_starts(&paragraph.text).first().copied().unwrap_or(0);
                return Ok(Placement {
                    line: paragraph.line,
                    byte: char_to_byte(&paragraph.text, start),
                    confidence: 0.0,
                });
            }
            if let Some(f) = idx.checked_sub(distance).and_then(|i| pairs.get(i)).and_then(|p| p.foreign) {
                let paragraph = &foreign[f];
                let last = word_starts(&paragraph.text).last().copied().unwrap_or(0);
                return Ok(Placement {
                    line: paragraph.line,
                    byte: char_to_byte(&paragraph.text, last),
                    confidence: 0.0,
                });
            }
        }
        Err(AlignmentError::EmptyForeignText { marks: 1 })
    }
}

/// Spread placements that share a line so no two marks stack on the same spot.
///
/// A placement on or before its predecessor moves to the next free word start. When the line
/// runs out of words, the predecessor moves back to an earlier word start instead. `placements`
/// must be sorted by line and byte; `lines` are the foreign lines before any mark is inserted.
fn separate_placements(placements: &mut [Placement], lines: &[String]) {
    let mut start = 0;
    while start < placements.len() {
        let line = placements[start].line;
        let end = start + placements[start..].iter().take_while(|p| p.line == line).count();
        let text = &lines[line];
        let starts: Vec<usize> = word_starts(text)
            .into_iter()
            .map(|idx| char_to_byte(text, idx))
            .collect();
        let run = &mut placements[start..end];

        for k in 1..run.len() {
            if run[k].byte <= run[k - 1].byte {
                let previous = run[k - 1].byte;
                run[k].byte = starts.iter().copied().find(|&b| b > previous).unwrap_or(previous);
            }
        }
        for k in (1..run.len()).rev() {
            if run[k - 1].byte >= run[k].byte {
                let next = run[k].byte;
                match starts.iter().rev().copied().find(|&b| b < next) {
                    Some(byte) => run[k - 1].byte = byte,
                    None => warn!(
                        "Foreign line {} has fewer words than subtitle marks, stacking marks",
                        line + 1
                    ),
                }
            }
        }

        start = end;
    }
}
