/*!
 * Transfers subtitle boundaries from primary sentences to aligned foreign
 * sentences.
 *
 * A mark at char offset k of a primary sentence of length L lands at
 * round(k / L × M) in the paired foreign sentence of length M, snapped back
 * to the start of the word it falls in. Marks in a primary sentence without
 * a foreign partner attach to the nearest paired neighbour: the start of a
 * following sentence or the last word of a preceding one.
 */

use log::warn;

use crate::errors::AlignmentError;

use super::aligner::AlignmentPair;
use super::sentences::Sentence;

/// A subtitle mark located in a primary sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceMark {
    pub sentence: usize,
    /// Offset in chars from the sentence start
    pub offset: usize,
}

/// Where a mark lands in the foreign sentences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferredMark {
    pub sentence: usize,
    /// Offset in chars from the sentence start, always a word start
    pub offset: usize,
    pub confidence: f64,
}

/// Remove every `mark` from text, returning the plain text and the byte offset of each mark in it
pub fn strip_marks(text: &str, mark: char) -> (String, Vec<usize>) {
    let mut plain = String::with_capacity(text.len());
    let mut offsets = Vec::new();
    for c in text.chars() {
        if c == mark {
            offsets.push(plain.len());
        } else {
            plain.push(c);
        }
    }
    (plain, offsets)
}

/// Insert `mark` at each byte position of text
pub fn insert_marks(text: &str, positions: &[usize], mark: char) -> String {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    let mut out = String::with_capacity(text.len() + sorted.len());
    let mut last = 0;
    for pos in sorted {
        let pos = pos.min(text.len());
        out.push_str(&text[last..pos]);
        out.push(mark);
        last = pos;
    }
    out.push_str(&text[last..]);
    out
}

/// Locate marks (byte offsets in the plain paragraph) in its sentences
pub fn locate_marks(plain: &str, mark_offsets: &[usize], sentences: &[Sentence]) -> Vec<SentenceMark> {
    mark_offsets
        .iter()
        .map(|&byte| {
            match sentences.iter().position(|s| byte < s.range.end) {
                Some(idx) => {
                    let start = sentences[idx].range.start;
                    let offset = if byte <= start {
                        0
                    } else {
                        plain[start..byte].chars().count()
                    };
                    SentenceMark { sentence: idx, offset }
                }
                None => SentenceMark {
                    sentence: sentences.len().saturating_sub(1),
                    offset: sentences.last().map(Sentence::char_len).unwrap_or(0),
                },
            }
        })
        .collect()
}

/// Char indexes where words start
pub fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous_is_space = true;
    for (idx, c) in text.chars().enumerate() {
        let is_space = c.is_whitespace();
        if !is_space && previous_is_space {
            starts.push(idx);
        }
        previous_is_space = is_space;
    }
    starts
}

/// Byte offset of a char index
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices().nth(char_idx).map(|(b, _)| b).unwrap_or(text.len())
}

/// Maps primary marks onto foreign sentences through an alignment
#[derive(Debug, Clone, Copy)]
pub struct BoundaryTransfer<'a> {
    primary: &'a [Sentence],
    foreign: &'a [Sentence],
    alignment: &'a [AlignmentPair],
}

impl<'a> BoundaryTransfer<'a> {
    pub fn new(primary: &'a [Sentence], foreign: &'a [Sentence], alignment: &'a [AlignmentPair]) -> Self {
        Self {
            primary,
            foreign,
            alignment,
        }
    }

    /// Transfer every mark. The result has one entry per input mark, in order.
    pub fn transfer(&self, marks: &[SentenceMark]) -> Result<Vec<TransferredMark>, AlignmentError> {
        if marks.is_empty() {
            return Ok(Vec::new());
        }
        if self.foreign.is_empty() {
            return Err(AlignmentError::EmptyForeignText { marks: marks.len() });
        }

        let mut transferred: Vec<TransferredMark> = Vec::with_capacity(marks.len());
        for mark in marks {
            let mut next = self.transfer_one(mark)?;

            // Two marks on the same word would produce an empty subtitle
            if let Some(previous) = transferred.last() {
                if (next.sentence, next.offset) <= (previous.sentence, previous.offset) {
                    let starts = word_starts(&self.foreign[previous.sentence].text);
                    match starts.into_iter().find(|&s| s > previous.offset) {
                        Some(offset) => {
                            next.sentence = previous.sentence;
                            next.offset = offset;
                        }
                        None => {
                            warn!(
                                "Two subtitle marks collapse onto foreign sentence {} offset {}",
                                previous.sentence, previous.offset
                            );
                            next.sentence = previous.sentence;
                            next.offset = previous.offset;
                        }
                    }
                }
            }
            transferred.push(next);
        }

        Ok(transferred)
    }

    fn transfer_one(&self, mark: &SentenceMark) -> Result<TransferredMark, AlignmentError> {
        let position = self
            .alignment
            .iter()
            .position(|pair| pair.primary == Some(mark.sentence));

        if let Some(idx) = position {
            let pair = &self.alignment[idx];
            if let Some(f) = pair.foreign {
                let primary_len = self.primary.get(mark.sentence).map(Sentence::char_len).unwrap_or(0);
                let foreign = &self.foreign[f];
                let target = if primary_len == 0 {
                    0
                } else {
                    let ratio = mark.offset.min(primary_len) as f64 / primary_len as f64;
                    (ratio * foreign.char_len() as f64).round() as usize
                };
                return Ok(TransferredMark {
                    sentence: f,
                    offset: snap_to_word_start(&foreign.text, target),
                    confidence: pair.score,
                });
            }
        }

        self.attach_to_neighbour(position.unwrap_or(0))
            .ok_or(AlignmentError::EmptyForeignText { marks: 1 })
    }

    fn attach_to_neighbour(&self, idx: usize) -> Option<TransferredMark> {
        for distance in 1..=self.alignment.len() {
            if let Some(f) = self.alignment.get(idx + distance).and_then(|p| p.foreign) {
                return Some(TransferredMark {
                    sentence: f,
                    offset: 0,
                    confidence: 0.0,
                });
            }
            if let Some(f) = idx
                .checked_sub(distance)
                .and_then(|i| self.alignment.get(i))
                .and_then(|p| p.foreign)
            {
                let offset = word_starts(&self.foreign[f].text).last().copied().unwrap_or(0);
                return Some(TransferredMark {
                    sentence: f,
                    offset,
                    confidence: 0.0,
                });
            }
        }
        None
    }
}

/// Last word start at or before `target`
fn snap_to_word_start(text: &str, target: usize) -> usize {
    word_starts(text)
        .into_iter()
        .take_while(|&s| s <= target)
        .last()
        .unwrap_or(0)
}
