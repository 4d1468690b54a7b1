/*!
 * Classifies the caption changes inside a single diff hunk.
 *
 * Identical leading and trailing captions are stripped first. What remains
 * is scanned left to right with one cursor per side:
 *
 * - With equal remaining counts every differing position is a content change,
 *   unless two adjacent captions only traded words across their shared
 *   boundary, which is a move.
 * - With more new captions, the next new caption is either inserted or split
 *   off the current old caption. With more old captions the dual holds
 *   (delete or merge).
 * - Once one side is used up, the rest of the other side is inserted or
 *   deleted.
 *
 * Competing classifications are scored with token-set similarity and must
 * clear a confidence threshold. When both the simple (insert/delete) and the
 * compound (split/merge) reading clear it, the configured preference decides.
 * A hunk that nothing explains is reported as ambiguous.
 */

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::captions::Caption;
use crate::errors::ComputeError;
use crate::subtitle::{new_placeholder, AffectedStid, Operation, OperationType};

use super::similarity::{Alignment, JaccardSimilarity, SimilarityConfig};

/// Thresholds and preferences of the operation computer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationComputerConfig {
    /// Minimum score a classification needs (0.0-1.0]
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Prefer insert/delete over split/merge when both clear the threshold
    #[serde(default = "default_true")]
    pub prefer_insert_delete: bool,

    /// Detect words moving across a subtitle boundary
    #[serde(default = "default_true")]
    pub detect_moves: bool,
}

impl Default for OperationComputerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            prefer_insert_delete: true,
            detect_moves: true,
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.75
}

fn default_true() -> bool {
    true
}

/// Captions of one hunk region plus what's needed to name them
#[derive(Debug, Clone)]
pub struct HunkInput<'a> {
    /// Hunk header, used in error messages
    pub header: String,
    /// Old captions in the hunk region, in document order
    pub old: &'a [Caption],
    /// New captions in the hunk region, in document order
    pub new: &'a [Caption],
    /// Stid of each old caption
    pub old_stids: &'a [String],
    /// Stid of the subtitle right before the region, none at document start
    pub anchor: Option<String>,
}

/// Operations of one hunk
#[derive(Debug, Clone, Default)]
pub struct HunkOperations {
    pub operations: Vec<Operation>,
    /// Stid of the last subtitle of the region in new order, the anchor for what follows
    pub trailing_stid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Choice {
    Simple,
    Compound(usize),
    Keep,
}

/// Computes subtitle operations for one hunk
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtitleOperationsForHunk {
    config: OperationComputerConfig,
}

impl SubtitleOperationsForHunk {
    pub fn new(config: OperationComputerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OperationComputerConfig {
        &self.config
    }

    /// Compute operations for the hunk. `next_new` numbers the placeholders of created subtitles
    /// and is shared across the hunks of a file.
    pub fn compute(
        &self,
        file_identity: &str,
        input: &HunkInput<'_>,
        next_new: &mut usize,
    ) -> Result<HunkOperations, ComputeError> {
        let (old, new) = (input.old, input.new);
        if old.len() != input.old_stids.len() {
            return Err(ComputeError::InvalidDiff(format!(
                "{} old captions but {} stids in {}",
                old.len(),
                input.old_stids.len(),
                input.header
            )));
        }

        let common = old.len().min(new.len());
        let lead = (0..common).take_while(|&k| old[k].text() == new[k].text()).count();
        let trail = (0..common - lead)
            .take_while(|&k| old[old.len() - 1 - k].text() == new[new.len() - 1 - k].text())
            .count();

        let anchor = if lead > 0 {
            Some(input.old_stids[lead - 1].clone())
        } else {
            input.anchor.clone()
        };

        let mut scan = HunkScan {
            config: &self.config,
            file_identity,
            header: &input.header,
            old,
            new,
            old_stids: input.old_stids,
            i: lead,
            j: lead,
            old_end: old.len() - trail,
            new_end: new.len() - trail,
            last: anchor,
            next_new,
            operations: Vec::new(),
        };
        scan.run()?;

        let trailing_stid = if trail > 0 {
            input.old_stids.last().cloned()
        } else {
            scan.last.clone()
        };
        debug!(
            "{} {}: {} operations ({} leading, {} trailing captions unchanged)",
            file_identity,
            input.header,
            scan.operations.len(),
            lead,
            trail
        );

        Ok(HunkOperations {
            operations: scan.operations,
            trailing_stid,
        })
    }
}

struct HunkScan<'a, 'n> {
    config: &'a OperationComputerConfig,
    file_identity: &'a str,
    header: &'a str,
    old: &'a [Caption],
    new: &'a [Caption],
    old_stids: &'a [String],
    i: usize,
    j: usize,
    old_end: usize,
    new_end: usize,
    last: Option<String>,
    next_new: &'n mut usize,
    operations: Vec<Operation>,
}

impl HunkScan<'_, '_> {
    fn run(&mut self) -> Result<(), ComputeError> {
        while self.i < self.old_end || self.j < self.new_end {
            let remaining_old = self.old_end - self.i;
            let remaining_new = self.new_end - self.j;

            if remaining_old == 0 {
                self.insert()?;
            } else if remaining_new == 0 {
                self.delete()?;
            } else if self.old[self.i].text() == self.new[self.j].text() {
                self.keep();
            } else if remaining_old == remaining_new {
                if self.is_move() {
                    self.shift()?;
                } else {
                    self.content_change()?;
                }
            } else if remaining_new > remaining_old {
                let simple = self.insert_score();
                let (pieces, compound) = self.best_split(remaining_new - remaining_old + 1);
                match self.choose(simple, compound, pieces)? {
                    Choice::Simple => self.insert()?,
                    Choice::Compound(k) => self.split(k)?,
                    Choice::Keep => self.content_change()?,
                }
            } else {
                let simple = self.delete_score();
                let (pieces, compound) = self.best_merge(remaining_old - remaining_new + 1);
                match self.choose(simple, compound, pieces)? {
                    Choice::Simple => self.delete()?,
                    Choice::Compound(k) => self.merge(k)?,
                    Choice::Keep => self.content_change()?,
                }
            }
        }
        Ok(())
    }

    fn choose(&self, simple: f64, compound: f64, pieces: usize) -> Result<Choice, ComputeError> {
        let threshold = self.config.confidence_threshold;
        let keep = jaccard(&self.old[self.i].tokens(), &self.new[self.j].tokens());
        debug!(
            "{} {} at old {} / new {}: simple {:.3}, compound {:.3} ({} pieces), keep {:.3}",
            self.file_identity, self.header, self.i, self.j, simple, compound, pieces, keep
        );

        match (simple >= threshold, compound >= threshold) {
            (true, true) if self.config.prefer_insert_delete => Ok(Choice::Simple),
            (true, true) | (false, true) => Ok(Choice::Compound(pieces)),
            (true, false) => Ok(Choice::Simple),
            (false, false) if keep >= threshold => Ok(Choice::Keep),
            (false, false) => Err(ComputeError::AmbiguousOperation {
                file: self.file_identity.to_string(),
                hunk: self.header.to_string(),
                best_score: simple.max(compound).max(keep),
                threshold,
            }),
        }
    }

    /// Next new caption is new and the current old caption lives on in the one after it
    fn insert_score(&self) -> f64 {
        let survivor = jaccard(&self.old[self.i].tokens(), &self.new[self.j + 1].tokens());
        let novelty = novelty(
            &self.new[self.j].tokens(),
            &self.new[self.j..self.new_end],
            &self.old[self.i..self.old_end],
        );
        survivor.min(novelty)
    }

    /// Current old caption is gone and the next one lives on in the current new caption
    fn delete_score(&self) -> f64 {
        let survivor = jaccard(&self.old[self.i + 1].tokens(), &self.new[self.j].tokens());
        let novelty = novelty(
            &self.old[self.i].tokens(),
            &self.old[self.i..self.old_end],
            &self.new[self.j..self.new_end],
        );
        survivor.min(novelty)
    }

    fn best_split(&self, max_pieces: usize) -> (usize, f64) {
        best_compound(&self.old[self.i], &self.new[self.j..self.j + max_pieces])
    }

    fn best_merge(&self, max_pieces: usize) -> (usize, f64) {
        best_compound(&self.new[self.j], &self.old[self.i..self.i + max_pieces])
    }

    fn is_move(&self) -> bool {
        if !self.config.detect_moves || self.i + 1 >= self.old_end || self.j + 1 >= self.new_end {
            return false;
        }
        let mut before = self.old[self.i].tokens();
        before.extend(self.old[self.i + 1].tokens());
        let mut after = self.new[self.j].tokens();
        after.extend(self.new[self.j + 1].tokens());
        before == after
    }

    fn keep(&mut self) {
        self.last = Some(self.old_stids[self.i].clone());
        self.i += 1;
        self.j += 1;
    }

    fn content_change(&mut self) -> Result<(), ComputeError> {
        let stid = self.old_stids[self.i].clone();
        let record = AffectedStid::new(
            stid.clone(),
            Some(caption_text(&self.old[self.i])),
            Some(caption_text(&self.new[self.j])),
        );
        self.push(OperationType::ContentChange, vec![record])?;
        self.last = Some(stid);
        self.i += 1;
        self.j += 1;
        Ok(())
    }

    fn shift(&mut self) -> Result<(), ComputeError> {
        let operation_type = if self.new[self.j].tokens().len() < self.old[self.i].tokens().len() {
            OperationType::MoveLeft
        } else {
            OperationType::MoveRight
        };
        let records = (0..2)
            .map(|k| {
                AffectedStid::new(
                    self.old_stids[self.i + k].clone(),
                    Some(caption_text(&self.old[self.i + k])),
                    Some(caption_text(&self.new[self.j + k])),
                )
            })
            .collect();
        self.push(operation_type, records)?;
        self.last = Some(self.old_stids[self.i + 1].clone());
        self.i += 2;
        self.j += 2;
        Ok(())
    }

    fn insert(&mut self) -> Result<(), ComputeError> {
        let stid = self.allocate_placeholder();
        let record = AffectedStid::new(stid.clone(), None, Some(caption_text(&self.new[self.j])))
            .with_after_stid(self.last.clone());
        self.push(OperationType::Insert, vec![record])?;
        self.last = Some(stid);
        self.j += 1;
        Ok(())
    }

    fn delete(&mut self) -> Result<(), ComputeError> {
        let record = AffectedStid::new(
            self.old_stids[self.i].clone(),
            Some(caption_text(&self.old[self.i])),
            None,
        )
        .with_after_stid(self.last.clone());
        self.push(OperationType::Delete, vec![record])?;
        self.i += 1;
        Ok(())
    }

    fn split(&mut self, pieces: usize) -> Result<(), ComputeError> {
        let kept = self.old_stids[self.i].clone();
        let mut records = vec![AffectedStid::new(
            kept.clone(),
            Some(caption_text(&self.old[self.i])),
            Some(caption_text(&self.new[self.j])),
        )];
        let mut previous = kept;
        for k in 1..pieces {
            let stid = self.allocate_placeholder();
            records.push(
                AffectedStid::new(stid.clone(), None, Some(caption_text(&self.new[self.j + k])))
                    .with_after_stid(Some(previous)),
            );
            previous = stid;
        }
        self.push(OperationType::Split, records)?;
        self.last = Some(previous);
        self.i += 1;
        self.j += pieces;
        Ok(())
    }

    fn merge(&mut self, pieces: usize) -> Result<(), ComputeError> {
        let kept = self.old_stids[self.i].clone();
        let mut records = vec![AffectedStid::new(
            kept.clone(),
            Some(caption_text(&self.old[self.i])),
            Some(caption_text(&self.new[self.j])),
        )];
        for k in 1..pieces {
            records.push(AffectedStid::new(
                self.old_stids[self.i + k].clone(),
                Some(caption_text(&self.old[self.i + k])),
                None,
            ));
        }
        self.push(OperationType::Merge, records)?;
        self.last = Some(kept);
        self.i += pieces;
        self.j += 1;
        Ok(())
    }

    fn allocate_placeholder(&mut self) -> String {
        let stid = new_placeholder(*self.next_new);
        *self.next_new += 1;
        stid
    }

    fn push(&mut self, operation_type: OperationType, records: Vec<AffectedStid>) -> Result<(), ComputeError> {
        let operation = Operation::new(Uuid::new_v4().to_string(), operation_type, records)?;
        debug!("{} {}: {}", self.file_identity, self.header, operation);
        self.operations.push(operation);
        Ok(())
    }
}

/// Best way to explain `whole` as the concatenation of the leading `pieces`, trying 2 up to all of them
fn best_compound(whole: &Caption, pieces: &[Caption]) -> (usize, f64) {
    let whole_tokens = whole.tokens();
    let mut best = (2, 0.0);
    for k in 2..=pieces.len() {
        let first = left(&whole_tokens, &pieces[0].tokens());
        let last = right(&whole_tokens, &pieces[k - 1].tokens());
        let combined: Vec<&str> = pieces[..k].iter().flat_map(Caption::tokens).collect();
        let overall = jaccard(&whole_tokens, &combined);
        let score = first.min(last).min(overall);
        if score > best.1 {
            best = (k, score);
        }
    }
    best
}

/// Share of `candidate` tokens not accounted for by `other` once `own` is set against it
fn novelty(candidate: &[&str], own: &[Caption], other: &[Caption]) -> f64 {
    if candidate.is_empty() {
        return 1.0;
    }
    let mut surplus: HashMap<&str, i64> = HashMap::new();
    for caption in own {
        for token in caption.tokens() {
            *surplus.entry(token).or_default() += 1;
        }
    }
    for caption in other {
        for token in caption.tokens() {
            *surplus.entry(token).or_default() -= 1;
        }
    }

    let mut novel = 0;
    for token in candidate {
        if let Some(count) = surplus.get_mut(token) {
            if *count > 0 {
                *count -= 1;
                novel += 1;
            }
        }
    }
    novel as f64 / candidate.len() as f64
}

fn jaccard(a: &[&str], b: &[&str]) -> f64 {
    JaccardSimilarity::new(SimilarityConfig::untruncated()).compare_tokens(a, b).score
}

fn left(a: &[&str], b: &[&str]) -> f64 {
    JaccardSimilarity::new(SimilarityConfig::truncated(Alignment::Left))
        .compare_tokens(a, b)
        .score
}

fn right(a: &[&str], b: &[&str]) -> f64 {
    JaccardSimilarity::new(SimilarityConfig::truncated(Alignment::Right))
        .compare_tokens(a, b)
        .score
}

/// Caption text as stored in operations, mark included
fn caption_text(caption: &Caption) -> String {
    caption.content.trim_end().to_string()
}
