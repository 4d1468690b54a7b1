/*!
 * Global sentence alignment between a primary and a foreign sequence.
 *
 * Needleman-Wunsch over an (n+1)×(m+1) score matrix. A match scores a
 * weighted sum of lexical overlap (shared tokens such as numbers and names)
 * and structural similarity (length ratio), both in [0, 1]; every gap costs
 * the configured penalty. Equal-length sequences are paired positionally.
 */

use serde::{Deserialize, Serialize};

use crate::compute::similarity::{JaccardSimilarity, SimilarityConfig};

/// Aligner scoring parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Score added per gap, must be negative
    #[serde(default = "default_gap_penalty")]
    pub gap_penalty: f64,

    /// Weight of token overlap in a match score
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// Weight of length similarity in a match score
    #[serde(default = "default_structural_weight")]
    pub structural_weight: f64,

    /// Transferred marks below this confidence are logged for review
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            gap_penalty: default_gap_penalty(),
            lexical_weight: default_lexical_weight(),
            structural_weight: default_structural_weight(),
            low_confidence_threshold: default_low_confidence_threshold(),
        }
    }
}

fn default_gap_penalty() -> f64 {
    -0.4
}

fn default_lexical_weight() -> f64 {
    0.3
}

fn default_structural_weight() -> f64 {
    0.7
}

fn default_low_confidence_threshold() -> f64 {
    0.5
}

/// One aligned pair; `None` on a side is a gap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentPair {
    pub primary: Option<usize>,
    pub foreign: Option<usize>,
    /// Match score of the pair, 0.0 for gaps
    pub score: f64,
}

impl AlignmentPair {
    pub fn is_gap(&self) -> bool {
        self.primary.is_none() || self.foreign.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Diagonal,
    Up,
    Left,
}

/// Aligns sentence (or paragraph) sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceAligner {
    config: AlignmentConfig,
}

impl SentenceAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align sentences using lexical and structural similarity
    pub fn align(&self, primary: &[&str], foreign: &[&str]) -> Vec<AlignmentPair> {
        let primary_tokens: Vec<Vec<String>> = primary.iter().map(|s| normalized_tokens(s)).collect();
        let foreign_tokens: Vec<Vec<String>> = foreign.iter().map(|s| normalized_tokens(s)).collect();
        let primary_lengths: Vec<usize> = primary.iter().map(|s| s.chars().count()).collect();
        let foreign_lengths: Vec<usize> = foreign.iter().map(|s| s.chars().count()).collect();

        self.global_alignment(primary.len(), foreign.len(), |i, j| {
            let lexical = token_overlap(&primary_tokens[i], &foreign_tokens[j]);
            let structural = length_ratio(primary_lengths[i], foreign_lengths[j]);
            self.config.lexical_weight * lexical + self.config.structural_weight * structural
        })
    }

    /// Align items by length only
    pub fn align_lengths(&self, primary: &[usize], foreign: &[usize]) -> Vec<AlignmentPair> {
        self.global_alignment(primary.len(), foreign.len(), |i, j| length_ratio(primary[i], foreign[j]))
    }

    /// Match score of two sentences
    pub fn match_score(&self, primary: &str, foreign: &str) -> f64 {
        let lexical = token_overlap(&normalized_tokens(primary), &normalized_tokens(foreign));
        let structural = length_ratio(primary.chars().count(), foreign.chars().count());
        self.config.lexical_weight * lexical + self.config.structural_weight * structural
    }

    fn global_alignment<F: Fn(usize, usize) -> f64>(&self, n: usize, m: usize, score: F) -> Vec<AlignmentPair> {
        if n == m {
            return (0..n)
                .map(|i| AlignmentPair {
                    primary: Some(i),
                    foreign: Some(i),
                    score: score(i, i),
                })
                .collect();
        }

        let gap = self.config.gap_penalty;
        let mut matrix = vec![vec![0.0f64; m + 1]; n + 1];
        let mut steps = vec![vec![Step::Diagonal; m + 1]; n + 1];
        for i in 1..=n {
            matrix[i][0] = i as f64 * gap;
            steps[i][0] = Step::Up;
        }
        for j in 1..=m {
            matrix[0][j] = j as f64 * gap;
            steps[0][j] = Step::Left;
        }

        for i in 1..=n {
            for j in 1..=m {
                let diagonal = matrix[i - 1][j - 1] + score(i - 1, j - 1);
                let up = matrix[i - 1][j] + gap;
                let left = matrix[i][j - 1] + gap;
                // Ties go to the diagonal, then to skipping a primary item
                let (best, step) = if diagonal >= up && diagonal >= left {
                    (diagonal, Step::Diagonal)
                } else if up >= left {
                    (up, Step::Up)
                } else {
                    (left, Step::Left)
                };
                matrix[i][j] = best;
                steps[i][j] = step;
            }
        }

        let mut pairs = Vec::with_capacity(n.max(m));
        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            match steps[i][j] {
                Step::Diagonal if i > 0 && j > 0 => {
                    pairs.push(AlignmentPair {
                        primary: Some(i - 1),
                        foreign: Some(j - 1),
                        score: score(i - 1, j - 1),
                    });
                    i -= 1;
                    j -= 1;
                }
                Step::Up | Step::Diagonal if i > 0 => {
                    pairs.push(AlignmentPair {
                        primary: Some(i - 1),
                        foreign: None,
                        score: 0.0,
                    });
                    i -= 1;
                }
                _ => {
                    pairs.push(AlignmentPair {
                        primary: None,
                        foreign: Some(j - 1),
                        score: 0.0,
                    });
                    j -= 1;
                }
            }
        }
        pairs.reverse();
        pairs
    }
}

/// Lowercased tokens with surrounding punctuation removed
fn normalized_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn token_overlap(a: &[String], b: &[String]) -> f64 {
    let a: Vec<&str> = a.iter().map(String::as_str).collect();
    let b: Vec<&str> = b.iter().map(String::as_str).collect();
    JaccardSimilarity::new(SimilarityConfig::untruncated())
        .compare_tokens(&a, &b)
        .score
}

fn length_ratio(a: usize, b: usize) -> f64 {
    if a == 0 && b == 0 {
        return 1.0;
    }
    a.min(b) as f64 / a.max(b) as f64
}
