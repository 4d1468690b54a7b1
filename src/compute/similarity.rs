/*!
 * Token-set similarity between two text spans.
 *
 * Computes a Jaccard index over whitespace-separated tokens, optionally
 * truncating the longer token sequence to the length of the shorter one,
 * anchored at the left or right edge. A second value rates how much the
 * first one can be trusted: identical token sequences are fully trusted,
 * otherwise confidence grows with the number of compared tokens.
 */

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Number of compared tokens at which a non-identical comparison reaches full confidence
const FULL_CONFIDENCE_TOKEN_COUNT: usize = 10;

/// Which edge to keep when truncating the longer token sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Keep the leading tokens
    #[default]
    Left,
    /// Keep the trailing tokens
    Right,
}

/// Similarity scorer configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Truncate the longer sequence to the shorter one's length
    #[serde(default)]
    pub truncate_to_shortest: bool,

    /// Edge the truncation is anchored at
    #[serde(default)]
    pub alignment: Alignment,
}

impl SimilarityConfig {
    /// Truncating config anchored at the given edge
    pub fn truncated(alignment: Alignment) -> Self {
        Self {
            truncate_to_shortest: true,
            alignment,
        }
    }

    /// Non-truncating config
    pub fn untruncated() -> Self {
        Self::default()
    }
}

/// Result of comparing two spans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    /// Jaccard index of the compared token sets (0.0-1.0)
    pub score: f64,
    /// How far the score can be trusted (0.0-1.0)
    pub confidence: f64,
}

impl Similarity {
    /// Both values as a tuple
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.score, self.confidence)
    }
}

/// Jaccard similarity scorer with directional truncation
#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardSimilarity {
    config: SimilarityConfig,
}

impl JaccardSimilarity {
    /// Create a scorer with the given configuration
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    /// Score two text spans, tokenizing on whitespace
    pub fn compare(&self, a: &str, b: &str) -> Similarity {
        let a_tokens: Vec<&str> = a.split_whitespace().collect();
        let b_tokens: Vec<&str> = b.split_whitespace().collect();
        self.compare_tokens(&a_tokens, &b_tokens)
    }

    /// Score two pre-tokenized word sequences
    pub fn compare_tokens(&self, a: &[&str], b: &[&str]) -> Similarity {
        if a.is_empty() || b.is_empty() {
            return Similarity {
                score: 0.0,
                confidence: 0.0,
            };
        }

        let (a, b) = if self.config.truncate_to_shortest {
            let len = a.len().min(b.len());
            (
                truncate(a, len, self.config.alignment),
                truncate(b, len, self.config.alignment),
            )
        } else {
            (a, b)
        };

        let a_set: HashSet<&str> = a.iter().copied().collect();
        let b_set: HashSet<&str> = b.iter().copied().collect();
        let intersection = a_set.intersection(&b_set).count();
        let union = a_set.union(&b_set).count();
        let score = intersection as f64 / union as f64;

        let confidence = if a == b {
            1.0
        } else {
            let compared = a.len().min(b.len()).min(FULL_CONFIDENCE_TOKEN_COUNT);
            compared as f64 / FULL_CONFIDENCE_TOKEN_COUNT as f64
        };

        Similarity { score, confidence }
    }
}

/// Compute similarity of two spans with the given truncation settings
pub fn compute(a: &str, b: &str, truncate_to_shortest: bool, alignment: Alignment) -> (f64, f64) {
    JaccardSimilarity::new(SimilarityConfig {
        truncate_to_shortest,
        alignment,
    })
    .compare(a, b)
    .as_tuple()
}

fn truncate<'a, 'b>(tokens: &'a [&'b str], len: usize, alignment: Alignment) -> &'a [&'b str] {
    match alignment {
        Alignment::Left => &tokens[..len],
        Alignment::Right => &tokens[tokens.len() - len..],
    }
}
