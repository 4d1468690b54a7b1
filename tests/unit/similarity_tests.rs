/*!
 * Tests for the similarity scorer
 */

use stsync::compute::similarity::compute;
use stsync::compute::{Alignment, JaccardSimilarity, SimilarityConfig};

const SHORT: &str = "word1 word2 word3";
const LONG: &str = "word1 word2 word3 word4 word5";

#[test]
fn test_compute_truncatedLeft_shouldMatchPrefix() {
    assert_eq!(compute(SHORT, LONG, true, Alignment::Left), (1.0, 1.0));
}

#[test]
fn test_compute_truncatedRight_shouldMatchSuffixOnly() {
    assert_eq!(compute(SHORT, LONG, true, Alignment::Right), (0.2, 0.3));
}

#[test]
fn test_compute_emptyStrings_shouldBeZero() {
    assert_eq!(compute("", "", true, Alignment::Left), (0.0, 0.0));
    assert_eq!(compute("", "", false, Alignment::Right), (0.0, 0.0));
}

#[test]
fn test_compare_identicalSequences_shouldBeOne() {
    let scorer = JaccardSimilarity::new(SimilarityConfig::untruncated());
    assert_eq!(scorer.compare(LONG, LONG).as_tuple(), (1.0, 1.0));
}

#[test]
fn test_compare_untruncated_shouldScoreWholeSets() {
    let scorer = JaccardSimilarity::new(SimilarityConfig::untruncated());
    let similarity = scorer.compare(SHORT, LONG);
    assert!((similarity.score - 0.6).abs() < 1e-9);
}
