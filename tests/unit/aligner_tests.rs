/*!
 * Tests for sentence alignment
 */

use stsync::split::{AlignmentConfig, SentenceAligner, SentenceSegmenter};

#[test]
fn test_align_equalLengths_shouldHaveNoGaps() {
    let aligner = SentenceAligner::new(AlignmentConfig::default());
    let primary = ["One.", "Two is longer.", "Three."];
    let foreign = ["Un deux trois quatre.", "Deux.", "Trois."];

    let pairs = aligner.align(&primary, &foreign);

    assert_eq!(pairs.len(), 3);
    assert!(pairs.iter().all(|p| !p.is_gap()));
    let positions: Vec<(Option<usize>, Option<usize>)> = pairs.iter().map(|p| (p.primary, p.foreign)).collect();
    assert_eq!(
        positions,
        vec![(Some(0), Some(0)), (Some(1), Some(1)), (Some(2), Some(2))]
    );
}

#[test]
fn test_align_threeAgainstFive_shouldHaveTwoPrimaryGaps() {
    let aligner = SentenceAligner::new(AlignmentConfig::default());
    let segmenter = SentenceSegmenter::new();
    let primary = segmenter.segment("Chapter 1 begins in 1920. The town had 300 people. It ended in 1945.");
    let foreign = segmenter.segment(
        "Le chapitre 1 commence en 1920. Il pleuvait. La ville avait 300 habitants. Tout était très calme ce jour-là dans la vallée. Il se termina en 1945.",
    );
    let primary: Vec<&str> = primary.iter().map(|s| s.text.as_str()).collect();
    let foreign: Vec<&str> = foreign.iter().map(|s| s.text.as_str()).collect();
    assert_eq!((primary.len(), foreign.len()), (3, 5));

    let pairs = aligner.align(&primary, &foreign);

    assert_eq!(pairs.iter().filter(|p| p.primary.is_none()).count(), 2);
    assert_eq!(pairs.iter().filter(|p| p.foreign.is_none()).count(), 0);
    let matched: Vec<(usize, usize)> = pairs
        .iter()
        .filter_map(|p| Some((p.primary?, p.foreign?)))
        .collect();
    assert_eq!(matched, vec![(0, 0), (1, 2), (2, 4)]);
}
