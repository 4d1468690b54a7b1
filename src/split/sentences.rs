/*!
 * Regex sentence segmentation.
 *
 * A sentence ends at terminal punctuation (optionally followed by closing
 * quotes or brackets) that is followed by whitespace. Abbreviations are not
 * special-cased; the aligner tolerates the resulting extra sentences.
 */

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_END_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?…。！？]+["'”’»)\]]*\s+"#).expect("Invalid sentence end regex")
});

/// A sentence and its byte range within the segmented text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub range: Range<usize>,
}

impl Sentence {
    /// Length in chars
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits a paragraph into sentences
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSegmenter;

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Sentences of `text` in order, without surrounding whitespace
    pub fn segment(&self, text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for m in SENTENCE_END_REGEX.find_iter(text) {
            push_trimmed(&mut sentences, text, start..m.end());
            start = m.end();
        }
        push_trimmed(&mut sentences, text, start..text.len());
        sentences
    }
}

fn push_trimmed(sentences: &mut Vec<Sentence>, text: &str, range: Range<usize>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let start = range.start + leading;
    sentences.push(Sentence {
        text: trimmed.to_string(),
        range: start..start + trimmed.len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_terminalPunctuation_shouldSplit() {
        let sentences = SentenceSegmenter::new().segment("First one. Second one? \"Third!\" Fourth");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["First one.", "Second one?", "\"Third!\"", "Fourth"]);
    }

    #[test]
    fn test_segment_ranges_shouldPointIntoText() {
        let text = "  Hello there.  Bye. ";
        for sentence in SentenceSegmenter::new().segment(text) {
            assert_eq!(&text[sentence.range.clone()], sentence.text);
        }
    }

    #[test]
    fn test_segment_decimalNumber_shouldNotSplit() {
        let sentences = SentenceSegmenter::new().segment("It costs 3.50 today.");
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_segment_blank_shouldBeEmpty() {
        assert!(SentenceSegmenter::new().segment("   ").is_empty());
        assert!(SentenceSegmenter::new().segment("").is_empty());
    }
}
