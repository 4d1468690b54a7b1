/*!
 * Caption extraction from marked-up text.
 *
 * A caption is the segment of text between two consecutive subtitle marks
 * (or between the last mark and the end of the text). Text before the first
 * mark is not part of any caption. The extractor expects text that was
 * already validated by the markup parser.
 */

use serde::{Deserialize, Serialize};

/// Default subtitle mark token
pub const SUBTITLE_MARK: char = '@';

/// Caption extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionConfig {
    /// Token that marks the start of a subtitle
    #[serde(default = "default_mark")]
    pub mark: char,

    /// Count leading whitespace towards char_length
    #[serde(default)]
    pub include_leading_whitespace: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            mark: default_mark(),
            include_leading_whitespace: false,
        }
    }
}

fn default_mark() -> char {
    SUBTITLE_MARK
}

/// A single caption extracted from text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Position of the caption within the extracted sequence (0-based)
    pub sequence_index: usize,

    /// Byte offset of the caption's mark within the source text
    pub position: usize,

    /// Length in chars, excluding the mark and trailing whitespace
    pub char_length: usize,

    /// Caption text including its leading mark
    pub content: String,
}

impl Caption {
    /// Caption text without the mark and surrounding whitespace
    pub fn text(&self) -> &str {
        let mut chars = self.content.chars();
        chars.next();
        chars.as_str().trim()
    }

    /// Whitespace separated tokens of the caption text
    pub fn tokens(&self) -> Vec<&str> {
        self.text().split_whitespace().collect()
    }
}

/// Extracts ordered captions from marked-up text
#[derive(Debug, Clone, Default)]
pub struct CaptionExtractor {
    config: CaptionConfig,
}

impl CaptionExtractor {
    /// Create an extractor with the given configuration
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    /// The mark this extractor splits on
    pub fn mark(&self) -> char {
        self.config.mark
    }

    /// Extract captions from text. No marks yields an empty sequence.
    pub fn extract(&self, text: &str) -> Vec<Caption> {
        let mark = self.config.mark;
        let positions: Vec<usize> = text
            .char_indices()
            .filter(|(_, c)| *c == mark)
            .map(|(idx, _)| idx)
            .collect();

        positions
            .iter()
            .enumerate()
            .map(|(sequence_index, &start)| {
                let end = positions.get(sequence_index + 1).copied().unwrap_or(text.len());
                let content = &text[start..end];
                Caption {
                    sequence_index,
                    position: start,
                    char_length: self.char_length(content),
                    content: content.to_string(),
                }
            })
            .collect()
    }

    fn char_length(&self, content: &str) -> usize {
        let body = content.strip_prefix(self.config.mark).unwrap_or(content);
        let body = body.trim_end();
        let body = if self.config.include_leading_whitespace {
            body
        } else {
            body.trim_start()
        };
        body.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_noMarks_shouldReturnEmpty() {
        let extractor = CaptionExtractor::default();
        assert!(extractor.extract("plain text without marks").is_empty());
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn test_extract_multipleMarks_shouldMeasureBetweenMarks() {
        let extractor = CaptionExtractor::default();
        let captions = extractor.extract("# heading\n\n@word1 word2 @word3\n@word4");

        assert_eq!(captions.len(), 3);
        assert_eq!(captions[0].content, "@word1 word2 ");
        assert_eq!(captions[0].char_length, 11);
        assert_eq!(captions[1].text(), "word3");
        assert_eq!(captions[2].sequence_index, 2);
        assert_eq!(captions[2].char_length, 5);
    }

    #[test]
    fn test_extract_leadingWhitespace_shouldRespectConfig() {
        let text = "@  word1 @word2";
        let excluded = CaptionExtractor::default().extract(text);
        let included = CaptionExtractor::new(CaptionConfig {
            include_leading_whitespace: true,
            ..Default::default()
        })
        .extract(text);

        assert_eq!(excluded[0].char_length, 5);
        assert_eq!(included[0].char_length, 7);
    }

    #[test]
    fn test_extract_multibyteText_shouldCountChars() {
        let captions = CaptionExtractor::default().extract("@Ça va très bien @oui");
        assert_eq!(captions[0].char_length, 15);
        assert_eq!(captions[1].position, "@Ça va très bien ".len());
    }
}
