use unicode_segmentation::UnicodeSegmentation;
use crate::core::error::Result;

/// Splits text into the ordered token sequence the positional index and
/// the vectorizer both work on. Position = index in the returned vector.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, language: &str, text: &str) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// Lowercasing Unicode word tokenizer
#[derive(Clone)]
pub struct UnicodeTokenizer {
    pub max_token_length: usize,
}

impl Default for UnicodeTokenizer {
    fn default() -> Self {
        UnicodeTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, _language: &str, text: &str) -> Result<Vec<String>> {
        let lowered = text.to_lowercase();
        Ok(lowered
            .unicode_words()
            .filter(|word| word.len() <= self.max_token_length)
            .map(str::to_string)
            .collect())
    }

    fn name(&self) -> &str {
        "unicode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_drops_punctuation() {
        let tokens = UnicodeTokenizer::default().tokenize("en", "Pod-Search: the Engine!").unwrap();
        assert_eq!(tokens, vec!["pod", "search", "the", "engine"]);
    }

    #[test]
    fn test_long_tokens_skipped() {
        let tokenizer = UnicodeTokenizer { max_token_length: 4 };
        let tokens = tokenizer.tokenize("en", "tiny enormous pod").unwrap();
        assert_eq!(tokens, vec!["tiny", "pod"]);
    }
}
