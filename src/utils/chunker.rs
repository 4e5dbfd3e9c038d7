//! Text chunking for synthesis engines with a per-call character budget.
//!
//! Pieces are packed greedily: whole paragraphs first, sentences when a
//! paragraph exceeds the budget, words when a sentence does. A single word
//! longer than the budget becomes its own chunk.

use tracing::debug;

pub trait TextChunker: Send + Sync {
    /// Split `text` into chunks of at most `max_length` characters where possible
    fn split(&self, text: &str, max_length: usize) -> Vec<String>;

    fn estimate_chunks(&self, text: &str, max_length: usize) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTextChunker;

impl SimpleTextChunker {
    pub fn new() -> Self {
        Self
    }
}

impl TextChunker for SimpleTextChunker {
    fn split(&self, text: &str, max_length: usize) -> Vec<String> {
        if char_len(text) <= max_length {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }

        let mut packer = Packer::new(max_length);
        for paragraph in text.split("\n\n") {
            if char_len(paragraph) <= max_length {
                packer.push(paragraph, "\n\n");
                continue;
            }
            for sentence in split_sentences(paragraph) {
                if char_len(sentence) <= max_length {
                    packer.push(sentence, " ");
                } else {
                    for word in sentence.split_whitespace() {
                        packer.push(word, " ");
                    }
                }
            }
        }

        let chunks = packer.finish();
        debug!(chunks = chunks.len(), max_length = max_length, "Text split into chunks");
        chunks
    }

    fn estimate_chunks(&self, text: &str, max_length: usize) -> usize {
        let length = char_len(text);
        if length <= max_length || max_length == 0 {
            return 1;
        }
        (length as f64 / (max_length as f64 * 0.9)) as usize + 1
    }
}

struct Packer {
    max_length: usize,
    chunks: Vec<String>,
    current: String,
}

impl Packer {
    fn new(max_length: usize) -> Self {
        Self {
            max_length,
            chunks: Vec::new(),
            current: String::new(),
        }
    }

    fn push(&mut self, piece: &str, joiner: &str) {
        let piece = piece.trim();
        if piece.is_empty() {
            return;
        }
        if self.current.is_empty() {
            self.current.push_str(piece);
        } else if char_len(&self.current) + char_len(joiner) + char_len(piece) <= self.max_length {
            self.current.push_str(joiner);
            self.current.push_str(piece);
        } else {
            self.flush();
            self.current.push_str(piece);
        }
    }

    fn flush(&mut self) {
        let chunk = std::mem::take(&mut self.current);
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_i, next_c)) = chars.peek() {
                if next_c.is_whitespace() {
                    sentences.push(&text[start..next_i]);
                    start = next_i;
                }
            }
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = SimpleTextChunker::new().split("  short text  ", 100);
        assert_eq!(chunks, vec!["short text"]);
    }

    #[test]
    fn test_paragraphs_packed_under_budget() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph that is longer.";
        let chunks = SimpleTextChunker::new().split(text, 40);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks[0], "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_long_paragraph_split_by_sentence() {
        let text = "One sentence here. Another sentence there! A third one? Yes.";
        let chunks = SimpleTextChunker::new().split(text, 25);

        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
        assert_eq!(chunks[0], "One sentence here.");
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_long_sentence_split_by_word() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = SimpleTextChunker::new().split(text, 20);

        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_oversized_word_kept_whole() {
        let chunks = SimpleTextChunker::new().split("tiny supercalifragilistic end", 10);
        assert!(chunks.contains(&"supercalifragilistic".to_string()));
    }

    #[test]
    fn test_estimate_chunks() {
        let chunker = SimpleTextChunker::new();
        assert_eq!(chunker.estimate_chunks("abc", 10), 1);
        assert_eq!(chunker.estimate_chunks(&"a".repeat(1000), 100), 12);
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        assert_eq!(
            split_sentences("Hi there. How are you?Fine"),
            vec!["Hi there.", "How are you?Fine"]
        );
    }
}
