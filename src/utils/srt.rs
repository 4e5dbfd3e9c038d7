//! SubRip (SRT) subtitle generation from plain text with estimated timing.

use crate::constants::subtitles::{CUE_GAP_SECONDS, MIN_CUE_SECONDS, WORDS_PER_SECOND};

/// Format seconds as `HH:MM:SS,mmm`
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Split text into sentences, each keeping its terminating `.`, `!` or `?`.
///
/// Text without any terminator is returned as a single sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(format!("{sentence}{c}"));
            }
            current.clear();
        } else {
            current.push(c);
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// One cue per sentence, `WORDS_PER_SECOND` speaking rate, at least
/// `MIN_CUE_SECONDS` per cue and `CUE_GAP_SECONDS` between cues
pub fn generate_srt_from_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let cues = split_sentences(text).into_iter().map(|sentence| {
        let words = sentence.split_whitespace().count() as f64;
        let duration = (words / WORDS_PER_SECOND).max(MIN_CUE_SECONDS);
        (sentence, duration)
    });
    render_cues(cues, CUE_GAP_SECONDS)
}

/// One cue per word, back to back, at `WORDS_PER_SECOND`
pub fn generate_word_srt(text: &str) -> String {
    let duration = 1.0 / WORDS_PER_SECOND;
    render_cues(
        text.split_whitespace().map(|word| (word.to_string(), duration)),
        0.0,
    )
}

/// Number of cues in an SRT document
pub fn count_cues(srt: &str) -> usize {
    srt.matches(" --> ").count()
}

/// Greedy line wrapping for subtitle display
pub fn split_text_for_subtitles(text: &str, max_chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars_per_line {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn render_cues(cues: impl Iterator<Item = (String, f64)>, gap: f64) -> String {
    let mut entries = Vec::new();
    let mut cursor = 0.0;

    for (index, (text, duration)) in cues.enumerate() {
        entries.push(format!(
            "{}\n{} --> {}\n{}\n",
            index + 1,
            format_srt_timestamp(cursor),
            format_srt_timestamp(cursor + duration),
            text
        ));
        cursor += duration + gap;
    }

    entries.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_srt_timestamp(3723.25), "01:02:03,250");
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Hello world. How are you? Fine"),
            vec!["Hello world.", "How are you?", "Fine"]
        );
        assert_eq!(split_sentences("Wow!!"), vec!["Wow!"]);
    }

    #[test]
    fn test_generate_srt_timing() {
        let srt = generate_srt_from_text("One two three four five. Hi.");
        let expected = "1\n00:00:00,000 --> 00:00:02,000\nOne two three four five.\n\n\
                        2\n00:00:02,500 --> 00:00:03,500\nHi.\n";
        assert_eq!(srt, expected);
        assert_eq!(count_cues(&srt), 2);
    }

    #[test]
    fn test_generate_srt_empty() {
        assert_eq!(generate_srt_from_text("   "), "");
    }

    #[test]
    fn test_word_srt() {
        let srt = generate_word_srt("uno dos");
        assert_eq!(count_cues(&srt), 2);
        assert!(srt.contains("00:00:00,400 --> 00:00:00,800\ndos"));
    }

    #[test]
    fn test_split_text_for_subtitles() {
        let lines = split_text_for_subtitles("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }
}
