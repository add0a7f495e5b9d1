//! Sentence segmentation for narration
//!
//! Splits episode text into playback units: paragraphs on blank-line
//! boundaries, sentences on terminal punctuation followed by whitespace.
//! The paragraph-start tag drives an inter-paragraph pacing pause.

use once_cell::sync::Lazy;
use regex::Regex;

use narrator_core::PlaybackUnit;

/// Blank-line paragraph boundary, tolerant of whitespace on the blank line.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph break regex"));

/// Split full episode text into playback units.
///
/// Also used for a single streamed `sentence` payload, which normally
/// yields one untagged unit.
pub fn segment_content(text: &str) -> Vec<PlaybackUnit> {
    let mut units = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        let mut first_in_paragraph = true;
        for sentence in split_sentences(paragraph) {
            // the very first audible sentence never gets a pause
            let is_paragraph_start = first_in_paragraph && !units.is_empty();
            units.push(PlaybackUnit::new(sentence, is_paragraph_start));
            first_in_paragraph = false;
        }
    }
    units
}

/// Terminal punctuation, with any trailing closing quotes or brackets,
/// marks a sentence boundary when followed by whitespace or end of text.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut iter = paragraph.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = iter.peek() {
            if matches!(next, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
                end = j + next.len_utf8();
                iter.next();
            } else {
                break;
            }
        }
        let boundary = match iter.peek() {
            Some(&(_, next)) => next.is_whitespace(),
            None => true,
        };
        if boundary {
            let sentence = paragraph[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    // trailing fragment without terminal punctuation still narrates
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
