// src/analyze/text.rs
//! Text primitives shared by the extractors: tokenizer, sentence boundaries,
//! word-boundary keyword patterns.

use regex::Regex;

/// Lower-cased word tokens. Apostrophes inside a word are kept ("wouldn't").
pub fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|t| t.replace('\u{2019}', "'"))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// `.`, `!` or `?` followed by whitespace/end, or a newline.
fn is_boundary(text: &str, idx: usize, c: char) -> bool {
    match c {
        '\n' => true,
        '.' | '!' | '?' => text[idx + c.len_utf8()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace),
        _ => false,
    }
}

/// Byte range of the sentence enclosing `start..end`, trimmed.
/// A decimal point ("49.99") is not a sentence boundary.
pub fn sentence_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let begin = text[..start]
        .char_indices()
        .rev()
        .find(|&(i, c)| is_boundary(text, i, c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let finish = text[end..]
        .char_indices()
        .find(|&(i, c)| is_boundary(text, end + i, c))
        .map(|(i, c)| end + i + c.len_utf8())
        .unwrap_or(text.len());
    let raw = &text[begin..finish];
    let lead = raw.len() - raw.trim_start().len();
    let trail = raw.len() - raw.trim_end().len();
    (begin + lead, (finish - trail).max(begin + lead))
}

pub fn enclosing_sentence(text: &str, start: usize, end: usize) -> &str {
    let (b, e) = sentence_span(text, start, end);
    &text[b..e]
}

/// Sentences in order, empty ones skipped.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut begin = 0;
    for (i, c) in text.char_indices() {
        if is_boundary(text, i, c) {
            let s = text[begin..i + c.len_utf8()].trim();
            if !s.is_empty() {
                out.push(s);
            }
            begin = i + c.len_utf8();
        }
    }
    let tail = text[begin..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Case-insensitive whole-word pattern for a keyword or phrase.
/// Inner spaces match any run of whitespace.
pub fn keyword_regex(keyword: &str) -> Regex {
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{body}\b")).expect("escaped keyword is a valid pattern")
}

/// Strip surrounding punctuation from a whitespace-separated word.
pub fn clean_word(w: &str) -> String {
    w.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
