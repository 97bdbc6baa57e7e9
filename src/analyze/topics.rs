// src/analyze/topics.rs
//! Demand topics (price sensitivity, feature request, ...) with the words
//! found around each hit.

use super::text::{clean_word, keyword_regex, sentence_span};
use crate::model::{clamp01, Topic};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Words kept on each side of a hit.
const WINDOW: usize = 10;

const TOPICS: &[(&str, &[&str])] = &[
    (
        "Price Sensitivity",
        &["cost", "price", "expensive", "cheap", "worth", "value", "money", "budget", "affordable"],
    ),
    (
        "Feature Request",
        &["need", "want", "wish", "should have", "missing", "add", "implement", "feature"],
    ),
    (
        "Alternative Search",
        &["alternative", "instead", "similar", "like", "other than", "replacement", "switch from"],
    ),
    (
        "Quality Concern",
        &["quality", "reliable", "stable", "buggy", "issue", "problem", "broken"],
    ),
    (
        "User Experience",
        &["interface", "ui", "ux", "easy", "difficult", "intuitive", "confusing", "simple"],
    ),
];

static COMPILED: Lazy<Vec<(&'static str, &'static [&'static str], Vec<Regex>)>> = Lazy::new(|| {
    TOPICS
        .iter()
        .map(|&(name, pats)| (name, pats, pats.iter().map(|p| keyword_regex(p)).collect()))
        .collect()
});

pub fn extract_topics(text: &str) -> Vec<Topic> {
    let mut topics = Vec::new();
    for (name, patterns, regexes) in COMPILED.iter() {
        let mut hits = 0usize;
        let mut keywords = BTreeSet::new();
        for re in regexes {
            for m in re.find_iter(text) {
                hits += 1;
                let (begin, end) = sentence_span(text, m.start(), m.end());
                let words: Vec<&str> = text[begin..end].split_whitespace().collect();
                let at = text[begin..m.start()].split_whitespace().count();
                let lo = at.saturating_sub(WINDOW);
                let hi = (at + WINDOW).min(words.len());
                for w in &words[lo..hi] {
                    let w = clean_word(w);
                    if w.chars().count() > 3 && !patterns.iter().any(|p| *p == w) {
                        keywords.insert(w);
                    }
                }
            }
        }
        if hits > 0 {
            topics.push(Topic {
                name: (*name).to_string(),
                confidence: clamp01(hits as f64 / 3.0),
                keywords,
            });
        }
    }
    topics.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_sensitivity_saturates_at_three_hits() {
        let t = extract_topics("Too expensive. Not worth the money. I have a small budget.");
        assert_eq!(t[0].name, "Price Sensitivity");
        assert_eq!(t[0].confidence, 1.0);
        assert!(t[0].keywords.contains("small"));
        assert!(!t[0].keywords.contains("money"));
    }

    #[test]
    fn sorted_by_confidence() {
        let t = extract_topics("Looking for an alternative. It is expensive and cheap is better, the price matters");
        assert!(t.len() >= 2);
        for pair in t.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn nothing_found_in_unrelated_text() {
        assert!(extract_topics("The weather today is sunny.").is_empty());
    }
}
