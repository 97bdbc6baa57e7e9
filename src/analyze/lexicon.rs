// src/analyze/lexicon.rs
//! Seven-tier sentiment lexicon and the document-level scorer.
//!
//! Two-word phrases ("holy grail", "not worth") are matched before single
//! words. A negator directly in front of a hit flips that hit's sign. The raw
//! sum is squashed with `tanh(sum / 5)` so long posts saturate instead of
//! growing without bound.

use super::text::tokenize;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    StrongPositive,
    Positive,
    WeakPositive,
    Neutral,
    WeakNegative,
    Negative,
    StrongNegative,
}

impl Tier {
    pub fn weight(self) -> i32 {
        match self {
            Tier::StrongPositive => 3,
            Tier::Positive => 2,
            Tier::WeakPositive => 1,
            Tier::Neutral => 0,
            Tier::WeakNegative => -1,
            Tier::Negative => -2,
            Tier::StrongNegative => -3,
        }
    }
}

#[derive(Deserialize)]
struct RawTiers {
    strong_positive: Vec<String>,
    positive: Vec<String>,
    weak_positive: Vec<String>,
    neutral: Vec<String>,
    weak_negative: Vec<String>,
    negative: Vec<String>,
    strong_negative: Vec<String>,
}

/// Entry key is the lower-cased word or the two words joined by one space.
static LEXICON: Lazy<HashMap<String, Tier>> = Lazy::new(|| {
    let raw = include_str!("../../demand_lexicon.json");
    let tiers: RawTiers = serde_json::from_str(raw).expect("valid demand lexicon");
    let mut map = HashMap::new();
    for (tier, words) in [
        (Tier::StrongPositive, tiers.strong_positive),
        (Tier::Positive, tiers.positive),
        (Tier::WeakPositive, tiers.weak_positive),
        (Tier::Neutral, tiers.neutral),
        (Tier::WeakNegative, tiers.weak_negative),
        (Tier::Negative, tiers.negative),
        (Tier::StrongNegative, tiers.strong_negative),
    ] {
        for w in words {
            map.insert(w.to_lowercase(), tier);
        }
    }
    map
});

/// Lexicon tier of a single token or a space-joined phrase.
pub fn tier_of(term: &str) -> Option<Tier> {
    LEXICON.get(term).copied()
}

pub fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
            | "hardly"
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Weighted lexicon sum.
    pub fn score_text(&self, text: &str) -> i32 {
        let tokens = tokenize(text);
        let mut score = 0;
        let mut i = 0;

        while i < tokens.len() {
            let (tier, width) = match tokens.get(i + 1) {
                Some(next) => match tier_of(&format!("{} {}", tokens[i], next)) {
                    Some(t) => (Some(t), 2),
                    None => (tier_of(&tokens[i]), 1),
                },
                None => (tier_of(&tokens[i]), 1),
            };

            if let Some(t) = tier {
                let negated = i > 0 && is_negator(&tokens[i - 1]);
                score += if negated { -t.weight() } else { t.weight() };
            }
            i += width;
        }

        score
    }

    /// Document sentiment in [-1, 1].
    pub fn sentiment(&self, text: &str) -> f64 {
        let sum = self.score_text(text);
        (f64::from(sum) / 5.0).tanh()
    }
}

/// Shorthand for `SentimentAnalyzer::new().sentiment(text)`.
pub fn calculate_sentiment(text: &str) -> f64 {
    SentimentAnalyzer::new().sentiment(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_follows_the_lexicon() {
        assert!(calculate_sentiment("amazing and excellent") > 0.0);
        assert!(calculate_sentiment("terrible and awful") < 0.0);
        assert_eq!(calculate_sentiment("the cat sat on the mat"), 0.0);
    }

    #[test]
    fn negation_inverts_the_hit() {
        let a = SentimentAnalyzer::new();
        let plain = a.score_text("it is good");
        let negated = a.score_text("it is not good");
        assert_eq!(plain, 2);
        assert_eq!(negated, -plain);
    }

    #[test]
    fn phrases_win_over_single_words() {
        let a = SentimentAnalyzer::new();
        // "not worth" is one negative phrase, not a negated "worth".
        assert_eq!(a.score_text("honestly not worth it"), -2);
        assert_eq!(a.score_text("this is the holy grail"), 3);
        assert_eq!(a.score_text("i wouldn't recommend it"), -2);
    }

    #[test]
    fn output_saturates_on_long_text() {
        let long = "amazing ".repeat(500);
        let s = calculate_sentiment(&long);
        assert!(s > 0.99 && s <= 1.0);
    }
}
