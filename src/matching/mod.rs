// src/matching/mod.rs
//! Candidate × signal scoring.
//!
//! score = (0.45·category + 0.30·price alignment + 0.25·similarity) × signal
//! confidence, clamped to [0,1]. A low-confidence signal can never produce a
//! high-confidence match.

pub mod distribute;
pub mod pool;

pub use distribute::{distribute, run_match_request, Distribution, MatchDistributor};
pub use pool::{TaskHandle, WorkerPool};

use crate::analyze::text::tokenize;
use crate::model::{clamp01, Candidate, DemandSignal, Match, MatchMetadata};
use std::collections::{BTreeSet, HashSet};

pub const CATEGORY_WEIGHT: f64 = 0.45;
pub const PRICE_WEIGHT: f64 = 0.30;
pub const SIMILARITY_WEIGHT: f64 = 0.25;

pub const DEFAULT_MIN_MATCH_SCORE: f64 = 0.5;
pub const DEFAULT_MAX_RESULTS: usize = 100;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "you", "your", "but",
    "not", "have", "has", "all", "any", "can", "its", "our", "out", "too", "very", "just",
];

/// Scores one pair; `None` when the pair is not worth reporting.
pub trait PairScorer: Send + Sync {
    fn score(&self, candidate: &Candidate, signal: &SignalProfile<'_>) -> Option<Match>;
}

/// A signal with its category labels and terms worked out once, so scoring it
/// against many candidates does not re-tokenize its text.
#[derive(Debug, Clone)]
pub struct SignalProfile<'a> {
    pub signal: &'a DemandSignal,
    labels: BTreeSet<String>,
    terms: HashSet<String>,
}

impl<'a> SignalProfile<'a> {
    pub fn new(signal: &'a DemandSignal) -> Self {
        Self {
            signal,
            labels: signal.category_labels(),
            terms: signal_terms(signal),
        }
    }
}

/// Lower-cased words longer than two chars, stop-words removed.
pub fn terms(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.iter().any(|s| *s == t.as_str()))
        .collect()
}

fn candidate_terms(c: &Candidate) -> HashSet<String> {
    let mut out = terms(&c.name);
    out.extend(terms(&c.description));
    for t in &c.tags {
        out.extend(terms(t));
    }
    out
}

fn signal_terms(s: &DemandSignal) -> HashSet<String> {
    let mut out = terms(&s.title);
    out.extend(terms(&s.content));
    for topic in &s.analysis.topics {
        for k in &topic.keywords {
            out.extend(terms(k));
        }
    }
    for feats in s.analysis.features.values() {
        for f in feats {
            out.extend(terms(&f.name));
        }
    }
    out
}

/// Share of the candidate's descriptive terms the signal mentions.
pub fn similarity(candidate: &Candidate, signal: &SignalProfile<'_>) -> f64 {
    let ct = candidate_terms(candidate);
    if ct.is_empty() {
        return 0.0;
    }
    clamp01(ct.intersection(&signal.terms).count() as f64 / ct.len() as f64)
}

pub fn category_match(candidate: &Candidate, signal: &SignalProfile<'_>) -> bool {
    let cat = candidate.category.trim().to_lowercase();
    !cat.is_empty() && signal.labels.contains(&cat)
}

/// (alignment in [0,1], full containment). Alignment is the share of the
/// signal's quoted price range (candidate currency only) that lies inside the
/// candidate's range; a single quoted price counts 1 when inside.
pub fn price_alignment(candidate: &Candidate, signal: &DemandSignal) -> (f64, bool) {
    let Some(range) = candidate.price_range else {
        return (0.0, false);
    };
    let Some(quoted) = signal.price_range(&candidate.currency) else {
        return (0.0, false);
    };
    let contained = range.contains_range(&quoted);
    let alignment = if quoted.len() <= f64::EPSILON {
        if contained {
            1.0
        } else {
            0.0
        }
    } else {
        range.overlap(&quoted) / quoted.len()
    };
    (clamp01(alignment), contained)
}

/// Full breakdown for a pair, no threshold applied.
pub fn score_pair(candidate: &Candidate, signal: &DemandSignal) -> Match {
    score_profiled(candidate, &SignalProfile::new(signal))
}

fn score_profiled(candidate: &Candidate, profile: &SignalProfile<'_>) -> Match {
    let signal = profile.signal;
    let category = category_match(candidate, profile);
    let (alignment, contained) = price_alignment(candidate, signal);
    let sim = similarity(candidate, profile);

    let raw = if category { CATEGORY_WEIGHT } else { 0.0 }
        + PRICE_WEIGHT * alignment
        + SIMILARITY_WEIGHT * sim;
    let score = clamp01(raw * clamp01(signal.confidence.overall));

    let mut reasons = Vec::new();
    if category {
        reasons.push("Category match".to_string());
    }
    if contained {
        reasons.push("Price range match".to_string());
    } else if alignment > 0.0 {
        reasons.push("Partial price overlap".to_string());
    }
    if sim > 0.0 {
        reasons.push(format!("Description similarity ({:.0}%)", sim * 100.0));
    }

    Match {
        candidate_id: candidate.id.clone(),
        signal_id: signal.id.clone(),
        match_score: score,
        match_reasons: reasons,
        metadata: MatchMetadata {
            category_match: category,
            price_match: contained,
            similarity: sim,
        },
    }
}

/// Weighted scorer with a minimum score.
#[derive(Debug, Clone, Copy)]
pub struct MatchScorer {
    pub min_match_score: f64,
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self {
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
        }
    }
}

impl MatchScorer {
    pub fn new(min_match_score: f64) -> Self {
        Self {
            min_match_score: clamp01(min_match_score),
        }
    }
}

impl PairScorer for MatchScorer {
    fn score(&self, candidate: &Candidate, signal: &SignalProfile<'_>) -> Option<Match> {
        let m = score_profiled(candidate, signal);
        (m.match_score >= self.min_match_score && m.match_score > 0.0).then_some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, Feature, PricePoint};

    fn signal(overall: f64, prices: &[f64]) -> DemandSignal {
        let mut s = DemandSignal {
            id: "s".into(),
            title: "Need a markdown note app with sync".into(),
            content: "Looking for a markdown editor".into(),
            confidence: Confidence {
                overall,
                ..Default::default()
            },
            ..Default::default()
        };
        s.analysis.price_points = prices
            .iter()
            .map(|v| PricePoint {
                value: *v,
                currency: "USD".into(),
                confidence: 1.0,
                context: String::new(),
            })
            .collect();
        s.analysis.features.insert(
            "Integration".into(),
            vec![Feature {
                name: "sync".into(),
                sentiment: 0.0,
                confidence: 0.7,
                mentions: 1,
                context: vec![],
            }],
        );
        s
    }

    #[test]
    fn full_match_scales_with_confidence() {
        let c = Candidate::new("c1", "Markdown Notes")
            .category("integration")
            .priced(10.0, 50.0)
            .tags(["sync", "editor"]);
        let s = signal(1.0, &[20.0, 30.0]);
        let m = score_pair(&c, &s);
        assert!(m.metadata.category_match);
        assert!(m.metadata.price_match);
        assert!(m.match_score > 0.8 && m.match_score <= 1.0);
        assert_eq!(m.match_reasons[0], "Category match");
        assert_eq!(m.match_reasons[1], "Price range match");

        let low = score_pair(&c, &signal(0.2, &[20.0, 30.0]));
        assert!(low.match_score <= 0.2);
    }

    #[test]
    fn price_alignment_is_monotonic_in_overlap() {
        let s = signal(1.0, &[20.0, 60.0]);
        let mut last = -1.0;
        for hi in [10.0, 25.0, 40.0, 55.0, 60.0, 80.0] {
            let c = Candidate::new("c", "x").priced(0.0, hi);
            let (a, _) = price_alignment(&c, &s);
            assert!(a >= last, "alignment dropped at hi={hi}");
            last = a;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn other_currency_prices_are_ignored() {
        let mut c = Candidate::new("c", "x").priced(0.0, 100.0);
        c.currency = "EUR".into();
        assert_eq!(price_alignment(&c, &signal(1.0, &[20.0])), (0.0, false));
    }

    #[test]
    fn single_price_inside_range_counts_fully() {
        let c = Candidate::new("c", "x").priced(10.0, 30.0);
        assert_eq!(price_alignment(&c, &signal(1.0, &[20.0])), (1.0, true));
        assert_eq!(price_alignment(&c, &signal(1.0, &[40.0])), (0.0, false));
    }

    #[test]
    fn scorer_applies_threshold() {
        let c = Candidate::new("c", "Unrelated Gadget");
        let s = signal(1.0, &[]);
        let p = SignalProfile::new(&s);
        assert!(MatchScorer::new(0.5).score(&c, &p).is_none());
        let c = Candidate::new("c", "Markdown editor").category("Integration");
        assert!(MatchScorer::new(0.3).score(&c, &p).is_some());
    }

    #[test]
    fn similarity_uses_candidate_terms() {
        let c = Candidate::new("c", "Markdown editor").description("with the sync");
        let s = signal(1.0, &[]);
        let p = SignalProfile::new(&s);
        assert_eq!(similarity(&c, &p), 1.0);
        assert_eq!(similarity(&Candidate::new("c", "a b"), &p), 0.0);
    }

    #[test]
    fn one_profile_serves_many_candidates() {
        let s = signal(0.9, &[15.0]);
        let p = SignalProfile::new(&s);
        let candidates = [
            Candidate::new("a", "Markdown Notes").category("Integration").priced(10.0, 20.0),
            Candidate::new("b", "Sync editor").category("Security"),
            Candidate::new("c", "Unrelated Gadget"),
        ];
        for c in &candidates {
            assert_eq!(score_profiled(c, &p), score_pair(c, &s));
        }
    }
}
