// src/confidence.rs
//! Five quality factors per signal, their plain mean as overall confidence,
//! community topic relevance and the data-quality score.
//!
//! Every factor is clamped to [0,1] where it is computed. `now` is always
//! passed in so scores are reproducible.

use crate::analyze::{age_days, text::keyword_regex};
use crate::model::{clamp01, Confidence, ConfidenceFactors, DemandSignal, RawItem};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Community → topic weight.
const COMMUNITY_TOPICS: &[(&str, f64)] = &[
    ("technology", 1.0),
    ("software", 1.0),
    ("programming", 0.9),
    ("webdev", 0.9),
    ("computers", 0.8),
    ("techsupport", 0.8),
    ("gadgets", 0.7),
    ("hardware", 0.7),
    ("apps", 0.7),
    ("productivity", 0.6),
    ("startup", 0.6),
    ("entrepreneur", 0.6),
];

const DEMAND_KEYWORDS: &[&str] = &[
    "need", "want", "looking for", "alternative to", "better than", "instead of", "recommend",
    "suggestion", "help find", "similar to", "price", "cost", "worth", "value", "quality",
    "feature",
];

static RE_DEMAND: Lazy<Vec<Regex>> =
    Lazy::new(|| DEMAND_KEYWORDS.iter().map(|k| keyword_regex(k)).collect());
static RE_TITLE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{Lu}.*[.!?]$").unwrap());
static RE_SHOUTING: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]{5,}").unwrap());

const DAY_SECS: f64 = 86_400.0;

/// Same character five or more times in a row ("!!!!!", "sooooo").
fn has_char_spam(s: &str) -> bool {
    let mut prev = None;
    let mut run = 0;
    for c in s.chars() {
        if Some(c) == prev {
            run += 1;
            if run >= 5 {
                return true;
            }
        } else {
            prev = Some(c);
            run = 1;
        }
    }
    false
}

/// Length, formatting, lexical variety and title/body coherence.
pub fn text_quality(title: &str, body: &str) -> f64 {
    let length = (title.chars().count() + body.chars().count()) as f64 / 1000.0;

    let well_formed = RE_TITLE_SHAPE.is_match(title)
        && !has_char_spam(title)
        && !RE_SHOUTING.is_match(title);
    let formatting = if well_formed { 1.0 } else { 0.5 };

    let all = format!("{title} {body}").to_lowercase();
    let unique: std::collections::HashSet<&str> = all.split_whitespace().collect();
    let variety = unique.len() as f64 / 100.0;

    let title_words: std::collections::HashSet<String> =
        title.to_lowercase().split_whitespace().map(str::to_string).collect();
    let shared = body
        .to_lowercase()
        .split_whitespace()
        .filter(|w| title_words.contains(*w))
        .count();
    let coherence = shared as f64 / 5.0;

    clamp01(
        clamp01(length) * 0.3 + formatting * 0.2 + clamp01(variety) * 0.2 + clamp01(coherence) * 0.3,
    )
}

/// Upvote ratio, discussion size, awards and a 180-day recency term.
pub fn community_engagement(item: &RawItem, now: DateTime<Utc>) -> f64 {
    let ratio = clamp01(item.upvote_ratio.unwrap_or(0.5));
    let comments = clamp01(item.num_comments as f64 / 100.0);
    let awards = clamp01(item.awards as f64 / 10.0);
    let recency = if item.created_utc > 0.0 {
        clamp01(1.0 - age_days(item.created_utc, now) / 180.0)
    } else {
        0.0
    };
    clamp01(ratio * 0.3 + comments * 0.3 + awards * 0.2 + recency * 0.2)
}

/// Zero for deleted/anonymous authors.
pub fn author_credibility(item: &RawItem, now: DateTime<Utc>) -> f64 {
    let author = item.author.trim();
    if author.is_empty() || author == "[deleted]" {
        return 0.0;
    }
    let karma = clamp01(item.author_karma.unwrap_or(0) as f64 / 10_000.0);
    let age = item
        .author_created_utc
        .filter(|t| t.is_finite() && *t > 0.0)
        .map(|t| clamp01(age_days(t, now) / 365.0))
        .unwrap_or(0.0);
    let verified = if item.author_verified.unwrap_or(false) {
        1.0
    } else {
        0.0
    };
    clamp01(karma * 0.4 + age * 0.3 + verified * 0.3)
}

/// Demand vocabulary hits, 3 or more → 1.
pub fn keyword_relevance(text: &str) -> f64 {
    let hits: usize = RE_DEMAND.iter().map(|re| re.find_iter(text).count()).sum();
    clamp01(hits as f64 / 3.0)
}

/// Table weight on an exact community hit, 0.8 × weight on a partial one.
fn community_weight(name: &str) -> Option<f64> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    if let Some((_, w)) = COMMUNITY_TOPICS.iter().find(|(t, _)| *t == name) {
        return Some(*w);
    }
    COMMUNITY_TOPICS
        .iter()
        .find(|(t, _)| name.contains(t))
        .map(|(_, w)| w * 0.8)
}

/// Title keywords 0.4, body keywords 0.3, community 0.3 (unknown community: 0.5).
pub fn content_relevance(item: &RawItem) -> f64 {
    let community = community_weight(&item.community).unwrap_or(0.5);
    clamp01(
        keyword_relevance(&item.title) * 0.4
            + keyword_relevance(&item.body) * 0.3
            + clamp01(community) * 0.3,
    )
}

/// Linear decay from 1 to 0 over one year; 0 when the age is unknown.
pub fn temporal_relevance(created_utc: f64, now: DateTime<Utc>) -> f64 {
    if !created_utc.is_finite() || created_utc <= 0.0 {
        return 0.0;
    }
    let days = (now.timestamp() as f64 - created_utc).max(0.0) / DAY_SECS;
    clamp01(1.0 - days / 365.0)
}

/// Topic relevance of the community; falls back to topic words in the text,
/// capped at 0.5.
pub fn topic_relevance(item: &RawItem) -> f64 {
    if let Some(w) = community_weight(&item.community) {
        return clamp01(w);
    }
    let text = format!("{} {}", item.title, item.body).to_lowercase();
    let hits = COMMUNITY_TOPICS
        .iter()
        .filter(|(t, _)| text.contains(t))
        .count();
    (hits as f64 / 3.0).min(0.5)
}

/// Plain mean of the five factors (missing ones count as 0).
pub fn overall_confidence(f: &ConfidenceFactors) -> f64 {
    let vals = [
        f.text_quality,
        f.community_engagement,
        f.author_credibility,
        f.content_relevance,
        f.temporal_relevance,
    ];
    clamp01(vals.iter().map(|v| v.unwrap_or(0.0)).sum::<f64>() / 5.0)
}

fn completeness(s: &DemandSignal) -> f64 {
    let present = [
        !s.id.is_empty(),
        !s.title.is_empty(),
        !s.content.is_empty(),
        !s.url.is_empty(),
        !s.timestamp.is_empty(),
        s.analysis.sentiment.is_finite(),
        !s.context.thread.id.is_empty(),
        !s.context.author.id.is_empty(),
        !s.context.community.name.is_empty(),
    ];
    present.iter().filter(|p| **p).count() as f64 / present.len() as f64
}

fn consistency(s: &DemandSignal) -> f64 {
    let unit = |v: Option<f64>| v.is_some_and(|x| (0.0..=1.0).contains(&x));
    let f = &s.confidence.factors;
    let checks = [
        (0.0..=1.0).contains(&s.confidence.overall),
        (-1.0..=1.0).contains(&s.analysis.sentiment),
        DateTime::parse_from_rfc3339(&s.timestamp).is_ok(),
        unit(f.text_quality),
        unit(f.community_engagement),
        unit(f.author_credibility),
        unit(f.content_relevance),
        unit(f.temporal_relevance),
    ];
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}

/// 0.4 · overall + 0.3 · completeness + 0.3 · consistency.
pub fn data_quality_score(s: &DemandSignal) -> f64 {
    clamp01(s.confidence.overall * 0.4 + completeness(s) * 0.3 + consistency(s) * 0.3)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Factors and overall for one item. Text quality is judged on the
    /// extractor's normalised title/content.
    pub fn score(&self, item: &RawItem, signal: &DemandSignal, now: DateTime<Utc>) -> Confidence {
        let factors = ConfidenceFactors::new(
            text_quality(&signal.title, &signal.content),
            community_engagement(item, now),
            author_credibility(item, now),
            content_relevance(item),
            temporal_relevance(item.created_utc, now),
        );
        Confidence {
            overall: overall_confidence(&factors),
            factors,
        }
    }

    /// Fill confidence, community topic relevance and data quality in place.
    pub fn apply(&self, signal: &mut DemandSignal, item: &RawItem, now: DateTime<Utc>) {
        signal.confidence = self.score(item, signal, now);
        signal.context.community.topic_relevance = topic_relevance(item);
        signal.metadata.data_quality_score = data_quality_score(signal);
    }
}
