// src/model.rs
//! Shared data model: raw payloads, demand signals, candidates, matches.
//!
//! `DemandSignal` is the outbound artifact; its JSON shape keeps the four field
//! groups `confidence`, `context`, `analysis` and `metadata` (camelCase keys).
//! Every numeric score is clamped where it is computed, not here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const EXTRACTION_VERSION: &str = "1.0.0";

/// One post or comment as delivered by the community read API.
/// Never mutated after decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "selftext", alias = "body")]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default, rename = "total_awards_received")]
    pub awards: u64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_karma: Option<i64>,
    /// Epoch seconds of account creation.
    #[serde(default)]
    pub author_created_utc: Option<f64>,
    #[serde(default)]
    pub author_verified: Option<bool>,
    /// Epoch seconds.
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default, rename = "subreddit")]
    pub community: String,
    #[serde(default, rename = "subreddit_subscribers")]
    pub community_size: Option<u64>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub controversiality: u32,
}

impl RawItem {
    /// Title and body joined with a single space (the text every extractor sees).
    pub fn full_text(&self) -> String {
        match (self.title.trim().is_empty(), self.body.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.title.clone(),
            (true, false) => self.body.clone(),
            (false, false) => format!("{} {}", self.title, self.body),
        }
    }

    pub fn is_original_post(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub value: f64,
    /// ISO-ish currency code, e.g. "USD".
    pub currency: String,
    pub confidence: f64,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub sentiment: f64,
    pub confidence: f64,
    pub mentions: u32,
    pub context: Vec<String>,
}

/// Category label → features seen under it. BTreeMap keeps JSON output stable.
pub type FeatureMap = BTreeMap<String, Vec<Feature>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub confidence: f64,
    pub keywords: BTreeSet<String>,
}

/// The five quality factors. Fields are optional so a signal decoded from
/// elsewhere can be missing one; the scorer always fills all five.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceFactors {
    #[serde(default)]
    pub text_quality: Option<f64>,
    #[serde(default)]
    pub community_engagement: Option<f64>,
    #[serde(default)]
    pub author_credibility: Option<f64>,
    #[serde(default)]
    pub content_relevance: Option<f64>,
    #[serde(default)]
    pub temporal_relevance: Option<f64>,
}

impl ConfidenceFactors {
    pub fn new(
        text_quality: f64,
        community_engagement: f64,
        author_credibility: f64,
        content_relevance: f64,
        temporal_relevance: f64,
    ) -> Self {
        Self {
            text_quality: Some(text_quality),
            community_engagement: Some(community_engagement),
            author_credibility: Some(author_credibility),
            content_relevance: Some(content_relevance),
            temporal_relevance: Some(temporal_relevance),
        }
    }

    /// All five values in a fixed order, or `None` if any is missing.
    pub fn values(&self) -> Option<[f64; 5]> {
        Some([
            self.text_quality?,
            self.community_engagement?,
            self.author_credibility?,
            self.content_relevance?,
            self.temporal_relevance?,
        ])
    }

    /// Factors under their wire names, in the same fixed order.
    pub fn named(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("textQuality", self.text_quality),
            ("communityEngagement", self.community_engagement),
            ("authorCredibility", self.author_credibility),
            ("contentRelevance", self.content_relevance),
            ("temporalRelevance", self.temporal_relevance),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub overall: f64,
    pub factors: ConfidenceFactors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadContext {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub depth: u32,
    pub is_original_post: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorContext {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub karma_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_age_days: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub topic_relevance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    pub thread: ThreadContext,
    pub author: AuthorContext,
    pub community: CommunityContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub sentiment: f64,
    pub topics: Vec<Topic>,
    pub price_points: Vec<PricePoint>,
    pub features: FeatureMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMetadata {
    /// Milliseconds spent extracting and scoring this signal.
    pub processing_time: u64,
    pub extraction_version: String,
    pub data_quality_score: f64,
}

/// Canonical output unit of the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandSignal {
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    /// RFC 3339.
    pub timestamp: String,
    pub confidence: Confidence,
    pub context: SignalContext,
    pub analysis: Analysis,
    pub metadata: SignalMetadata,
}

impl DemandSignal {
    /// Category labels this signal speaks about: feature categories, topic
    /// names and the community name, all lower-cased.
    pub fn category_labels(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .analysis
            .features
            .keys()
            .map(|k| k.to_lowercase())
            .collect();
        out.extend(self.analysis.topics.iter().map(|t| t.name.to_lowercase()));
        if !self.context.community.name.is_empty() {
            out.insert(self.context.community.name.to_lowercase());
        }
        out
    }

    /// [min, max] of the price points quoted in `currency`.
    pub fn price_range(&self, currency: &str) -> Option<PriceRange> {
        let mut it = self
            .analysis
            .price_points
            .iter()
            .filter(|p| p.currency.eq_ignore_ascii_case(currency))
            .map(|p| p.value);
        let first = it.next()?;
        let (lo, hi) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(PriceRange::new(lo, hi))
    }
}

/// Closed price interval; constructor orders the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn len(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains_range(&self, other: &PriceRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Length of the intersection (0 when disjoint).
    pub fn overlap(&self, other: &PriceRange) -> f64 {
        (self.max.min(other.max) - self.min.max(other.min)).max(0.0)
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// An offering that signals are matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            price_range: None,
            currency: default_currency(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = d.into();
        self
    }

    pub fn category(mut self, c: impl Into<String>) -> Self {
        self.category = c.into();
        self
    }

    pub fn priced(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange::new(min, max));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

fn default_min_match_score() -> f64 {
    0.5
}

fn default_max_results() -> usize {
    100
}

/// Transient request for one matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub candidates: Vec<Candidate>,
    pub signals: Vec<DemandSignal>,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub category_match: bool,
    pub price_match: bool,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub candidate_id: String,
    pub signal_id: String,
    pub match_score: f64,
    pub match_reasons: Vec<String>,
    pub metadata: MatchMetadata,
}

/// Clamp to [0.0, 1.0]; NaN collapses to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Clamp to [-1.0, 1.0]; NaN collapses to 0.
pub fn clamp_signed(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_item_decodes_listing_fields() {
        let v = json!({
            "id": "abc",
            "title": "Need a tool",
            "selftext": "Looking for something cheap",
            "score": 42,
            "num_comments": 7,
            "total_awards_received": 1,
            "upvote_ratio": 0.93,
            "author": "someone",
            "created_utc": 1_700_000_000.0,
            "subreddit": "software",
            "subreddit_subscribers": 1000,
            "permalink": "/r/software/comments/abc/need_a_tool/"
        });
        let item: RawItem = serde_json::from_value(v).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.body, "Looking for something cheap");
        assert_eq!(item.awards, 1);
        assert_eq!(item.community, "software");
        assert!(item.is_original_post());
        assert_eq!(item.full_text(), "Need a tool Looking for something cheap");
    }

    #[test]
    fn signal_json_keeps_field_groups() {
        let s = DemandSignal {
            id: "x".into(),
            confidence: Confidence {
                overall: 0.5,
                factors: ConfidenceFactors::new(0.1, 0.2, 0.3, 0.4, 0.5),
            },
            ..Default::default()
        };
        let v = serde_json::to_value(&s).unwrap();
        for key in ["confidence", "context", "analysis", "metadata"] {
            assert!(v.get(key).is_some(), "missing group {key}");
        }
        assert_eq!(v["confidence"]["factors"]["textQuality"], json!(0.1));
        assert!(v["analysis"].get("pricePoints").is_some());
        assert!(v["metadata"].get("dataQualityScore").is_some());
    }

    #[test]
    fn price_range_overlap_and_containment() {
        let a = PriceRange::new(10.0, 20.0);
        let b = PriceRange::new(15.0, 30.0);
        assert!((a.overlap(&b) - 5.0).abs() < 1e-9);
        assert!(PriceRange::new(0.0, 100.0).contains_range(&a));
        assert_eq!(PriceRange::new(5.0, 1.0).min, 1.0);
        assert_eq!(a.overlap(&PriceRange::new(30.0, 40.0)), 0.0);
    }

    #[test]
    fn missing_factor_is_reported() {
        let mut f = ConfidenceFactors::new(0.1, 0.2, 0.3, 0.4, 0.5);
        assert!(f.values().is_some());
        f.author_credibility = None;
        assert!(f.values().is_none());
        assert_eq!(f.named()[2], ("authorCredibility", None));
    }
}
