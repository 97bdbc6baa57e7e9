// src/analyze/thread.rs
//! Aggregate view over a comment thread.

use super::{extract_features, extract_price_points, lexicon::calculate_sentiment};
use crate::ingest::normalize_text;
use crate::model::{clamp_signed, Feature, FeatureMap, PricePoint, RawItem};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Contexts kept per merged feature.
const MAX_MERGED_CONTEXTS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub comment_count: usize,
    pub max_depth: u32,
    pub price_points: Vec<PricePoint>,
    pub features: FeatureMap,
    /// Score-weighted mean of per-comment sentiment, in [-1, 1].
    pub average_sentiment: f64,
    pub unique_commenters: usize,
    /// Mean of the per-comment controversiality flag.
    pub controversy: f64,
}

fn merge_feature(into: &mut Feature, f: Feature) {
    let total = into.mentions + f.mentions;
    if total > 0 {
        into.sentiment = clamp_signed(
            (into.sentiment * f64::from(into.mentions) + f.sentiment * f64::from(f.mentions))
                / f64::from(total),
        );
    }
    into.mentions = total;
    into.confidence = into.confidence.max(f.confidence);
    for c in f.context {
        if into.context.len() >= MAX_MERGED_CONTEXTS {
            break;
        }
        if !into.context.contains(&c) {
            into.context.push(c);
        }
    }
}

pub fn summarize_thread(comments: &[RawItem]) -> ThreadSummary {
    let mut summary = ThreadSummary {
        comment_count: comments.len(),
        ..Default::default()
    };
    if comments.is_empty() {
        return summary;
    }

    let mut prices: Vec<PricePoint> = Vec::new();
    let mut merged: HashMap<(String, String), Feature> = HashMap::new();
    let mut authors: HashSet<&str> = HashSet::new();
    let mut weighted = 0.0;
    let mut weights = 0.0;
    let mut controversy = 0u64;

    for c in comments {
        summary.max_depth = summary.max_depth.max(c.depth);
        let body = normalize_text(&c.body);
        prices.extend(extract_price_points(&body));

        for (cat, feats) in extract_features(&body) {
            for f in feats {
                match merged.get_mut(&(cat.clone(), f.name.clone())) {
                    Some(existing) => merge_feature(existing, f),
                    None => {
                        merged.insert((cat.clone(), f.name.clone()), f);
                    }
                }
            }
        }

        // Down-voted comments still count once.
        let w = c.score.max(1) as f64;
        weighted += calculate_sentiment(&body) * w;
        weights += w;

        if !c.author.is_empty() && c.author != "[deleted]" {
            authors.insert(c.author.as_str());
        }
        controversy += u64::from(c.controversiality);
    }

    prices.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut seen = HashSet::new();
    prices.retain(|p| seen.insert(((p.value * 100.0).round() as i64, p.currency.clone())));
    summary.price_points = prices;

    let mut keys: Vec<_> = merged.into_iter().collect();
    keys.sort_by(|a, b| a.0.cmp(&b.0));
    for ((cat, _), f) in keys {
        summary.features.entry(cat).or_default().push(f);
    }

    summary.average_sentiment = if weights > 0.0 {
        clamp_signed(weighted / weights)
    } else {
        0.0
    };
    summary.unique_commenters = authors.len();
    summary.controversy = controversy as f64 / comments.len() as f64;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: &str, author: &str, body: &str, score: i64, depth: u32) -> RawItem {
        RawItem {
            id: id.into(),
            author: author.into(),
            body: body.into(),
            score,
            depth,
            parent_id: Some("t3_root".into()),
            ..Default::default()
        }
    }

    #[test]
    fn aggregates_depth_prices_and_authors() {
        let comments = vec![
            comment("a", "ann", "I would pay $10 per month for dark mode", 5, 0),
            comment("b", "bob", "Same, $10 is fair. Dark mode is amazing", 2, 1),
            comment("c", "ann", "Also the price is terrible", 1, 2),
            comment("d", "[deleted]", "removed", 1, 3),
        ];
        let s = summarize_thread(&comments);
        assert_eq!(s.comment_count, 4);
        assert_eq!(s.max_depth, 3);
        assert_eq!(s.unique_commenters, 2);
        assert_eq!(
            s.price_points
                .iter()
                .filter(|p| p.currency == "USD" && p.value == 10.0)
                .count(),
            1
        );
        let dm = s.features["UI/UX"].iter().find(|f| f.name == "dark mode").unwrap();
        assert_eq!(dm.mentions, 2);
        assert!((-1.0..=1.0).contains(&s.average_sentiment));
    }

    #[test]
    fn empty_thread_is_zeroed() {
        let s = summarize_thread(&[]);
        assert_eq!(s, ThreadSummary::default());
    }

    #[test]
    fn entity_encoded_negation_is_decoded_first() {
        let s = summarize_thread(&[comment("a", "ann", "I don&#x27;t like the new editor", 1, 0)]);
        assert!(s.average_sentiment < 0.0);
    }
}
