// src/analyze/features.rs
//! Feature mentions grouped under fixed product categories.

use super::lexicon::{tier_of, Tier};
use super::text::{enclosing_sentence, keyword_regex, tokenize};
use crate::model::{clamp01, clamp_signed, Feature, FeatureMap};
use once_cell::sync::Lazy;
use regex::Regex;

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "UI/UX",
        &[
            "interface", "design", "layout", "usability", "responsive", "accessibility",
            "navigation", "theme", "dark mode", "light mode",
        ],
    ),
    (
        "Performance",
        &[
            "speed", "fast", "slow", "performance", "efficient", "memory", "cpu", "resource",
            "optimization", "loading",
        ],
    ),
    (
        "Security",
        &[
            "security", "privacy", "encryption", "authentication", "password", "protection",
            "vulnerability", "safe", "breach",
        ],
    ),
    (
        "Integration",
        &[
            "integration", "api", "plugin", "extension", "addon", "compatibility", "sync",
            "connection", "import", "export",
        ],
    ),
    (
        "Pricing",
        &[
            "price", "cost", "subscription", "free", "premium", "trial", "plan", "tier",
            "payment", "discount",
        ],
    ),
];

struct CompiledCategory {
    label: &'static str,
    keywords: Vec<(&'static str, Regex)>,
}

static COMPILED: Lazy<Vec<CompiledCategory>> = Lazy::new(|| {
    CATEGORIES
        .iter()
        .map(|&(label, kws)| CompiledCategory {
            label,
            keywords: kws.iter().map(|k| (*k, keyword_regex(k))).collect(),
        })
        .collect()
});

/// Lexicon-weighted sentiment over the contexts a feature was mentioned in.
/// Strong words count ±2 and add 0.5 to the context weight, plain ones ±1
/// and 0.3; weaker tiers are ignored here.
pub fn feature_sentiment(contexts: &[String]) -> f64 {
    let mut total = 0.0;
    let mut weights = 0.0;
    for ctx in contexts {
        let mut s = 0.0;
        let mut w = 1.0;
        for tok in tokenize(ctx) {
            match tier_of(&tok) {
                Some(Tier::StrongPositive) => {
                    s += 2.0;
                    w += 0.5;
                }
                Some(Tier::Positive) => {
                    s += 1.0;
                    w += 0.3;
                }
                Some(Tier::StrongNegative) => {
                    s -= 2.0;
                    w += 0.5;
                }
                Some(Tier::Negative) => {
                    s -= 1.0;
                    w += 0.3;
                }
                _ => {}
            }
        }
        total += s * w;
        weights += w;
    }
    if weights > 0.0 {
        clamp_signed(total / weights)
    } else {
        0.0
    }
}

pub fn extract_features(text: &str) -> FeatureMap {
    let mut out = FeatureMap::new();
    for cat in COMPILED.iter() {
        let mut found = Vec::new();
        for (name, re) in &cat.keywords {
            let mut mentions = 0u32;
            let mut contexts: Vec<String> = Vec::new();
            for m in re.find_iter(text) {
                mentions += 1;
                let ctx = enclosing_sentence(text, m.start(), m.end());
                if !ctx.is_empty() && !contexts.iter().any(|c| c == ctx) {
                    contexts.push(ctx.to_string());
                }
            }
            if mentions == 0 {
                continue;
            }
            let sentiment = feature_sentiment(&contexts);
            let confidence = clamp01(
                f64::from(mentions) * 0.3 + contexts.len() as f64 * 0.4 + sentiment.abs() * 0.3,
            );
            found.push(Feature {
                name: (*name).to_string(),
                sentiment,
                confidence,
                mentions,
                context: contexts,
            });
        }
        if !found.is_empty() {
            out.insert(cat.label.to_string(), found);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_category() {
        let f = extract_features("The interface is amazing. The API is slow and the price is bad.");
        let ui = &f["UI/UX"];
        assert_eq!(ui[0].name, "interface");
        assert!(ui[0].sentiment > 0.0);
        assert!(f.contains_key("Integration"));
        assert!(f.contains_key("Performance"));
        assert!(f["Pricing"][0].sentiment < 0.0);
        assert!(!f.contains_key("Security"));
    }

    #[test]
    fn mentions_and_distinct_contexts() {
        let f = extract_features("Dark mode please. I really want dark mode. Dark mode!");
        let dm = f["UI/UX"].iter().find(|x| x.name == "dark mode").unwrap();
        assert_eq!(dm.mentions, 3);
        assert_eq!(dm.context.len(), 3);
        assert!(dm.confidence <= 1.0 && dm.confidence > 0.0);
    }

    #[test]
    fn feature_sentiment_is_bounded() {
        let ctx = vec!["amazing excellent perfect outstanding".to_string()];
        let s = feature_sentiment(&ctx);
        assert!(s > 0.0 && s <= 1.0);
        assert_eq!(feature_sentiment(&[]), 0.0);
    }
}
