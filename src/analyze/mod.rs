// src/analyze/mod.rs
//! Signal extraction: raw post/comment → `DemandSignal` with `analysis` and
//! base `context` filled. Confidence is added later by `confidence`.

pub mod features;
pub mod lexicon;
pub mod price;
pub mod text;
pub mod thread;
pub mod topics;

pub use features::extract_features;
pub use lexicon::{calculate_sentiment, SentimentAnalyzer};
pub use price::extract_price_points;
pub use thread::{summarize_thread, ThreadSummary};
pub use topics::extract_topics;

use crate::ingest::{normalize_text, permalink_url};
use crate::model::{
    Analysis, AuthorContext, CommunityContext, DemandSignal, RawItem, SignalContext,
    SignalMetadata, ThreadContext, EXTRACTION_VERSION,
};
use chrono::{DateTime, Utc};
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Default)]
pub struct SignalExtractor {
    sentiment: SentimentAnalyzer,
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prices, features, topics and sentiment of one text. Pure.
    pub fn analyze_text(&self, text: &str) -> Analysis {
        Analysis {
            sentiment: self.sentiment.sentiment(text),
            topics: extract_topics(text),
            price_points: extract_price_points(text),
            features: extract_features(text),
        }
    }

    /// Never fails: a panic while analysing is logged and replaced with an
    /// empty analysis so the rest of the batch goes on.
    pub fn extract_at(&self, item: &RawItem, now: DateTime<Utc>) -> DemandSignal {
        let title = normalize_text(&item.title);
        let content = normalize_text(&item.body);
        let full = normalize_text(&item.full_text());

        let analysis = panic::catch_unwind(AssertUnwindSafe(|| self.analyze_text(&full)))
            .unwrap_or_else(|_| {
                tracing::warn!(target: "analyze", id = %item.id, "extraction panicked; empty analysis");
                Analysis::default()
            });

        DemandSignal {
            id: item.id.trim().to_string(),
            title,
            content,
            url: permalink_url(&item.permalink),
            timestamp: epoch_to_rfc3339(item.created_utc).unwrap_or_default(),
            confidence: Default::default(),
            context: base_context(item, now),
            analysis,
            metadata: SignalMetadata {
                processing_time: 0,
                extraction_version: EXTRACTION_VERSION.to_string(),
                data_quality_score: 0.0,
            },
        }
    }

    pub fn extract(&self, item: &RawItem) -> DemandSignal {
        self.extract_at(item, Utc::now())
    }
}

/// `None` for zero, negative or non-finite epochs (treated as missing).
pub fn epoch_to_rfc3339(secs: f64) -> Option<String> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0).map(|d| d.to_rfc3339())
}

/// Age in days between an epoch (seconds) and `now`; never negative.
pub fn age_days(epoch_secs: f64, now: DateTime<Utc>) -> f64 {
    let now_secs = now.timestamp() as f64;
    ((now_secs - epoch_secs) / 86_400.0).max(0.0)
}

fn base_context(item: &RawItem, now: DateTime<Utc>) -> SignalContext {
    SignalContext {
        thread: ThreadContext {
            id: item.id.clone(),
            parent_id: item.parent_id.clone(),
            depth: item.depth,
            is_original_post: item.is_original_post(),
        },
        author: AuthorContext {
            id: item.author.clone(),
            karma_score: item.author_karma,
            account_age_days: item
                .author_created_utc
                .filter(|t| t.is_finite() && *t > 0.0)
                .map(|t| age_days(t, now)),
        },
        community: CommunityContext {
            name: item.community.clone(),
            size: item.community_size,
            topic_relevance: 0.0,
        },
    }
}
