// src/pipeline.rs
//! Ingestion run: fetch through the gateway, extract, score, validate and
//! drop near-duplicates. One bad item never stops the batch.

use crate::analyze::{summarize_thread, SignalExtractor, ThreadSummary};
use crate::config::IngestSection;
use crate::confidence::ConfidenceScorer;
use crate::error::{FetchError, Rejection};
use crate::gateway::{Gateway, GatewayMetrics};
use crate::ingest::{anon_id, comments_url, parse_listing, parse_thread, search_url};
use crate::metrics::ensure_metrics_described;
use crate::model::{DemandSignal, RawItem};
use crate::validate;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

/// Characters of content compared when looking for repeats.
const DUPLICATE_PREFIX_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub fetched: usize,
    pub extracted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub valid: usize,
    pub fetch_errors: usize,
}

impl PipelineStats {
    fn absorb(&mut self, other: &PipelineStats) {
        self.fetched += other.fetched;
        self.extracted += other.extracted;
        self.rejected += other.rejected;
        self.duplicates += other.duplicates;
        self.valid += other.valid;
        self.fetch_errors += other.fetch_errors;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBatch {
    pub signals: Vec<DemandSignal>,
    pub stats: PipelineStats,
    pub gateway: GatewayMetrics,
    /// Comment-thread summaries keyed by post id.
    pub threads: BTreeMap<String, ThreadSummary>,
}

/// Hooks fired while a batch is processed. All default to no-ops.
pub trait PipelineObserver: Send + Sync {
    fn on_signal_accepted(&self, _signal: &DemandSignal) {}
    fn on_signal_rejected(&self, _id: &str, _reason: &Rejection) {}
    fn on_fetch_failed(&self, _url: &str, _err: &FetchError) {}
}

/// Debug-level trail of accepted signals; ids only.
pub struct TracingObserver;
impl PipelineObserver for TracingObserver {
    fn on_signal_accepted(&self, s: &DemandSignal) {
        debug!(
            target: "pipeline",
            id = %s.id,
            author = %anon_id(&s.context.author.id),
            confidence = s.confidence.overall,
            "signal accepted"
        );
    }
}

/// Keeps what it saw; for tests and dry runs.
#[derive(Default)]
pub struct RecordingObserver {
    pub accepted: Mutex<Vec<String>>,
    pub rejected: Mutex<Vec<(String, &'static str)>>,
    pub fetch_failures: Mutex<Vec<String>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_signal_accepted(&self, s: &DemandSignal) {
        if let Ok(mut v) = self.accepted.lock() {
            v.push(s.id.clone());
        }
    }

    fn on_signal_rejected(&self, id: &str, reason: &Rejection) {
        if let Ok(mut v) = self.rejected.lock() {
            v.push((id.to_string(), reason.kind()));
        }
    }

    fn on_fetch_failed(&self, url: &str, _err: &FetchError) {
        if let Ok(mut v) = self.fetch_failures.lock() {
            v.push(url.to_string());
        }
    }
}

pub struct Pipeline {
    gateway: Gateway,
    extractor: SignalExtractor,
    scorer: ConfidenceScorer,
    observer: Arc<dyn PipelineObserver>,
    duplicate_similarity: f64,
}

impl Pipeline {
    pub fn new(gateway: Gateway) -> Self {
        ensure_metrics_described();
        Self {
            gateway,
            extractor: SignalExtractor::new(),
            scorer: ConfidenceScorer::new(),
            observer: Arc::new(TracingObserver),
            duplicate_similarity: crate::config::DEFAULT_DUPLICATE_SIMILARITY,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Threshold for `process_items`; `run` takes it from its `IngestSection`.
    /// 0 turns near-duplicate suppression off.
    pub fn with_duplicate_similarity(mut self, threshold: f64) -> Self {
        self.duplicate_similarity = sanitize_threshold(threshold);
        self
    }

    /// Extract, score and validate already-fetched items. Order is kept.
    pub fn process_items(
        &self,
        items: &[RawItem],
        now: DateTime<Utc>,
    ) -> (Vec<DemandSignal>, PipelineStats) {
        self.process(items, now, self.duplicate_similarity)
    }

    fn process(
        &self,
        items: &[RawItem],
        now: DateTime<Utc>,
        duplicate_similarity: f64,
    ) -> (Vec<DemandSignal>, PipelineStats) {
        let mut stats = PipelineStats {
            fetched: items.len(),
            ..Default::default()
        };
        let mut kept: Vec<DemandSignal> = Vec::new();
        let mut fingerprints: Vec<String> = Vec::new();

        for item in items {
            let started = Instant::now();
            let mut signal = self.extractor.extract_at(item, now);
            self.scorer.apply(&mut signal, item, now);
            let elapsed = started.elapsed();
            signal.metadata.processing_time = elapsed.as_millis() as u64;
            histogram!("signal_extract_ms").record(elapsed.as_secs_f64() * 1000.0);
            stats.extracted += 1;

            if let Err(reason) = validate::check(&signal) {
                validate::report_rejection(&signal, &reason);
                self.observer.on_signal_rejected(&signal.id, &reason);
                stats.rejected += 1;
                continue;
            }

            let fp = fingerprint(&signal.content);
            if is_repeat(&fp, &fingerprints, duplicate_similarity) {
                debug!(target: "pipeline", id = %signal.id, "near-duplicate dropped");
                counter!("signals_duplicate_total").increment(1);
                stats.duplicates += 1;
                continue;
            }

            self.observer.on_signal_accepted(&signal);
            fingerprints.push(fp);
            kept.push(signal);
        }

        stats.valid = kept.len();
        counter!("signals_fetched_total").increment(stats.fetched as u64);
        counter!("signals_valid_total").increment(stats.valid as u64);
        gauge!("pipeline_last_run_ts").set(now.timestamp() as f64);
        (kept, stats)
    }

    /// Search every configured community, optionally pull comment threads,
    /// and return the valid signals with run statistics.
    pub async fn run(&self, cfg: &IngestSection) -> IngestBatch {
        let now = Utc::now();
        let mut items: Vec<RawItem> = Vec::new();
        let mut threads = BTreeMap::new();
        let mut fetch_errors = 0usize;

        for community in &cfg.communities {
            let Some(url) = search_url(community, &cfg.query, cfg.limit) else {
                warn!(target: "pipeline", community = %community, "community name refused");
                continue;
            };
            let posts = match self.gateway.fetch(&url).await {
                Ok(v) => parse_listing(&v),
                Err(e) => {
                    warn!(target: "pipeline", community = %community, error = %e, "search failed");
                    self.observer.on_fetch_failed(&url, &e);
                    fetch_errors += 1;
                    continue;
                }
            };
            info!(target: "pipeline", community = %community, posts = posts.len(), "listing fetched");

            for post in posts {
                if cfg.include_comments {
                    if let Some(curl) = comments_url(community, &post.id) {
                        match self.gateway.fetch(&curl).await {
                            Ok(v) => {
                                let (_, comments) = parse_thread(&v);
                                threads.insert(post.id.clone(), summarize_thread(&comments));
                                items.push(post);
                                items.extend(comments);
                                continue;
                            }
                            Err(e) => {
                                warn!(target: "pipeline", post = %post.id, error = %e, "thread fetch failed");
                                self.observer.on_fetch_failed(&curl, &e);
                                fetch_errors += 1;
                            }
                        }
                    }
                }
                items.push(post);
            }
        }

        let (signals, run_stats) =
            self.process(&items, now, sanitize_threshold(cfg.duplicate_similarity));
        let mut stats = PipelineStats {
            fetch_errors,
            ..Default::default()
        };
        stats.absorb(&run_stats);

        let gateway = self.gateway.metrics().await.unwrap_or_default();
        info!(
            target: "pipeline",
            fetched = stats.fetched, valid = stats.valid, rejected = stats.rejected,
            duplicates = stats.duplicates, fetch_errors = stats.fetch_errors,
            "ingest run finished"
        );
        IngestBatch {
            signals,
            stats,
            gateway,
            threads,
        }
    }
}

fn sanitize_threshold(t: f64) -> f64 {
    if t.is_finite() {
        t.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn is_repeat(fp: &str, seen: &[String], threshold: f64) -> bool {
    threshold > 0.0 && seen.iter().any(|s| normalized_levenshtein(fp, s) >= threshold)
}

fn fingerprint(content: &str) -> String {
    content
        .to_lowercase()
        .chars()
        .take(DUPLICATE_PREFIX_CHARS)
        .collect()
}
