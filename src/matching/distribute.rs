// src/matching/distribute.rs
//! Fan candidate chunks out over the worker pool and merge the results.
//!
//! Candidates are cut into `workers` contiguous chunks of `ceil(n / workers)`.
//! Each task owns its chunk and shares the signal set read-only. A failed
//! chunk is reported in `chunk_errors`; only when every chunk fails does the
//! whole distribution fail.

use super::pool::WorkerPool;
use super::{MatchScorer, PairScorer, SignalProfile, DEFAULT_MAX_RESULTS};
use crate::error::{ChunkError, DistributeError};
use crate::model::{Candidate, DemandSignal, Match, MatchRequest};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    /// Descending by score; ties by (candidate index, signal index).
    pub matches: Vec<Match>,
    pub chunk_errors: Vec<ChunkError>,
}

/// Match with its merge key.
type Ranked = (usize, usize, Match);

pub struct MatchDistributor {
    pool: WorkerPool,
    scorer: Arc<dyn PairScorer>,
    max_results: usize,
}

impl MatchDistributor {
    pub fn new(pool: WorkerPool, scorer: Arc<dyn PairScorer>, max_results: usize) -> Self {
        Self {
            pool,
            scorer,
            max_results,
        }
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    pub async fn distribute(
        &self,
        candidates: &[Candidate],
        signals: &[DemandSignal],
    ) -> Result<Distribution, DistributeError> {
        if candidates.is_empty() || signals.is_empty() || self.max_results == 0 {
            return Ok(Distribution::default());
        }
        let started = Instant::now();
        let workers = self.pool.size().max(1);
        let chunk_len = candidates.len().div_ceil(workers);
        let shared: Arc<[DemandSignal]> = signals.to_vec().into();

        let mut pending = Vec::new();
        for (index, chunk) in candidates.chunks(chunk_len).enumerate() {
            let start = index * chunk_len;
            let owned = chunk.to_vec();
            let signals = Arc::clone(&shared);
            let scorer = Arc::clone(&self.scorer);
            let handle = self.pool.submit(move || score_chunk(start, &owned, &signals, &*scorer));
            pending.push((index, start, start + chunk.len(), handle));
        }

        let chunks = pending.len();
        let mut ranked: Vec<Ranked> = Vec::new();
        let mut chunk_errors = Vec::new();
        for (index, start, end, handle) in pending {
            match handle.join().await {
                Ok(mut local) => ranked.append(&mut local),
                Err(e) => {
                    warn!(target: "matching", chunk = index, start, end, error = %e, "chunk failed");
                    counter!("match_chunk_failures_total").increment(1);
                    chunk_errors.push(ChunkError {
                        index,
                        start,
                        end,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if chunk_errors.len() == chunks {
            return Err(DistributeError::AllChunksFailed(chunk_errors));
        }

        ranked.sort_by(|a, b| {
            b.2.match_score
                .total_cmp(&a.2.match_score)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });
        ranked.truncate(self.max_results);
        let matches: Vec<Match> = ranked.into_iter().map(|(_, _, m)| m).collect();

        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("match_distribute_ms").record(ms);
        counter!("matches_emitted_total").increment(matches.len() as u64);
        info!(
            target: "matching",
            candidates = candidates.len(), signals = signals.len(), chunks,
            failed = chunk_errors.len(), matches = matches.len(), ms,
            "distribution finished"
        );

        Ok(Distribution {
            matches,
            chunk_errors,
        })
    }
}

fn score_chunk(
    start: usize,
    chunk: &[Candidate],
    signals: &[DemandSignal],
    scorer: &dyn PairScorer,
) -> Vec<Ranked> {
    let profiles: Vec<SignalProfile<'_>> = signals.iter().map(SignalProfile::new).collect();
    let mut out = Vec::new();
    for (ci, c) in chunk.iter().enumerate() {
        for (si, s) in profiles.iter().enumerate() {
            if let Some(m) = scorer.score(c, s) {
                out.push((start + ci, si, m));
            }
        }
    }
    out
}

/// `distribute(candidates, signals, workers)` with the default scorer and cap.
pub async fn distribute(
    candidates: &[Candidate],
    signals: &[DemandSignal],
    workers: usize,
) -> Result<Distribution, DistributeError> {
    let pool =
        WorkerPool::new(workers).map_err(|e| DistributeError::PoolUnavailable(e.to_string()))?;
    MatchDistributor::new(pool, Arc::new(MatchScorer::default()), DEFAULT_MAX_RESULTS)
        .distribute(candidates, signals)
        .await
}

/// Apply a `MatchRequest`: its `minMatchScore` and `maxResults` drive the run.
pub async fn run_match_request(
    req: &MatchRequest,
    workers: usize,
) -> Result<Distribution, DistributeError> {
    let pool =
        WorkerPool::new(workers).map_err(|e| DistributeError::PoolUnavailable(e.to_string()))?;
    let scorer = Arc::new(MatchScorer::new(req.min_match_score));
    MatchDistributor::new(pool, scorer, req.max_results)
        .distribute(&req.candidates, &req.signals)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Confidence;

    struct Fixed;
    impl PairScorer for Fixed {
        fn score(&self, c: &Candidate, s: &SignalProfile<'_>) -> Option<Match> {
            let v: f64 = c.id.parse::<f64>().unwrap_or(0.0) / 10.0;
            Some(Match {
                candidate_id: c.id.clone(),
                signal_id: s.signal.id.clone(),
                match_score: v.min(1.0),
                match_reasons: vec![],
                metadata: crate::model::MatchMetadata {
                    category_match: false,
                    price_match: false,
                    similarity: 0.0,
                },
            })
        }
    }

    struct Panicky;
    impl PairScorer for Panicky {
        fn score(&self, c: &Candidate, s: &SignalProfile<'_>) -> Option<Match> {
            if c.id == "boom" {
                panic!("scorer exploded");
            }
            Fixed.score(c, s)
        }
    }

    fn signal(id: &str) -> DemandSignal {
        DemandSignal {
            id: id.into(),
            confidence: Confidence {
                overall: 1.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn cands(ids: &[&str]) -> Vec<Candidate> {
        ids.iter().map(|i| Candidate::new(*i, "x")).collect()
    }

    #[tokio::test]
    async fn ties_break_by_input_order() {
        let d = MatchDistributor::new(WorkerPool::new(2).unwrap(), Arc::new(Fixed), 10);
        let out = d
            .distribute(&cands(&["5", "5", "9"]), &[signal("a"), signal("b")])
            .await
            .unwrap();
        let order: Vec<_> = out
            .matches
            .iter()
            .map(|m| (m.candidate_id.as_str(), m.signal_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("9", "a"), ("9", "b"), ("5", "a"), ("5", "b"), ("5", "a"), ("5", "b")]
        );
        assert!(out.chunk_errors.is_empty());
    }

    #[tokio::test]
    async fn one_failed_chunk_keeps_the_rest() {
        let d = MatchDistributor::new(WorkerPool::new(2).unwrap(), Arc::new(Panicky), 10);
        let out = d
            .distribute(&cands(&["1", "2", "boom", "3"]), &[signal("a")])
            .await
            .unwrap();
        assert_eq!(out.chunk_errors.len(), 1);
        assert_eq!(out.chunk_errors[0].index, 1);
        assert_eq!((out.chunk_errors[0].start, out.chunk_errors[0].end), (2, 4));
        assert_eq!(out.matches.len(), 2);
    }

    #[tokio::test]
    async fn all_chunks_failing_is_an_error() {
        let d = MatchDistributor::new(WorkerPool::new(2).unwrap(), Arc::new(Panicky), 10);
        let err = d
            .distribute(&cands(&["boom", "boom"]), &[signal("a")])
            .await
            .unwrap_err();
        match err {
            DistributeError::AllChunksFailed(errs) => assert_eq!(errs.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_inputs_give_empty_result() {
        let out = distribute(&[], &[signal("a")], 2).await.unwrap();
        assert!(out.matches.is_empty());
        let out = distribute(&cands(&["1"]), &[], 2).await.unwrap();
        assert!(out.matches.is_empty());
    }

    #[tokio::test]
    async fn cap_truncates() {
        let d = MatchDistributor::new(WorkerPool::new(3).unwrap(), Arc::new(Fixed), 4);
        let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let out = d.distribute(&cands(&refs), &[signal("a")]).await.unwrap();
        assert_eq!(out.matches.len(), 4);
        assert_eq!(out.matches[0].candidate_id, "9");
    }
}
