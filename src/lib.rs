// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod catalog;
pub mod config;
pub mod confidence;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod validate;

// Fetching: rate-limited, cached, retrying gateway + community read API helpers
pub mod gateway;
pub mod ingest;

// Text analysis (prices, features, topics, sentiment, threads)
pub mod analyze;

// Candidate ↔ signal scoring and parallel distribution
pub mod matching;

// ---- Re-exports for stable public API ----
pub use crate::analyze::SignalExtractor;
pub use crate::confidence::ConfidenceScorer;
pub use crate::config::EngineConfig;
pub use crate::error::{DistributeError, FetchError, PoolError, Rejection, TransportError};
pub use crate::gateway::{Gateway, GatewayConfig, GatewayMetrics};
pub use crate::matching::{distribute, run_match_request, MatchDistributor, MatchScorer, WorkerPool};
pub use crate::model::{Candidate, DemandSignal, Match, MatchRequest, RawItem};
pub use crate::pipeline::{IngestBatch, Pipeline, PipelineStats};
pub use crate::validate::validate;
