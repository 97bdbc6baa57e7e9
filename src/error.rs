// src/error.rs
//! Typed error taxonomy for the library. Application code (binary, config and
//! catalog loading) stays on `anyhow`.

use std::time::Duration;
use thiserror::Error;

/// One failed network attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("non-success status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("could not decode response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("fetch of {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: TransportError,
    },
    #[error("fetch of {url} exceeded deadline of {deadline:?}")]
    DeadlineExceeded { url: String, deadline: Duration },
    #[error("gateway is closed")]
    GatewayClosed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("worker pool is closed")]
    PoolClosed,
}

/// Failure of one distributor chunk; the other chunks still report.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize)]
#[error("chunk {index} (candidates {start}..{end}) failed: {reason}")]
pub struct ChunkError {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DistributeError {
    #[error("all {} chunks failed", .0.len())]
    AllChunksFailed(Vec<ChunkError>),
    #[error("worker pool unavailable: {0}")]
    PoolUnavailable(String),
}

/// Why the validator refused a signal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
    #[error("overall confidence {0} outside [0, 1]")]
    OverallOutOfRange(f64),
    #[error("sentiment {0} outside [-1, 1]")]
    SentimentOutOfRange(f64),
    #[error("timestamp `{0}` does not parse")]
    BadTimestamp(String),
    #[error("confidence factor `{0}` is missing")]
    MissingFactor(&'static str),
    #[error("confidence factor `{name}` = {value} outside [0, 1]")]
    FactorOutOfRange { name: &'static str, value: f64 },
    #[error("data quality score {0} is not a finite value in [0, 1]")]
    BadQualityScore(f64),
}

impl Rejection {
    /// Short stable label used as a metric/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::EmptyField(_) => "empty_field",
            Rejection::OverallOutOfRange(_) => "overall_out_of_range",
            Rejection::SentimentOutOfRange(_) => "sentiment_out_of_range",
            Rejection::BadTimestamp(_) => "bad_timestamp",
            Rejection::MissingFactor(_) => "missing_factor",
            Rejection::FactorOutOfRange { .. } => "factor_out_of_range",
            Rejection::BadQualityScore(_) => "bad_quality_score",
        }
    }
}
