// src/validate.rs
//! Gate between extraction and the valid-signal set. Pure: a refused signal
//! is reported through `check`'s error and a warning, never raised.

use crate::error::Rejection;
use crate::model::DemandSignal;
use chrono::DateTime;
use metrics::counter;

/// First failed check, in a fixed order.
pub fn check(s: &DemandSignal) -> Result<(), Rejection> {
    for (name, value) in [
        ("id", &s.id),
        ("title", &s.title),
        ("content", &s.content),
        ("url", &s.url),
        ("timestamp", &s.timestamp),
    ] {
        if value.trim().is_empty() {
            return Err(Rejection::EmptyField(name));
        }
    }

    let overall = s.confidence.overall;
    if !(0.0..=1.0).contains(&overall) {
        return Err(Rejection::OverallOutOfRange(overall));
    }
    let sentiment = s.analysis.sentiment;
    if !(-1.0..=1.0).contains(&sentiment) {
        return Err(Rejection::SentimentOutOfRange(sentiment));
    }
    if DateTime::parse_from_rfc3339(&s.timestamp).is_err() {
        return Err(Rejection::BadTimestamp(s.timestamp.clone()));
    }

    for (name, value) in s.confidence.factors.named() {
        match value {
            None => return Err(Rejection::MissingFactor(name)),
            Some(v) if !(0.0..=1.0).contains(&v) => {
                return Err(Rejection::FactorOutOfRange { name, value: v })
            }
            Some(_) => {}
        }
    }

    let q = s.metadata.data_quality_score;
    if !q.is_finite() || !(0.0..=1.0).contains(&q) {
        return Err(Rejection::BadQualityScore(q));
    }
    Ok(())
}

/// Warn by signal id (never content) and count under the rejection kind.
pub fn report_rejection(s: &DemandSignal, r: &Rejection) {
    tracing::warn!(target: "pipeline", id = %s.id, reason = r.kind(), detail = %r, "signal rejected");
    counter!("signals_rejected_total", "reason" => r.kind()).increment(1);
}

/// `true` when every check passes. A refusal is reported, never raised.
pub fn validate(s: &DemandSignal) -> bool {
    match check(s) {
        Ok(()) => true,
        Err(r) => {
            report_rejection(s, &r);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, ConfidenceFactors, SignalMetadata};

    fn good() -> DemandSignal {
        DemandSignal {
            id: "s1".into(),
            title: "Need a tool".into(),
            content: "Looking for a tool".into(),
            url: "https://www.reddit.com/r/x/comments/s1/".into(),
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            confidence: Confidence {
                overall: 0.6,
                factors: ConfidenceFactors::new(0.5, 0.5, 0.5, 0.5, 1.0),
            },
            metadata: SignalMetadata {
                data_quality_score: 0.7,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn well_formed_signal_passes() {
        assert!(validate(&good()));
    }

    #[test]
    fn boundaries_are_refused() {
        let mut s = good();
        s.confidence.overall = 1.0001;
        assert!(!validate(&s));
        assert!(matches!(check(&s), Err(Rejection::OverallOutOfRange(_))));

        let mut s = good();
        s.analysis.sentiment = -1.0001;
        assert!(!validate(&s));

        let mut s = good();
        s.id = String::new();
        assert_eq!(check(&s), Err(Rejection::EmptyField("id")));

        let mut s = good();
        s.confidence.factors.temporal_relevance = None;
        assert_eq!(check(&s), Err(Rejection::MissingFactor("temporalRelevance")));
    }

    #[test]
    fn exact_bounds_are_accepted() {
        let mut s = good();
        s.confidence.overall = 1.0;
        s.analysis.sentiment = -1.0;
        assert!(validate(&s));
        s.confidence.overall = 0.0;
        s.analysis.sentiment = 1.0;
        assert!(validate(&s));
    }

    #[test]
    fn bad_timestamp_and_nan_quality() {
        let mut s = good();
        s.timestamp = "yesterday".into();
        assert!(matches!(check(&s), Err(Rejection::BadTimestamp(_))));

        let mut s = good();
        s.metadata.data_quality_score = f64::NAN;
        assert!(!validate(&s));

        let mut s = good();
        s.confidence.overall = f64::NAN;
        assert!(!validate(&s));
    }
}
