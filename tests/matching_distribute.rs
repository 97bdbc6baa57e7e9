// tests/matching_distribute.rs
use demand_signal_engine::matching::{
    price_alignment, score_pair, MatchDistributor, MatchScorer, PairScorer, SignalProfile,
    WorkerPool,
};
use demand_signal_engine::model::{Confidence, Feature, PricePoint};
use demand_signal_engine::{run_match_request, Candidate, DemandSignal, MatchRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

const CATEGORIES: &[&str] = &["UI/UX", "Performance", "Security", "Integration", "Pricing"];
const WORDS: &[&str] = &[
    "sync", "notes", "offline", "fast", "encryption", "webhook", "dashboard", "export", "calendar",
    "markdown", "backup", "team",
];

fn signal(id: &str, overall: f64, category: &str, prices: &[f64], words: &[&str]) -> DemandSignal {
    let mut s = DemandSignal {
        id: id.into(),
        title: words.join(" "),
        content: format!("Looking for something with {}", words.join(" and ")),
        confidence: Confidence {
            overall,
            ..Default::default()
        },
        ..Default::default()
    };
    s.analysis.features.insert(
        category.to_string(),
        vec![Feature {
            name: words.first().copied().unwrap_or("tool").to_string(),
            sentiment: 0.0,
            confidence: 0.5,
            mentions: 1,
            context: vec![],
        }],
    );
    s.analysis.price_points = prices
        .iter()
        .map(|v| PricePoint {
            value: *v,
            currency: "USD".into(),
            confidence: 0.8,
            context: String::new(),
        })
        .collect();
    s
}

fn random_candidates(rng: &mut StdRng, n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let a = WORDS[rng.random_range(0..WORDS.len())];
            let b = WORDS[rng.random_range(0..WORDS.len())];
            let lo = rng.random_range(0..40) as f64;
            let hi = lo + rng.random_range(1..40) as f64;
            Candidate::new(format!("c{i}"), format!("{a} {b}"))
                .description(format!("A {a} tool with {b} support"))
                .category(CATEGORIES[rng.random_range(0..CATEGORIES.len())])
                .priced(lo, hi)
        })
        .collect()
}

fn signals() -> Vec<DemandSignal> {
    vec![
        signal("s1", 0.9, "Integration", &[10.0, 25.0], &["sync", "webhook"]),
        signal("s2", 0.8, "Security", &[5.0], &["encryption", "backup"]),
        signal("s3", 0.95, "UI/UX", &[], &["markdown", "notes", "offline"]),
        signal("s4", 0.7, "Performance", &[30.0, 60.0], &["fast", "dashboard"]),
    ]
}

#[tokio::test]
async fn parallel_run_matches_sequential_reference() {
    let mut rng = StdRng::seed_from_u64(42);
    let candidates = random_candidates(&mut rng, 400);
    let signals = signals();

    let req = MatchRequest {
        candidates: candidates.clone(),
        signals: signals.clone(),
        min_match_score: 0.3,
        max_results: 100,
    };
    let out = run_match_request(&req, 4).await.unwrap();
    assert!(out.chunk_errors.is_empty());
    assert!(!out.matches.is_empty());
    assert!(out.matches.len() <= 100);
    assert!(out
        .matches
        .windows(2)
        .all(|w| w[0].match_score >= w[1].match_score));

    let cand_ids: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    let sig_ids: HashSet<&str> = signals.iter().map(|s| s.id.as_str()).collect();
    for m in &out.matches {
        assert!(cand_ids.contains(m.candidate_id.as_str()));
        assert!(sig_ids.contains(m.signal_id.as_str()));
        assert!(m.match_score >= 0.3 && m.match_score <= 1.0);
    }

    // Same pairs in the same order as a single-threaded pass.
    let scorer = MatchScorer::new(0.3);
    let profiles: Vec<SignalProfile> = signals.iter().map(SignalProfile::new).collect();
    let mut reference = Vec::new();
    for (ci, c) in candidates.iter().enumerate() {
        for (si, s) in profiles.iter().enumerate() {
            if let Some(m) = scorer.score(c, s) {
                assert_eq!(m.match_score, score_pair(c, s.signal).match_score);
                reference.push((ci, si, m));
            }
        }
    }
    reference.sort_by(|a, b| {
        b.2.match_score
            .total_cmp(&a.2.match_score)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });
    reference.truncate(100);
    let expected: Vec<_> = reference.into_iter().map(|(_, _, m)| m).collect();
    assert_eq!(out.matches, expected);
}

#[tokio::test]
async fn worker_count_does_not_change_the_result() {
    let mut rng = StdRng::seed_from_u64(7);
    let candidates = random_candidates(&mut rng, 60);
    let signals = signals();
    let mut outs = Vec::new();
    for workers in [1, 3, 8] {
        let d = MatchDistributor::new(
            WorkerPool::new(workers).unwrap(),
            Arc::new(MatchScorer::new(0.2)),
            50,
        );
        outs.push(d.distribute(&candidates, &signals).await.unwrap().matches);
    }
    assert_eq!(outs[0], outs[1]);
    assert_eq!(outs[1], outs[2]);
}

#[test]
fn widening_the_candidate_range_never_lowers_the_score() {
    let s = signal("s", 1.0, "Pricing", &[10.0, 20.0], &["budget"]);
    let mut last = -1.0;
    for max in [5.0, 12.0, 15.0, 20.0, 25.0, 100.0] {
        let c = Candidate::new("c", "Budget tool").category("Pricing").priced(0.0, max);
        let score = score_pair(&c, &s).match_score;
        assert!(score >= last, "score dropped at max={max}");
        last = score;
    }
    let c = Candidate::new("c", "x").priced(0.0, 25.0);
    assert_eq!(price_alignment(&c, &s), (1.0, true));
}

#[test]
fn low_confidence_signal_caps_the_match() {
    let c = Candidate::new("c", "Sync webhook hub")
        .description("sync webhook")
        .category("Integration")
        .priced(0.0, 100.0);
    let weak = signal("w", 0.1, "Integration", &[10.0, 25.0], &["sync", "webhook"]);
    let m = score_pair(&c, &weak);
    assert!(m.match_score <= 0.1 + 1e-9);
    assert!(m.metadata.category_match);
    assert!(m.match_reasons.iter().any(|r| r == "Price range match"));
}
