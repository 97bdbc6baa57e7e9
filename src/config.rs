// src/config.rs
//! Engine configuration: TOML file + environment overrides.
//!
//! Resolution:
//! 1) $DEMAND_CONFIG_PATH (must exist when set)
//! 2) config/engine.toml (optional; built-in defaults when absent)
//! 3) env overrides: MIN_MATCH_SCORE, MATCH_WORKERS, FETCH_MAX_RETRIES, MAX_MATCH_RESULTS

use crate::gateway::GatewayConfig;
use crate::gateway::transport::DEFAULT_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";
pub const DEFAULT_DUPLICATE_SIMILARITY: f64 = 0.92;

pub const ENV_CONFIG_PATH: &str = "DEMAND_CONFIG_PATH";
pub const ENV_MIN_MATCH_SCORE: &str = "MIN_MATCH_SCORE";
pub const ENV_MATCH_WORKERS: &str = "MATCH_WORKERS";
pub const ENV_FETCH_MAX_RETRIES: &str = "FETCH_MAX_RETRIES";
pub const ENV_MAX_MATCH_RESULTS: &str = "MAX_MATCH_RESULTS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub min_interval_ms: u64,
    pub cache_ttl_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub deadline_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            min_interval_ms: 2_000,
            cache_ttl_secs: 3_600,
            max_retries: 3,
            retry_delay_ms: 5_000,
            deadline_secs: 60,
            request_timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub communities: Vec<String>,
    pub query: String,
    pub limit: u32,
    /// Also fetch and score the comment thread of every post.
    pub include_comments: bool,
    /// Normalised Levenshtein similarity at or above which a signal counts as a repeat.
    pub duplicate_similarity: f64,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            communities: vec!["software".to_string(), "productivity".to_string()],
            query: "looking for alternative".to_string(),
            limit: 25,
            include_comments: false,
            duplicate_similarity: DEFAULT_DUPLICATE_SIMILARITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchingSection {
    pub min_match_score: f64,
    pub max_results: usize,
    /// 0 = one worker per available core.
    pub workers: usize,
    pub catalog_path: Option<PathBuf>,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            min_match_score: crate::matching::DEFAULT_MIN_MATCH_SCORE,
            max_results: crate::matching::DEFAULT_MAX_RESULTS,
            workers: 0,
            catalog_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gateway: GatewaySection,
    pub ingest: IngestSection,
    pub matching: MatchingSection,
}

fn parse_unit_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_count_env<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s).context("parsing engine config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File (env path, then default path, then built-ins) + env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Unparsable values are ignored; scores are clamped to [0,1].
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_unit_env(get(ENV_MIN_MATCH_SCORE)) {
            self.matching.min_match_score = v;
        }
        if let Some(v) = parse_count_env::<usize>(get(ENV_MATCH_WORKERS)) {
            self.matching.workers = v;
        }
        if let Some(v) = parse_count_env::<u32>(get(ENV_FETCH_MAX_RETRIES)) {
            self.gateway.max_retries = v;
        }
        if let Some(v) = parse_count_env::<usize>(get(ENV_MAX_MATCH_RESULTS)) {
            self.matching.max_results = v;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        let d = IngestSection::default();
        if !self.matching.min_match_score.is_finite() {
            self.matching.min_match_score = crate::matching::DEFAULT_MIN_MATCH_SCORE;
        }
        self.matching.min_match_score = self.matching.min_match_score.clamp(0.0, 1.0);
        if !self.ingest.duplicate_similarity.is_finite() {
            self.ingest.duplicate_similarity = d.duplicate_similarity;
        }
        self.ingest.duplicate_similarity = self.ingest.duplicate_similarity.clamp(0.0, 1.0);
        self.ingest.limit = self.ingest.limit.clamp(1, 100);
        self.ingest.communities.retain(|c| !c.trim().is_empty());
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let g = &self.gateway;
        GatewayConfig {
            min_interval: Duration::from_millis(g.min_interval_ms),
            cache_ttl: Duration::from_secs(g.cache_ttl_secs),
            max_retries: g.max_retries,
            retry_delay: Duration::from_millis(g.retry_delay_ms),
            deadline: Duration::from_secs(g.deadline_secs.max(1)),
        }
    }
}
