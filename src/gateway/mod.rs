// src/gateway/mod.rs
//! Request gateway: one task owns the URL cache and the counters and serves
//! fetches strictly in arrival order.
//!
//! - cache hit (younger than TTL) → answered without touching the network
//! - miss → throttle to `min_interval` since the previous network call, then
//!   up to `1 + max_retries` attempts spaced by `retry_delay`
//! - the whole miss path is bounded by `deadline`

pub mod cache;
pub mod clock;
pub mod transport;

pub use cache::{CacheEntry, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use transport::{HttpTransport, ReqwestTransport};
#[cfg(test)]
pub(crate) use transport::stubs::{HangingTransport, StaticTransport};

use crate::error::{FetchError, TransportError};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Pending requests buffered in front of the gateway task.
const QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub min_interval: Duration,
    pub cache_ttl: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub deadline: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(3600),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            deadline: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayMetrics {
    /// Network attempts, retries included.
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_error: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Times the throttle actually had to sleep.
    pub rate_limit_waits: u64,
    pub cache_size: usize,
    /// Percent; 0 when nothing was looked up yet.
    pub cache_hit_rate: f64,
    /// Percent; 0 when no request was made yet.
    pub success_rate: f64,
}

enum Command {
    Fetch {
        url: String,
        reply: oneshot::Sender<Result<Value, FetchError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GatewayMetrics>,
    },
}

/// Cheap handle; clones talk to the same gateway task.
#[derive(Clone)]
pub struct Gateway {
    tx: mpsc::Sender<Command>,
}

impl Gateway {
    /// Spawn the gateway task on the current Tokio runtime.
    pub fn spawn(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        cfg: GatewayConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let state = GatewayState {
            transport,
            clock,
            cache: TtlCache::new(cfg.cache_ttl.as_millis() as u64),
            cfg,
            last_network_call: None,
            attempt_in_flight: false,
            counters: GatewayMetrics::default(),
        };
        tokio::spawn(state.run(rx));
        Self { tx }
    }

    pub async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Fetch {
                url: url.to_string(),
                reply,
            })
            .await
            .map_err(|_| FetchError::GatewayClosed)?;
        rx.await.map_err(|_| FetchError::GatewayClosed)?
    }

    pub async fn metrics(&self) -> Result<GatewayMetrics, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| FetchError::GatewayClosed)?;
        rx.await.map_err(|_| FetchError::GatewayClosed)
    }
}

struct GatewayState {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    cfg: GatewayConfig,
    cache: TtlCache,
    last_network_call: Option<Instant>,
    /// Set while `get_json` is pending; a deadline that drops it owes one error.
    attempt_in_flight: bool,
    counters: GatewayMetrics,
}

impl GatewayState {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Fetch { url, reply } => {
                    let res = self.fetch(&url).await;
                    let _ = reply.send(res);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }
        debug!(target: "gateway", "all handles dropped; gateway stopped");
    }

    fn snapshot(&mut self) -> GatewayMetrics {
        self.cache.purge_expired(self.clock.now_millis());
        let c = &self.counters;
        let lookups = c.cache_hits + c.cache_misses;
        GatewayMetrics {
            cache_size: self.cache.len(),
            cache_hit_rate: if lookups > 0 {
                c.cache_hits as f64 / lookups as f64 * 100.0
            } else {
                0.0
            },
            success_rate: if c.requests_total > 0 {
                c.requests_success as f64 / c.requests_total as f64 * 100.0
            } else {
                0.0
            },
            ..c.clone()
        }
    }

    async fn fetch(&mut self, url: &str) -> Result<Value, FetchError> {
        if let Some(hit) = self.cache.get(url, self.clock.now_millis()) {
            self.counters.cache_hits += 1;
            counter!("gateway_cache_hits_total").increment(1);
            return Ok(hit);
        }
        self.counters.cache_misses += 1;
        counter!("gateway_cache_misses_total").increment(1);

        let deadline = self.cfg.deadline;
        match tokio::time::timeout(deadline, self.fetch_with_retries(url)).await {
            Ok(Ok(body)) => {
                self.cache.insert(url, body.clone(), self.clock.now_millis());
                gauge!("gateway_cache_entries").set(self.cache.len() as f64);
                Ok(body)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                if std::mem::take(&mut self.attempt_in_flight) {
                    self.counters.requests_error += 1;
                    counter!("gateway_requests_error_total").increment(1);
                }
                warn!(target: "gateway", %url, ?deadline, "fetch deadline exceeded");
                Err(FetchError::DeadlineExceeded {
                    url: url.to_string(),
                    deadline,
                })
            }
        }
    }

    async fn throttle(&mut self) {
        if let Some(last) = self.last_network_call {
            let since = last.elapsed();
            if since < self.cfg.min_interval {
                self.counters.rate_limit_waits += 1;
                counter!("gateway_rate_limit_waits_total").increment(1);
                tokio::time::sleep(self.cfg.min_interval - since).await;
            }
        }
    }

    async fn fetch_with_retries(&mut self, url: &str) -> Result<Value, FetchError> {
        let attempts = self.cfg.max_retries.saturating_add(1);
        let mut last = TransportError::Network("no attempt made".into());

        for attempt in 1..=attempts {
            self.throttle().await;
            self.counters.requests_total += 1;
            counter!("gateway_requests_total").increment(1);

            // Armed at issue time so a call dropped by the deadline still spaces the next one.
            self.last_network_call = Some(Instant::now());
            self.attempt_in_flight = true;
            let res = self.transport.get_json(url).await;
            self.attempt_in_flight = false;

            match res {
                Ok(body) => {
                    self.counters.requests_success += 1;
                    counter!("gateway_requests_success_total").increment(1);
                    return Ok(body);
                }
                Err(e) => {
                    self.counters.requests_error += 1;
                    counter!("gateway_requests_error_total").increment(1);
                    warn!(
                        target: "gateway",
                        %url, attempt, max = attempts, transport = self.transport.name(),
                        error = %e, "request failed"
                    );
                    last = e;
                    if attempt < attempts {
                        tokio::time::sleep(self.cfg.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last,
        })
    }
}
