// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use demand_signal_engine::gateway::HttpTransport;
use demand_signal_engine::TransportError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Canned JSON per URL; anything else answers 404.
#[derive(Default)]
pub struct MockTransport {
    responses: HashMap<String, Value>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
