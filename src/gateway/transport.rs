// src/gateway/transport.rs
//! The network seam of the gateway: one GET returning JSON.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "demand-signal-engine/0.1 (read-only research client)";

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
    fn name(&self) -> &'static str;
}

/// reqwest-backed transport (rustls).
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
