// src/catalog.rs
//! Where match candidates come from.

use crate::model::Candidate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

pub const ENV_CATALOG_PATH: &str = "CATALOG_PATH";

#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}

/// JSON array of candidates on disk.
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandidateSource for JsonFileCatalog {
    async fn load(&self) -> Result<Vec<Candidate>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading catalog from {}", self.path.display()))?;
        let items: Vec<Candidate> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing catalog {}", self.path.display()))?;
        Ok(clean_catalog(items))
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// Fixed list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<Candidate>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<Candidate>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CandidateSource for InMemoryCatalog {
    async fn load(&self) -> Result<Vec<Candidate>> {
        Ok(clean_catalog(self.items.clone()))
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Drop entries without an id and repeated ids (first one wins); keeps order.
fn clean_catalog(items: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|c| {
            let id = c.id.trim();
            !id.is_empty() && seen.insert(id.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_catalog_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"[
                {"id": "a", "name": "Notes Pro", "category": "Productivity", "priceRange": {"min": 5, "max": 15}},
                {"id": "a", "name": "dup"},
                {"id": "", "name": "no id"},
                {"id": "b", "name": "Sync Hub", "currency": "EUR", "tags": ["sync"]}
            ]"#,
        )
        .unwrap();
        let items = JsonFileCatalog::new(&path).load().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].currency, "USD");
        assert_eq!(items[0].price_range.unwrap().max, 15.0);
        assert_eq!(items[1].currency, "EUR");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = JsonFileCatalog::new("/nonexistent/catalog.json").load().await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn in_memory_catalog_round_trips() {
        let cat = InMemoryCatalog::new(vec![Candidate::new("x", "X")]);
        assert_eq!(cat.load().await.unwrap().len(), 1);
        assert_eq!(cat.name(), "in_memory");
    }
}
