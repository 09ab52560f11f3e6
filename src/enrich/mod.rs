//! Enrichment gateway: provider abstraction + bounded-batch coordination.
//!
//! The gateway is the only stage that blocks on network latency. Batches run
//! as independent tokio tasks, but their results are merged into the cache by
//! the single pass coordinator, so no two tasks ever mutate the same id.

pub mod openai;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;

use crate::listing::Listing;

/// Per-listing result from the gateway. Failure is local to the record: the
/// listing keeps its previous enrichment fields (or stays fingerprint-only)
/// and is retried on the next pass.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Enriched(BTreeMap<String, serde_json::Value>),
    Failed(String),
}

/// The boundary consumed by the reconciliation pass. Implementations must
/// correlate results by id; the caller never assumes input order is preserved.
#[async_trait::async_trait]
pub trait EnrichmentGateway: Send + Sync {
    async fn enrich(&self, batch: &[Listing]) -> Result<HashMap<String, EnrichmentOutcome>>;
    fn name(&self) -> &'static str;
}

pub type SharedGateway = Arc<dyn EnrichmentGateway>;

/// Run the gateway over `candidates` in chunks of `batch_size`, in parallel
/// tasks. Every candidate id is present in the returned map: ids the gateway
/// dropped or whole batches that errored come back as `Failed`.
pub async fn enrich_in_batches(
    gateway: SharedGateway,
    candidates: Vec<Listing>,
    batch_size: usize,
) -> HashMap<String, EnrichmentOutcome> {
    let batch_size = batch_size.max(1);
    let mut outcomes: HashMap<String, EnrichmentOutcome> = HashMap::new();
    if candidates.is_empty() {
        return outcomes;
    }

    let mut tasks: JoinSet<(Vec<String>, Result<HashMap<String, EnrichmentOutcome>>)> =
        JoinSet::new();
    for chunk in candidates.chunks(batch_size) {
        let gateway = Arc::clone(&gateway);
        let batch: Vec<Listing> = chunk.to_vec();
        let ids: Vec<String> = batch.iter().map(|l| l.id.clone()).collect();
        tasks.spawn(async move {
            let result = gateway.enrich(&batch).await;
            (ids, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (ids, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "enrichment task panicked");
                continue;
            }
        };
        match result {
            Ok(mut map) => {
                for id in ids {
                    let outcome = map
                        .remove(&id)
                        .unwrap_or_else(|| EnrichmentOutcome::Failed("no result from gateway".into()));
                    outcomes.insert(id, outcome);
                }
                // Ids the gateway invented have nothing live to merge into.
                for id in map.keys() {
                    tracing::warn!(%id, "gateway returned a result for an unknown id, dropping");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "enrichment batch failed");
                for id in ids {
                    outcomes.insert(id, EnrichmentOutcome::Failed(format!("batch error: {e}")));
                }
            }
        }
    }

    outcomes
}

/// Deterministic gateway for tests and offline runs: fixed fields for every
/// listing, with an optional set of ids forced to fail.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    pub fixed: BTreeMap<String, serde_json::Value>,
    pub failing_ids: Vec<String>,
}

#[async_trait::async_trait]
impl EnrichmentGateway for MockGateway {
    async fn enrich(&self, batch: &[Listing]) -> Result<HashMap<String, EnrichmentOutcome>> {
        let mut out = HashMap::new();
        for listing in batch {
            let outcome = if self.failing_ids.contains(&listing.id) {
                EnrichmentOutcome::Failed("forced failure (mock)".into())
            } else {
                EnrichmentOutcome::Enriched(self.fixed.clone())
            };
            out.insert(listing.id.clone(), outcome);
        }
        Ok(out)
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Returns no results; every candidate comes back `Failed` and is retried
/// once a real gateway is configured.
pub struct DisabledGateway;

#[async_trait::async_trait]
impl EnrichmentGateway for DisabledGateway {
    async fn enrich(&self, _batch: &[Listing]) -> Result<HashMap<String, EnrichmentOutcome>> {
        Ok(HashMap::new())
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}
