//! # Reconciliation pass
//! One full cycle over a single incoming snapshot:
//! diff → archive → enrich → merge → rank, each stage fully consuming the
//! previous one. Ranking only ever runs after every successful enrichment of
//! the pass has been merged, so it never sees a half-updated cache.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::archive::ArchiveStore;
use crate::cache::ListingCache;
use crate::config::AppConfig;
use crate::diff::diff;
use crate::enrich::{enrich_in_batches, EnrichmentOutcome, SharedGateway};
use crate::listing::{ChangeStatus, Listing, RawListing};
use crate::rank::rank;

/// Per-pass counts, always produced even when enrichment partially fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub enrichment_failed: usize,
    pub skipped: usize,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "new {} | updated {} | unchanged {} | removed {} | enrichment failed {} | skipped {}",
            self.new, self.updated, self.unchanged, self.removed, self.enrichment_failed, self.skipped
        )
    }
}

#[derive(Debug)]
pub struct PassOutcome {
    pub summary: PassSummary,
    /// Ranked top-N view for the report renderer.
    pub ranked: Vec<Listing>,
}

pub struct Reconciler {
    cache_path: PathBuf,
    archive: ArchiveStore,
    gateway: SharedGateway,
    batch_size: usize,
    top_n: usize,
}

impl Reconciler {
    pub fn new(config: &AppConfig, gateway: SharedGateway) -> Self {
        Self {
            cache_path: config.cache_path.clone(),
            archive: ArchiveStore::new(config.archive_path.clone()),
            gateway,
            batch_size: config.enrich_batch_size,
            top_n: config.rank_top_n,
        }
    }

    /// Run one pass over `snapshot`. Errors only on a failed cache write-back;
    /// everything else degrades and is counted.
    pub async fn run_once(&self, snapshot: &[RawListing]) -> Result<PassOutcome> {
        let now = Utc::now();
        let mut cache = ListingCache::load(&self.cache_path).await;
        tracing::info!(live = cache.len(), incoming = snapshot.len(), "pass started");

        // 1) Classify.
        let d = diff(cache.entries(), snapshot);
        let mut summary = PassSummary {
            new: d.new.len(),
            updated: d.updated.len(),
            unchanged: d.unchanged.len(),
            removed: d.removed.len(),
            enrichment_failed: 0,
            skipped: d.skipped,
        };

        // 2) Archive disappeared listings and drop them from the live set.
        // Removal commits even when the archive write fails; resurrecting the
        // record next pass would be worse than a gap in the archive.
        let mut gone = Vec::with_capacity(d.removed.len());
        for id in &d.removed {
            match cache.remove(id, now) {
                Ok(listing) => gone.push(listing),
                Err(e) => tracing::error!(%id, error = %e, "removal of unknown id, skipping"),
            }
        }
        match self.archive.archive(&gone).await {
            Ok(added) if added > 0 => tracing::info!(added, "archived removed listings"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "archive write failed, removed listings dropped unarchived"),
        }

        // 3) Record sightings.
        for (id, raw) in &d.new {
            cache.upsert_fingerprint(id, raw, ChangeStatus::New, now);
        }
        for (id, raw) in &d.updated {
            cache.upsert_fingerprint(id, raw, ChangeStatus::Updated, now);
        }
        for (id, _) in &d.unchanged {
            cache.touch(id, now);
        }

        // 4) Enrich only new-or-changed listings, in bounded batches.
        let candidates: Vec<Listing> = d
            .enrichment_candidates()
            .iter()
            .filter_map(|id| cache.get(id).cloned())
            .collect();
        let outcomes = enrich_in_batches(self.gateway.clone(), candidates, self.batch_size).await;

        // 5) Merge successes; failures keep prior fields and retry next pass.
        for (id, outcome) in outcomes {
            match outcome {
                EnrichmentOutcome::Enriched(fields) => {
                    if let Err(e) = cache.merge_enrichment(&id, fields) {
                        tracing::error!(%id, error = %e, "merge rejected");
                    }
                }
                EnrichmentOutcome::Failed(reason) => {
                    summary.enrichment_failed += 1;
                    tracing::warn!(%id, %reason, "enrichment failed, keeping stale fields");
                }
            }
        }

        // 6) Persist whatever completed, then rank.
        cache.flush().await.context("writing back listing cache")?;
        let ranked = rank(cache.all(), self.top_n);

        tracing::info!(%summary, "pass finished");
        Ok(PassOutcome { summary, ranked })
    }
}
