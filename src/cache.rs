//! # Record Cache
//! The durable id→listing store owned by a single reconciliation pass.
//!
//! Lifecycle: `load()` once at pass start, mutate in memory, `flush()` once at
//! pass end. The durable form is a JSON array written temp-file-then-rename so
//! a crash mid-write can never leave a partial file behind. A missing or
//! corrupt file degrades to an empty cache (the snapshot is authoritative for
//! what currently exists), while a failed flush is surfaced to the caller:
//! silently losing the updated cache would double-count `new` next run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;

use crate::listing::{merge_details, ChangeStatus, Listing, RawListing};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unknown listing id: {0}")]
    UnknownRecord(String),
    #[error("persisting cache to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct ListingCache {
    path: PathBuf,
    live: HashMap<String, Listing>,
}

impl ListingCache {
    /// Load the persisted cache, or start empty when the file is missing or
    /// not valid JSON. Never fatal.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let live = match fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<Vec<Listing>>(&text) {
                Ok(entries) => entries.into_iter().map(|l| (l.id.clone(), l)).collect(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cache file corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
                HashMap::new()
            }
        };
        Self { path, live }
    }

    /// An unpersisted cache for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.live.get(id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Snapshot of the live set for diffing and ranking.
    pub fn entries(&self) -> &HashMap<String, Listing> {
        &self.live
    }

    pub fn all(&self) -> Vec<Listing> {
        self.live.values().cloned().collect()
    }

    /// Create or update the cheap fingerprint fields for a sighting, stamping
    /// the transient status and `last_seen_at` for this pass.
    pub fn upsert_fingerprint(
        &mut self,
        id: &str,
        raw: &RawListing,
        status: ChangeStatus,
        now: DateTime<Utc>,
    ) -> &Listing {
        let entry = self
            .live
            .entry(id.to_string())
            .and_modify(|l| {
                l.fingerprint = crate::listing::Fingerprint::of(raw);
                // Scraper-side extras track the latest sighting; enrichment
                // keys without a fresh raw value stay put.
                merge_details(&mut l.details, raw.extra.clone());
                l.status = status;
                l.last_seen_at = now;
            })
            .or_insert_with(|| {
                let mut l = Listing::from_raw(id.to_string(), raw, now);
                l.status = status;
                l
            });
        entry
    }

    /// Refresh `last_seen_at` for a listing that appeared unchanged.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) {
        if let Some(l) = self.live.get_mut(id) {
            l.status = ChangeStatus::Unchanged;
            l.last_seen_at = now;
        }
    }

    /// Non-destructive merge of an enrichment result. The id must already be
    /// live (`upsert_fingerprint` first); anything else is a call-sequencing
    /// bug upstream.
    pub fn merge_enrichment(
        &mut self,
        id: &str,
        result: std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<&Listing, CacheError> {
        let listing = self
            .live
            .get_mut(id)
            .ok_or_else(|| CacheError::UnknownRecord(id.to_string()))?;
        merge_details(&mut listing.details, result);
        listing.enriched_at = Some(Utc::now());
        Ok(listing)
    }

    /// Delete from the live set, returning the listing for archival with its
    /// `removed_at` stamped.
    pub fn remove(&mut self, id: &str, removed_at: DateTime<Utc>) -> Result<Listing, CacheError> {
        let mut listing = self
            .live
            .remove(id)
            .ok_or_else(|| CacheError::UnknownRecord(id.to_string()))?;
        listing.status = ChangeStatus::Removed;
        listing.removed_at = Some(removed_at);
        Ok(listing)
    }

    /// Write the live set back atomically. Entries are sorted by id so the
    /// on-disk file diffs cleanly between runs.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let mut entries = self.all();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        let json =
            serde_json::to_vec_pretty(&entries).map_err(|e| CacheError::Persistence {
                path: self.path.clone(),
                source: e.into(),
            })?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|source| CacheError::Persistence {
                path: self.path.clone(),
                source,
            })
    }
}

/// Temp-file-then-rename write, shared with the archive store.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await
}
