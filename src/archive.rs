// src/archive.rs
//! Append-only store for listings that disappeared from the source.
//!
//! The archive is keyed by `(id, removed_at)`: replaying the same removal is a
//! no-op, so re-running a pass against already-reconciled state can never
//! duplicate entries. A failed append is reported but never fatal — the
//! listing is already gone from the live cache and must stay gone.

use std::path::PathBuf;

use crate::cache::write_atomic;
use crate::listing::Listing;

#[derive(Debug)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Durably append `removed` listings (each already stamped with
    /// `removed_at`). Returns how many entries were actually added;
    /// already-archived `(id, removed_at)` pairs are skipped.
    pub async fn archive(&self, removed: &[Listing]) -> std::io::Result<usize> {
        if removed.is_empty() {
            return Ok(0);
        }

        let mut entries = self.load_all().await;
        let mut added = 0usize;
        for listing in removed {
            let dup = entries
                .iter()
                .any(|e| e.id == listing.id && e.removed_at == listing.removed_at);
            if dup {
                continue;
            }
            entries.push(listing.clone());
            added += 1;
        }
        if added == 0 {
            return Ok(0);
        }

        let json = serde_json::to_vec_pretty(&entries)?;
        write_atomic(&self.path, &json).await?;
        Ok(added)
    }

    /// Full archive contents; a missing or corrupt file reads as empty.
    pub async fn load_all(&self) -> Vec<Listing> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "archive file corrupt, treating as empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ChangeStatus, RawListing};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn mk_removed(url: &str, removed_at: chrono::DateTime<Utc>) -> Listing {
        let raw = RawListing {
            url: url.to_string(),
            model: "Ibiza".to_string(),
            price: "300".to_string(),
            contract: "36 months".to_string(),
            usage: "Seminuevo".to_string(),
            extra: BTreeMap::new(),
        };
        let mut l = Listing::from_raw(url.to_string(), &raw, removed_at);
        l.status = ChangeStatus::Removed;
        l.removed_at = Some(removed_at);
        l
    }

    #[tokio::test]
    async fn archiving_twice_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("removed.json"));
        let ts = Utc::now();
        let gone = vec![mk_removed("https://x/1", ts)];

        assert_eq!(store.archive(&gone).await.unwrap(), 1);
        assert_eq!(store.archive(&gone).await.unwrap(), 0);
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn same_id_with_new_timestamp_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("removed.json"));
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::days(7);

        store.archive(&[mk_removed("https://x/1", t1)]).await.unwrap();
        // The listing reappeared and vanished again a week later.
        store.archive(&[mk_removed("https://x/1", t2)]).await.unwrap();
        assert_eq!(store.load_all().await.len(), 2);
    }

    #[tokio::test]
    async fn prior_entries_survive_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("removed.json"));
        let ts = Utc::now();
        store.archive(&[mk_removed("https://x/1", ts)]).await.unwrap();
        store.archive(&[mk_removed("https://x/2", ts)]).await.unwrap();

        let all = store.load_all().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|e| e.id == "https://x/1"));
        assert!(all.iter().any(|e| e.id == "https://x/2"));
    }
}
