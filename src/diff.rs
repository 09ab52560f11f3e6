//! # Snapshot Differ
//! Pure, testable classification of an incoming snapshot against the previous
//! cache state. No I/O; the reconciliation pass acts on the result.
//!
//! Policy: a record whose identity cannot be resolved is excluded from the pass
//! entirely. It neither enters the incoming set nor suppresses removal of
//! anything, so a transient scrape failure can never cause false archival.

use std::collections::{HashMap, HashSet};

use crate::identity;
use crate::listing::{Listing, RawListing};

/// Classification buckets for one pass. `removed` holds ids because those
/// records live in the previous cache, not in the snapshot.
#[derive(Debug, Default)]
pub struct SnapshotDiff {
    pub new: Vec<(String, RawListing)>,
    pub updated: Vec<(String, RawListing)>,
    pub unchanged: Vec<(String, RawListing)>,
    pub removed: Vec<String>,
    pub skipped: usize,
}

impl SnapshotDiff {
    /// Ids that need the enrichment gateway this pass.
    pub fn enrichment_candidates(&self) -> Vec<String> {
        self.new
            .iter()
            .chain(self.updated.iter())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Classify every incoming raw record against `previous`.
///
/// Duplicate ids within one snapshot: first occurrence wins, later ones are
/// ignored so the record that was classified is the one that gets enriched.
pub fn diff(previous: &HashMap<String, Listing>, incoming: &[RawListing]) -> SnapshotDiff {
    let mut out = SnapshotDiff::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(incoming.len());

    for raw in incoming {
        let id = match identity::resolve(raw) {
            Ok(id) => id,
            Err(_) => {
                out.skipped += 1;
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        match previous.get(&id) {
            None => out.new.push((id, raw.clone())),
            Some(prev) if prev.fingerprint_differs(raw) => out.updated.push((id, raw.clone())),
            // Kept fingerprint-only after a failed enrichment: still `New`, so
            // the gateway is retried.
            Some(prev) if prev.enriched_at.is_none() => out.new.push((id, raw.clone())),
            Some(_) => out.unchanged.push((id, raw.clone())),
        }
    }

    for id in previous.keys() {
        if !seen.contains(id) {
            out.removed.push(id.clone());
        }
    }
    out.removed.sort();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn mk_raw(url: &str, model: &str, price: &str) -> RawListing {
        RawListing {
            url: url.to_string(),
            model: model.to_string(),
            price: price.to_string(),
            contract: "36 months".to_string(),
            usage: "Seminuevo".to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// Previous-state helper: entries are already enriched, the common case.
    fn mk_prev(entries: &[RawListing]) -> HashMap<String, Listing> {
        entries
            .iter()
            .map(|raw| {
                let id = identity::resolve(raw).unwrap();
                let mut l = Listing::from_raw(id.clone(), raw, Utc::now());
                l.enriched_at = Some(Utc::now());
                (id, l)
            })
            .collect()
    }

    #[test]
    fn classifies_all_four_buckets() {
        let prev = mk_prev(&[
            mk_raw("https://x/kept", "Ibiza", "300"),
            mk_raw("https://x/changed", "Corsa", "280"),
            mk_raw("https://x/gone", "Clio", "250"),
        ]);
        let incoming = vec![
            mk_raw("https://x/kept", "Ibiza", "300"),
            mk_raw("https://x/changed", "Corsa", "295"),
            mk_raw("https://x/fresh", "Yaris", "320"),
        ];
        let d = diff(&prev, &incoming);
        assert_eq!(d.new.len(), 1);
        assert_eq!(d.new[0].0, "https://x/fresh");
        assert_eq!(d.updated.len(), 1);
        assert_eq!(d.updated[0].0, "https://x/changed");
        assert_eq!(d.unchanged.len(), 1);
        assert_eq!(d.removed, vec!["https://x/gone".to_string()]);
        assert_eq!(d.skipped, 0);
    }

    #[test]
    fn identical_snapshot_yields_only_unchanged() {
        let snapshot = vec![
            mk_raw("https://x/1", "Ibiza", "300"),
            mk_raw("https://x/2", "Corsa", "280"),
        ];
        let prev = mk_prev(&snapshot);
        let d = diff(&prev, &snapshot);
        assert!(d.new.is_empty());
        assert!(d.updated.is_empty());
        assert!(d.removed.is_empty());
        assert_eq!(d.unchanged.len(), 2);
    }

    #[test]
    fn unresolved_identity_is_skipped_not_removed() {
        let prev = mk_prev(&[mk_raw("https://x/1", "Ibiza", "300")]);
        // One scraped card came back without a url. It must land in `skipped`,
        // enter no bucket, and leave the rest of the diff untouched.
        let incoming = vec![mk_raw("", "Ibiza", "300"), mk_raw("https://x/1", "Ibiza", "300")];
        let d = diff(&prev, &incoming);
        assert_eq!(d.skipped, 1);
        assert_eq!(d.unchanged.len(), 1);
        assert!(d.removed.is_empty());
    }

    #[test]
    fn never_enriched_entry_classifies_new_again() {
        let raw = mk_raw("https://x/1", "Ibiza", "300");
        let id = identity::resolve(&raw).unwrap();
        // Cached fingerprint-only (enrichment failed last pass).
        let prev: HashMap<String, Listing> =
            [(id.clone(), Listing::from_raw(id, &raw, Utc::now()))]
                .into_iter()
                .collect();
        let d = diff(&prev, &[raw]);
        assert_eq!(d.new.len(), 1);
        assert!(d.unchanged.is_empty());
        assert!(d.removed.is_empty());
    }

    #[test]
    fn duplicate_ids_first_occurrence_wins() {
        let prev = HashMap::new();
        let incoming = vec![
            mk_raw("https://x/1", "Ibiza", "300"),
            mk_raw("https://x/1/", "Ibiza", "999"), // same canonical id
        ];
        let d = diff(&prev, &incoming);
        assert_eq!(d.new.len(), 1);
        assert_eq!(d.new[0].1.price, "300");
    }

    #[test]
    fn raw_field_order_does_not_matter() {
        let a: RawListing = serde_json::from_str(
            r#"{"url":"https://x/1","model":"Ibiza","price":"300","contract":"36","usage":"Seminuevo"}"#,
        )
        .unwrap();
        let b: RawListing = serde_json::from_str(
            r#"{"usage":"Seminuevo","price":"300","contract":"36","url":"https://x/1","model":"Ibiza"}"#,
        )
        .unwrap();
        let prev = mk_prev(&[a]);
        let d = diff(&prev, &[b]);
        assert_eq!(d.unchanged.len(), 1);
        assert!(d.updated.is_empty());
    }
}
