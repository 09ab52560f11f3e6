// src/rank.rs
//! Ranking: a pure function of the cache contents.
//!
//! Ordering: descending by the numeric `score` enrichment field; ties broken
//! descending by `net_profit_eur`; listings missing either field sort last,
//! ordered among themselves by `last_seen_at` descending. No side effects, so
//! report rendering can call this as often as it likes without re-triggering
//! enrichment.

use std::cmp::Ordering;

use crate::listing::Listing;

/// Enrichment field holding the 0–100 profitability score.
pub const SCORE_FIELD: &str = "score";
/// Enrichment field holding the estimated monthly net profit in EUR.
pub const NET_PROFIT_FIELD: &str = "net_profit_eur";

/// Return the top `n` listings in rank order. `n == 0` means "all".
pub fn rank(mut listings: Vec<Listing>, n: usize) -> Vec<Listing> {
    listings.sort_by(compare);
    if n > 0 {
        listings.truncate(n);
    }
    listings
}

fn compare(a: &Listing, b: &Listing) -> Ordering {
    let ka = sort_key(a);
    let kb = sort_key(b);
    match (ka, kb) {
        (Some((sa, pa)), Some((sb, pb))) => sb
            .partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then(pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)),
        // Scored listings always beat unscored ones.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.last_seen_at.cmp(&a.last_seen_at),
    }
}

fn sort_key(l: &Listing) -> Option<(f64, f64)> {
    let score = l.detail_f64(SCORE_FIELD)?;
    let profit = l.detail_f64(NET_PROFIT_FIELD)?;
    Some((score, profit))
}
