// src/report.rs
//! Plain-text report of a finished pass: counts, ranked top-N, per-listing
//! lines. Email-ready; consumers get structured data from the cache, never by
//! re-parsing this text.

use chrono::Utc;

use crate::listing::{parse_price_eur, Listing};
use crate::rank::{NET_PROFIT_FIELD, SCORE_FIELD};
use crate::reconcile::PassOutcome;

pub fn render(outcome: &PassOutcome) -> String {
    let mut out = String::new();
    out.push_str("RENTING RADAR — ranked listings\n");
    out.push_str(&format!("Date: {}\n", Utc::now().format("%Y-%m-%d %H:%M UTC")));
    out.push_str(&format!("Pass: {}\n\n", outcome.summary));

    if outcome.ranked.is_empty() {
        out.push_str("No listings tracked.\n");
        return out;
    }

    for (i, listing) in outcome.ranked.iter().enumerate() {
        out.push_str(&render_listing(i + 1, listing));
        out.push('\n');
    }
    out
}

fn render_listing(position: usize, l: &Listing) -> String {
    let score = l
        .detail_f64(SCORE_FIELD)
        .map(|s| format!("{s:.0}/100"))
        .unwrap_or_else(|| "unscored".to_string());
    let profit = l
        .detail_f64(NET_PROFIT_FIELD)
        .map(|p| format!("{p:.0} EUR/month"))
        .unwrap_or_else(|| "n/a".to_string());
    let price = parse_price_eur(&l.fingerprint.price)
        .map(|p| format!("{p:.0} EUR/month"))
        .unwrap_or_else(|| l.fingerprint.price.clone());
    let rationale = l
        .details
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let mut s = format!(
        "#{position} {model} — score {score}, net profit {profit}\n   price {price} | {contract} | {usage}\n   {url}\n",
        model = l.fingerprint.model,
        url = l.id,
        contract = l.fingerprint.contract,
        usage = l.fingerprint.usage,
    );
    if !rationale.is_empty() {
        s.push_str(&format!("   {rationale}\n"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::RawListing;
    use crate::reconcile::PassSummary;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn mk_ranked(url: &str, score: f64) -> Listing {
        let raw = RawListing {
            url: url.to_string(),
            model: "Seat Ibiza".to_string(),
            price: "300 € al mes".to_string(),
            contract: "36 months".to_string(),
            usage: "Seminuevo".to_string(),
            extra: BTreeMap::new(),
        };
        let mut l = Listing::from_raw(url.to_string(), &raw, Utc::now());
        l.details.insert(SCORE_FIELD.to_string(), json!(score));
        l.details.insert(NET_PROFIT_FIELD.to_string(), json!(150.0));
        l.details
            .insert("rationale".to_string(), json!("Manual compact, high urban demand."));
        l
    }

    #[test]
    fn report_lists_ranked_entries_in_order() {
        let outcome = PassOutcome {
            summary: PassSummary {
                new: 1,
                ..Default::default()
            },
            ranked: vec![mk_ranked("https://x/1", 80.0), mk_ranked("https://x/2", 60.0)],
        };
        let text = render(&outcome);
        let first = text.find("#1 Seat Ibiza").unwrap();
        let second = text.find("#2 Seat Ibiza").unwrap();
        assert!(first < second);
        assert!(text.contains("score 80/100"));
        assert!(text.contains("https://x/1"));
        assert!(text.contains("new 1"));
    }

    #[test]
    fn empty_cache_renders_a_stub() {
        let outcome = PassOutcome {
            summary: PassSummary::default(),
            ranked: vec![],
        };
        assert!(render(&outcome).contains("No listings tracked."));
    }
}
