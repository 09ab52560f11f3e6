//! Listing model: raw scraped records, the tracked `Listing`, and merge semantics.
//!
//! Fingerprint fields are the cheap, directly observed attributes used only to
//! detect change. Everything expensive lives in `details` and is produced by the
//! enrichment gateway.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record as emitted by the scraping collaborator. Unknown keys are kept in
/// `extra` so nothing observed upstream is lost on the way into the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawListing {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub contract: String,
    #[serde(default)]
    pub usage: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The fixed subset of cheap attributes compared to classify a sighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Fingerprint {
    pub model: String,
    pub price: String,
    pub contract: String,
    pub usage: String,
}

impl Fingerprint {
    pub fn of(raw: &RawListing) -> Self {
        Self {
            model: raw.model.clone(),
            price: raw.price.clone(),
            contract: raw.contract.clone(),
            usage: raw.usage.clone(),
        }
    }
}

/// Transient per-pass classification. Never persisted: the durable form carries
/// no status and it is derived fresh by diffing each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    New,
    Updated,
    #[default]
    Unchanged,
    Removed,
}

/// A tracked listing in the live cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: String,
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    /// Enriched fields, schema owned by the gateway. Merged wholesale: the last
    /// successful enrichment wins for every key it supplies, the rest survive.
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    pub status: ChangeStatus,
    pub last_seen_at: DateTime<Utc>,
    /// Set on the first successful enrichment merge. A live entry where this
    /// is still `None` classifies `New` again next pass so enrichment retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn from_raw(id: String, raw: &RawListing, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fingerprint: Fingerprint::of(raw),
            details: raw.extra.clone(),
            status: ChangeStatus::New,
            last_seen_at: now,
            enriched_at: None,
            removed_at: None,
        }
    }

    /// `true` when the cheap observed attributes differ from this listing.
    pub fn fingerprint_differs(&self, raw: &RawListing) -> bool {
        self.fingerprint != Fingerprint::of(raw)
    }

    /// Numeric detail accessor used by the ranking engine.
    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(|v| v.as_f64())
    }
}

/// Extract a numeric monthly price from a scraped Spanish price string such as
/// "1.234,50 € al mes". Dots are thousand separators, the comma is the decimal
/// mark. Returns `None` when no number is present.
pub fn parse_price_eur(price: &str) -> Option<f64> {
    static RE_PRICE: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_PRICE
        .get_or_init(|| regex::Regex::new(r"\d+(?:\.\d{3})*(?:,\d+)?").unwrap());
    let m = re.find(price)?;
    m.as_str().replace('.', "").replace(',', ".").parse().ok()
}

/// Non-destructive field merge: keys present in `incoming` overwrite, all other
/// keys of `target` survive. Order-independent with respect to the keys it does
/// not mention, which is the whole point versus a map-literal spread.
pub fn merge_details(
    target: &mut BTreeMap<String, serde_json::Value>,
    incoming: BTreeMap<String, serde_json::Value>,
) {
    for (k, v) in incoming {
        target.insert(k, v);
    }
}
