// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod archive;
pub mod cache;
pub mod config;
pub mod diff;
pub mod identity;
pub mod listing;
pub mod rank;
pub mod reconcile;
pub mod report;
pub mod snapshot;

// Enrichment gateway boundary (trait + OpenAI/mock providers)
pub mod enrich;

// Report delivery
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::cache::{CacheError, ListingCache};
pub use crate::config::AppConfig;
pub use crate::enrich::{EnrichmentGateway, EnrichmentOutcome, SharedGateway};
pub use crate::identity::IdentityError;
pub use crate::listing::{ChangeStatus, Listing, RawListing};
pub use crate::reconcile::{PassOutcome, PassSummary, Reconciler};
