// src/config.rs
//! Runtime configuration, all env-driven (with `.env` support via dotenvy at
//! the entrypoint). Every knob has a default so a bare `renting-radar` run
//! works against the conventional data/ layout.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Snapshot file written by the scraping collaborator.
    pub snapshot_path: PathBuf,
    /// Durable live cache (JSON array of listings).
    pub cache_path: PathBuf,
    /// Append-only archive of removed listings.
    pub archive_path: PathBuf,
    /// Listings per enrichment gateway call.
    pub enrich_batch_size: usize,
    /// Size of the ranked view handed to the report renderer. 0 = all.
    pub rank_top_n: usize,
    /// When set, keep running a pass every N seconds instead of once.
    pub watch_interval_secs: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            snapshot_path: std::env::var("LISTINGS_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/snapshot.json")),
            cache_path: std::env::var("LISTINGS_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/listings.json")),
            archive_path: std::env::var("LISTINGS_ARCHIVE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/removed_listings.json")),
            enrich_batch_size: std::env::var("ENRICH_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rank_top_n: std::env::var("RANK_TOP_N")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            watch_interval_secs: std::env::var("WATCH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn defaults_apply_without_env() {
        for var in [
            "LISTINGS_SNAPSHOT_PATH",
            "LISTINGS_CACHE_PATH",
            "LISTINGS_ARCHIVE_PATH",
            "ENRICH_BATCH_SIZE",
            "RANK_TOP_N",
            "WATCH_INTERVAL_SECS",
        ] {
            std::env::remove_var(var);
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.cache_path, PathBuf::from("data/listings.json"));
        assert_eq!(cfg.enrich_batch_size, 10);
        assert_eq!(cfg.rank_top_n, 3);
        assert!(cfg.watch_interval_secs.is_none());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_win() {
        std::env::set_var("ENRICH_BATCH_SIZE", "4");
        std::env::set_var("WATCH_INTERVAL_SECS", "900");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.enrich_batch_size, 4);
        assert_eq!(cfg.watch_interval_secs, Some(900));
        std::env::remove_var("ENRICH_BATCH_SIZE");
        std::env::remove_var("WATCH_INTERVAL_SECS");
    }
}
