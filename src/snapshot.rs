// src/snapshot.rs
//! Snapshot input: the ordered sequence of raw listings produced by the
//! scraping collaborator. Either a JSON array or newline-delimited JSON
//! objects; the first non-whitespace byte decides which.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

use crate::listing::RawListing;

pub async fn load_snapshot(path: &Path) -> Result<Vec<RawListing>> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading snapshot from {}", path.display()))?;
    parse_snapshot(&text).with_context(|| format!("parsing snapshot {}", path.display()))
}

pub fn parse_snapshot(text: &str) -> Result<Vec<RawListing>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parsing JSON array snapshot");
    }
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let raw: RawListing = serde_json::from_str(line)
            .with_context(|| format!("parsing NDJSON snapshot line {}", lineno + 1))?;
        out.push(raw);
    }
    Ok(out)
}
