// src/identity.rs
//! Stable identity for listings: the canonical form of the listing URL.
//!
//! The key must be identical across runs for the same listing, otherwise the
//! differ would classify every sighting as new. Canonicalization is therefore
//! deliberately conservative: trim, drop the fragment, drop a trailing slash.

use thiserror::Error;

use crate::listing::RawListing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("raw listing has no usable url")]
    MissingLocator,
}

/// Derive the stable cache key for a raw listing.
///
/// Records that fail here cannot be tracked at all: the caller counts them as
/// skipped and excludes them from both diffing and removal detection.
pub fn resolve(raw: &RawListing) -> Result<String, IdentityError> {
    canonicalize(&raw.url)
}

pub fn canonicalize(url: &str) -> Result<String, IdentityError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::MissingLocator);
    }
    let without_fragment = match trimmed.split_once('#') {
        Some((head, _)) => head,
        None => trimmed,
    };
    let canonical = without_fragment.trim_end_matches('/');
    if canonical.is_empty() {
        return Err(IdentityError::MissingLocator);
    }
    Ok(canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn raw_with_url(url: &str) -> RawListing {
        RawListing {
            url: url.to_string(),
            model: String::new(),
            price: String::new(),
            contract: String::new(),
            usage: String::new(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn canonical_form_is_stable() {
        let a = resolve(&raw_with_url("https://example.com/leasing/ald/123")).unwrap();
        let b = resolve(&raw_with_url("  https://example.com/leasing/ald/123/ ")).unwrap();
        let c = resolve(&raw_with_url("https://example.com/leasing/ald/123#photos")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn empty_locator_is_an_error() {
        assert_eq!(
            resolve(&raw_with_url("")),
            Err(IdentityError::MissingLocator)
        );
        assert_eq!(
            resolve(&raw_with_url("   ")),
            Err(IdentityError::MissingLocator)
        );
        // A bare slash collapses to nothing; still untrackable.
        assert_eq!(
            resolve(&raw_with_url("/")),
            Err(IdentityError::MissingLocator)
        );
    }
}
