//! Cross-run lead identity: cache keys, entries, and snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LeadCandidate, ScoredLead};

/// Stable identity of a lead across runs.
///
/// Derived from candidate fields by first-present priority: website domain,
/// then phone digits, then lowercased email, then normalized name+location.
/// Derivation is a pure function of those fields — identical inputs always
/// produce identical keys, regardless of run or timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a candidate.
    ///
    /// Two candidates with equal keys are the same lead. A key always
    /// exists because `company_name` is always present.
    #[must_use]
    pub fn derive(lead: &LeadCandidate) -> Self {
        if let Some(domain) = lead.website_value().map(normalize_domain) {
            if !domain.is_empty() {
                return Self::digest("domain", &domain);
            }
        }
        if let Some(digits) = lead.phone_value().map(phone_digits) {
            if !digits.is_empty() {
                return Self::digest("phone", &digits);
            }
        }
        if let Some(email) = lead.email_value() {
            let email = email.trim().to_lowercase();
            if !email.is_empty() {
                return Self::digest("email", &email);
            }
        }
        let name = lead.company_name.value.trim().to_lowercase();
        let location = lead
            .address_value()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Self::digest("name", &format!("{name}\x00{location}"))
    }

    /// Wraps an already-derived hex digest (e.g. loaded from the database).
    #[must_use]
    pub fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(class: &str, value: &str) -> Self {
        use sha2::{Digest, Sha256};
        let input = format!("{class}\x00{value}");
        Self(format!("{:x}", Sha256::digest(input.as_bytes())))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase host with scheme, `www.` prefix, path, and port stripped.
fn normalize_domain(url: &str) -> String {
    let without_scheme = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or_else(|| url.trim());
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("");
    host.strip_prefix("www.")
        .unwrap_or(host)
        .trim_end_matches('.')
        .to_lowercase()
}

/// Digits only; strips formatting so `(612) 555-0100` and `612.555.0100`
/// collapse to the same identity.
fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Canonical record for one lead identity, persisted across runs.
///
/// Mutated only by cache reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub lead: ScoredLead,
    pub first_seen_run: Uuid,
    pub last_seen_run: Uuid,
    pub hit_count: u64,
}

/// The evolving cache: one entry per lead identity.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub entries: HashMap<CacheKey, CacheEntry>,
}

impl CacheSnapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counters produced by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Incoming leads whose key already existed in the prior cache.
    pub hits: usize,
    /// Candidates merged away within the run before touching the cache.
    pub merged_in_run: usize,
    /// New identities added to the cache this run.
    pub new_entries: usize,
    /// Leads surviving dedup, in rank order.
    pub kept: usize,
}
