//! Cross-run reconciliation of scored leads against the lead cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use uuid::Uuid;

use leadsearch_core::{CacheEntry, CacheKey, CacheSnapshot, CacheStats, ScoredLead, Sourced};

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Surviving leads in scorer rank order, ranks renumbered for this run.
    pub deduped: Vec<ScoredLead>,
    /// The updated cache, ready to persist.
    pub cache: CacheSnapshot,
    pub stats: CacheStats,
}

/// Deduplicates scored leads within the run, then reconciles them against
/// the prior cache.
///
/// Within-run collisions are merged first (first occurrence wins conflicting
/// fields, absent optional fields are filled from later occurrences) so a
/// lead seen on three pages of one run does not inflate its own hit count.
/// Against the prior cache, the stored entry is replaced only when the
/// incoming confidence strictly exceeds the stored one; on equal confidence
/// the existing entry is kept. `hit_count` and `last_seen_run` advance
/// either way. This runs sequentially after all sources are collected; it is
/// the only writer of the snapshot.
#[must_use]
pub fn reconcile(scored: Vec<ScoredLead>, prior: CacheSnapshot, run_id: Uuid) -> ReconcileOutcome {
    let mut stats = CacheStats::default();

    // Phase 1: within-run merge, preserving scorer order.
    let mut order: Vec<CacheKey> = Vec::new();
    let mut merged: HashMap<CacheKey, ScoredLead> = HashMap::new();
    for lead in scored {
        let key = CacheKey::derive(&lead.lead);
        match merged.entry(key.clone()) {
            Entry::Occupied(mut existing) => {
                merge_within_run(existing.get_mut(), &lead);
                stats.merged_in_run += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(lead);
                order.push(key);
            }
        }
    }

    // Phase 2: reconcile against the prior cache.
    let mut cache = prior;
    let mut deduped = Vec::with_capacity(order.len());
    for key in order {
        let Some(incoming) = merged.remove(&key) else {
            continue;
        };
        match cache.entries.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                stats.hits += 1;
                let entry = slot.get_mut();
                entry.hit_count += 1;
                entry.last_seen_run = run_id;
                if incoming.lead.confidence > entry.lead.lead.confidence {
                    tracing::debug!(key = %key, "replacing cached lead with higher-confidence sighting");
                    entry.lead = incoming;
                }
                deduped.push(entry.lead.clone());
            }
            Entry::Vacant(slot) => {
                stats.new_entries += 1;
                slot.insert(CacheEntry {
                    key,
                    lead: incoming.clone(),
                    first_seen_run: run_id,
                    last_seen_run: run_id,
                    hit_count: 1,
                });
                deduped.push(incoming);
            }
        }
    }
    stats.kept = deduped.len();

    // A surviving cached entry carries the rank of the run that stored it;
    // renumber so this run's output ranks are contiguous.
    let mut rank = 0usize;
    for lead in &mut deduped {
        if lead.disqualified {
            lead.rank = None;
        } else {
            lead.rank = Some(rank);
            rank += 1;
        }
    }

    ReconcileOutcome {
        deduped,
        cache,
        stats,
    }
}

/// Fills absent optional fields of `keep` from `other`. Conflicting fields
/// keep their first-seen value.
fn merge_within_run(keep: &mut ScoredLead, other: &ScoredLead) {
    fill(&mut keep.lead.website, &other.lead.website);
    fill(&mut keep.lead.phone, &other.lead.phone);
    fill(&mut keep.lead.email, &other.lead.email);
    fill(&mut keep.lead.address, &other.lead.address);
    fill(&mut keep.lead.category, &other.lead.category);
    fill(&mut keep.lead.contact_name, &other.lead.contact_name);
    fill(&mut keep.lead.contact_title, &other.lead.contact_title);
    if keep.lead.source_url.is_none() {
        keep.lead.source_url = other.lead.source_url.clone();
    }
    keep.lead.confidence = keep.lead.confidence.max(other.lead.confidence);
}

fn fill(target: &mut Option<Sourced<String>>, from: &Option<Sourced<String>>) {
    if target.is_none() {
        *target = from.clone();
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
