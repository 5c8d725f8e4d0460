use chrono::Utc;

use leadsearch_core::{LeadCandidate, Sourced};

use super::*;

fn candidate(name: &str, phone: Option<&str>, email: Option<&str>) -> LeadCandidate {
    LeadCandidate {
        company_name: Sourced::heuristic(name.to_string()),
        website: None,
        phone: phone.map(|v| Sourced::heuristic(v.to_string())),
        email: email.map(|v| Sourced::heuristic(v.to_string())),
        address: None,
        category: None,
        contact_name: None,
        contact_title: None,
        confidence: 0.5,
        source: "google_maps".to_string(),
        step_id: "google_maps-0".to_string(),
        source_url: None,
        captured_at: Utc::now(),
        extraction_order: 0,
    }
}

fn scored(lead: LeadCandidate, score: f64, rank: usize) -> ScoredLead {
    ScoredLead {
        lead,
        score,
        rank: Some(rank),
        disqualified: false,
        disqualification_reason: None,
        rationale: "has_phone".to_string(),
    }
}

fn run_id() -> Uuid {
    Uuid::new_v4()
}

#[test]
fn same_phone_different_formatting_merges_within_run() {
    let a = scored(
        candidate("Acme Plumbing", Some("(612) 555-0101"), None),
        0.7,
        0,
    );
    let b = scored(
        candidate(
            "ACME PLUMBING",
            Some("612.555.0101"),
            Some("info@acme.com"),
        ),
        0.6,
        1,
    );

    let outcome = reconcile(vec![a, b], CacheSnapshot::default(), run_id());

    assert_eq!(outcome.deduped.len(), 1);
    assert_eq!(outcome.stats.merged_in_run, 1);
    assert_eq!(outcome.stats.new_entries, 1);
    let survivor = &outcome.deduped[0];
    // First occurrence wins the name; the absent email is filled in.
    assert_eq!(survivor.lead.company_name.value, "Acme Plumbing");
    assert_eq!(survivor.lead.email_value(), Some("info@acme.com"));
}

#[test]
fn conflicting_fields_keep_first_seen_value() {
    let a = scored(
        candidate("Acme", Some("(612) 555-0101"), Some("first@acme.com")),
        0.7,
        0,
    );
    let b = scored(
        candidate("Acme", Some("612-555-0101"), Some("second@acme.com")),
        0.6,
        1,
    );

    let outcome = reconcile(vec![a, b], CacheSnapshot::default(), run_id());
    assert_eq!(outcome.deduped[0].lead.email_value(), Some("first@acme.com"));
}

#[test]
fn strictly_higher_confidence_replaces_cached_entry() {
    let run_a = run_id();
    let run_b = run_id();

    let first = reconcile(
        vec![scored(candidate("Acme", Some("(612) 555-0101"), None), 0.6, 0)],
        CacheSnapshot::default(),
        run_a,
    );

    let mut better = candidate("Acme Plumbing Inc", Some("612 555 0101"), None);
    better.confidence = 0.9;
    let second = reconcile(vec![scored(better, 0.8, 0)], first.cache, run_b);

    assert_eq!(second.stats.hits, 1);
    let entry = second.cache.entries.values().next().unwrap();
    assert_eq!(entry.lead.lead.company_name.value, "Acme Plumbing Inc");
    assert_eq!(entry.first_seen_run, run_a);
    assert_eq!(entry.last_seen_run, run_b);
    assert_eq!(entry.hit_count, 2);
}

#[test]
fn equal_confidence_keeps_existing_entry() {
    let run_a = run_id();
    let run_b = run_id();

    let first = reconcile(
        vec![scored(candidate("Acme", Some("(612) 555-0101"), None), 0.6, 0)],
        CacheSnapshot::default(),
        run_a,
    );
    let second = reconcile(
        vec![scored(
            candidate("Different Name", Some("612 555 0101"), None),
            0.6,
            0,
        )],
        first.cache,
        run_b,
    );

    let entry = second.cache.entries.values().next().unwrap();
    assert_eq!(entry.lead.lead.company_name.value, "Acme");
    assert_eq!(entry.last_seen_run, run_b);
    assert_eq!(entry.hit_count, 2);
    // The canonical entry is what surfaces in the deduped output.
    assert_eq!(second.deduped[0].lead.company_name.value, "Acme");
}

#[test]
fn surviving_cached_entries_get_renumbered_ranks() {
    let run_a = run_id();
    let run_b = run_id();

    let mut strong = candidate("Acme", Some("(612) 555-0101"), None);
    strong.confidence = 0.9;
    let first = reconcile(vec![scored(strong, 0.8, 0)], CacheSnapshot::default(), run_a);

    // Second run: a new lead ranks first and a weaker Acme sighting second,
    // so the stored Acme entry (rank 0 when it was cached) surfaces.
    let leads = vec![
        scored(
            candidate("Duluth Drains", Some("(218) 555-0202"), None),
            0.9,
            0,
        ),
        scored(candidate("Acme Plumbing", Some("612 555 0101"), None), 0.6, 1),
    ];
    let second = reconcile(leads, first.cache, run_b);

    assert_eq!(second.deduped[0].lead.company_name.value, "Duluth Drains");
    assert_eq!(second.deduped[1].lead.company_name.value, "Acme");
    let ranks: Vec<Option<usize>> = second.deduped.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, [Some(0), Some(1)]);
}

#[test]
fn deduped_preserves_rank_order() {
    let leads = vec![
        scored(candidate("Best", None, Some("best@x.com")), 0.9, 0),
        scored(candidate("Mid", Some("(612) 555-0102"), None), 0.5, 1),
        scored(candidate("Last", Some("(612) 555-0103"), None), 0.3, 2),
    ];
    let outcome = reconcile(leads, CacheSnapshot::default(), run_id());
    let names: Vec<&str> = outcome
        .deduped
        .iter()
        .map(|s| s.lead.company_name.value.as_str())
        .collect();
    assert_eq!(names, ["Best", "Mid", "Last"]);
    assert_eq!(outcome.stats.kept, 3);
}

#[test]
fn reconcile_is_idempotent_on_its_own_output() {
    let leads = vec![
        scored(candidate("Acme", Some("(612) 555-0101"), None), 0.7, 0),
        scored(candidate("Duluth Drains", Some("(218) 555-0202"), None), 0.5, 1),
    ];
    let first = reconcile(leads, CacheSnapshot::default(), run_id());
    let second = reconcile(first.deduped.clone(), first.cache, run_id());

    assert_eq!(second.deduped.len(), first.deduped.len());
    assert_eq!(second.cache.len(), 2);
    assert_eq!(second.stats.new_entries, 0);
    assert_eq!(second.stats.hits, 2);
    for (a, b) in first.deduped.iter().zip(&second.deduped) {
        assert_eq!(a.lead.company_name.value, b.lead.company_name.value);
        assert!((a.score - b.score).abs() < f64::EPSILON);
    }
}
