use chrono::Utc;
use uuid::Uuid;

use leadsearch_core::{
    CacheEntry, CacheKey, CacheSnapshot, LeadCandidate, RunMetadata, ScoredLead, Sourced,
    StorageSettings,
};
use leadsearch_pipeline::PersistenceSink;

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

fn scored(lead: LeadCandidate) -> ScoredLead {
    ScoredLead {
        lead,
        score: 0.7,
        rank: Some(0),
        disqualified: false,
        disqualification_reason: None,
        rationale: "has_phone".to_string(),
    }
}

fn snapshot(leads: &[ScoredLead], first_seen: Uuid, last_seen: Uuid, hit_count: u64) -> CacheSnapshot {
    let mut cache = CacheSnapshot::default();
    for lead in leads {
        let key = CacheKey::derive(&lead.lead);
        cache.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                lead: lead.clone(),
                first_seen_run: first_seen,
                last_seen_run: last_seen,
                hit_count,
            },
        );
    }
    cache
}

fn metadata(run_id: Uuid) -> RunMetadata {
    let mut metadata = RunMetadata::begin(vec!["google_maps".to_string()]);
    metadata.run_id = run_id;
    metadata.ended_at = Some(Utc::now());
    metadata
}

async fn mem_store() -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    store.ensure_schema().await.unwrap();
    store
}

#[tokio::test]
async fn schema_creation_is_idempotent() {
    let store = mem_store().await;
    store.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn commit_then_read_cache_round_trips() {
    let store = mem_store().await;
    let run_id = Uuid::new_v4();
    let leads = vec![scored(candidate(
        "Acme Plumbing",
        Some("(612) 555-0101"),
        None,
    ))];
    let cache = snapshot(&leads, run_id, run_id, 1);

    let receipt = store.commit_run(&leads, &metadata(run_id), &cache).await.unwrap();
    assert_eq!(receipt.rows_written, 1);
    assert!(receipt.json_path.is_none());

    let loaded = store.read_cache().await.unwrap();
    assert_eq!(loaded.len(), 1);
    let entry = loaded.entries.values().next().unwrap();
    assert_eq!(entry.lead.lead.company_name.value, "Acme Plumbing");
    assert_eq!(entry.hit_count, 1);
    assert_eq!(entry.first_seen_run, run_id);
}

#[tokio::test]
async fn reseen_lead_bumps_times_seen_and_fills_missing_email() {
    let store = mem_store().await;
    let first_run = Uuid::new_v4();
    let second_run = Uuid::new_v4();

    let first = vec![scored(candidate("Acme", Some("(612) 555-0101"), None))];
    let first_cache = snapshot(&first, first_run, first_run, 1);
    store.commit_run(&first, &metadata(first_run), &first_cache).await.unwrap();

    // Same phone, so the same cache key, now carrying an email.
    let second = vec![scored(candidate(
        "Acme",
        Some("612.555.0101"),
        Some("info@acme.com"),
    ))];
    let second_cache = snapshot(&second, first_run, second_run, 2);
    store.commit_run(&second, &metadata(second_run), &second_cache).await.unwrap();

    let key = CacheKey::derive(&second[0].lead);
    let (times_seen, email, first_seen): (i64, Option<String>, String) = sqlx::query_as(
        "SELECT times_seen, email, first_seen_run FROM leads WHERE cache_key = $1",
    )
    .bind(key.as_str())
    .fetch_one(&store.pool)
    .await
    .unwrap();

    assert_eq!(times_seen, 2);
    assert_eq!(email.as_deref(), Some("info@acme.com"));
    assert_eq!(first_seen, first_run.to_string());
}

#[tokio::test]
async fn known_fields_survive_a_null_reobservation() {
    let store = mem_store().await;
    let first_run = Uuid::new_v4();
    let second_run = Uuid::new_v4();

    let first = vec![scored(candidate(
        "Acme",
        Some("(612) 555-0101"),
        Some("info@acme.com"),
    ))];
    let first_cache = snapshot(&first, first_run, first_run, 1);
    store.commit_run(&first, &metadata(first_run), &first_cache).await.unwrap();

    let second = vec![scored(candidate("Acme", Some("(612) 555-0101"), None))];
    let second_cache = snapshot(&second, first_run, second_run, 2);
    store.commit_run(&second, &metadata(second_run), &second_cache).await.unwrap();

    let key = CacheKey::derive(&second[0].lead);
    let email: Option<String> =
        sqlx::query_scalar("SELECT email FROM leads WHERE cache_key = $1")
            .bind(key.as_str())
            .fetch_one(&store.pool)
            .await
            .unwrap();
    assert_eq!(email.as_deref(), Some("info@acme.com"));
}

#[tokio::test]
async fn every_run_gets_a_log_row() {
    let store = mem_store().await;
    let cache = CacheSnapshot::default();
    store.commit_run(&[], &metadata(Uuid::new_v4()), &cache).await.unwrap();
    store.commit_run(&[], &metadata(Uuid::new_v4()), &cache).await.unwrap();

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    assert_eq!(runs, 2);
}

#[tokio::test]
async fn empty_cache_table_loads_an_empty_snapshot() {
    let store = mem_store().await;
    let loaded = store.read_cache().await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn json_export_lands_next_to_the_database() {
    let dir = std::env::temp_dir().join(format!("leadsearch-db-test-{}", Uuid::new_v4()));
    let storage = StorageSettings {
        sqlite_path: dir.join("leads.db").to_string_lossy().into_owned(),
        json_export: true,
        json_path: None,
    };
    let store = SqliteStore::connect(&storage).await.unwrap();
    store.ensure_schema().await.unwrap();

    let run_id = Uuid::new_v4();
    let leads = vec![scored(candidate("Acme", Some("(612) 555-0101"), None))];
    let cache = snapshot(&leads, run_id, run_id, 1);
    let receipt = store.persist(&leads, &metadata(run_id), &cache).await.unwrap();

    let json_path = receipt.json_path.expect("export path");
    assert!(json_path.ends_with("leads.json"));
    let exported: Vec<ScoredLead> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].lead.company_name.value, "Acme");

    drop(store);
    let _ = std::fs::remove_dir_all(&dir);
}
