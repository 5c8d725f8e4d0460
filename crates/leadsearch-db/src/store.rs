//! Database operations for runs, leads, and the cross-run cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use uuid::Uuid;

use leadsearch_core::{CacheEntry, CacheKey, CacheSnapshot, RunMetadata, ScoredLead, StorageSettings};
use leadsearch_pipeline::{PersistReceipt, PersistenceSink, SinkError};

use crate::DbError;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Executed statement by statement; every statement is idempotent.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_uuid TEXT NOT NULL,
        started_at TEXT NOT NULL,
        ended_at TEXT,
        sources_attempted TEXT NOT NULL,
        errors TEXT NOT NULL,
        stats TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS leads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cache_key TEXT NOT NULL,
        times_seen INTEGER NOT NULL DEFAULT 1,
        first_seen_run TEXT NOT NULL,
        last_seen_run TEXT NOT NULL,
        company_name TEXT NOT NULL,
        website TEXT,
        phone TEXT,
        email TEXT,
        address TEXT,
        category TEXT,
        contact_name TEXT,
        contact_title TEXT,
        confidence REAL NOT NULL,
        source TEXT NOT NULL,
        source_url TEXT,
        score REAL NOT NULL,
        rank INTEGER,
        disqualified INTEGER NOT NULL DEFAULT 0,
        disqualification_reason TEXT,
        rationale TEXT NOT NULL,
        captured_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_leads_cache_key ON leads (cache_key)",
    "CREATE TABLE IF NOT EXISTS lead_cache (
        cache_key TEXT PRIMARY KEY,
        entry_json TEXT NOT NULL,
        hit_count INTEGER NOT NULL,
        last_seen_run TEXT NOT NULL
    )",
];

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// SQLite-backed persistence for run logs, deduplicated leads, and the
/// cross-run cache snapshot.
pub struct SqliteStore {
    pool: SqlitePool,
    db_path: String,
    json_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if missing) the database configured in `storage` and
    /// connects a pool to it. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] when the parent directory cannot be created
    /// and [`DbError::Sqlx`] when the database cannot be opened.
    pub async fn connect(storage: &StorageSettings) -> Result<Self, DbError> {
        let path = Path::new(&storage.sqlite_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        tracing::debug!(path = %storage.sqlite_path, "sqlite pool connected");
        Ok(Self {
            pool,
            db_path: storage.sqlite_path.clone(),
            json_path: json_export_path(storage),
        })
    }

    /// Connects to a private in-memory database. One connection only:
    /// every pooled connection would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] when the connection cannot be opened.
    pub async fn in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool,
            db_path: ":memory:".to_string(),
            json_path: None,
        })
    }

    /// Creates the tables and indexes if they do not exist yet. Safe to call
    /// on every startup.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] when a DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Writes one run's results in a single transaction: the run log row,
    /// lead upserts keyed by cache key, and the refreshed cache snapshot.
    /// The optional JSON export happens after the commit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] when any statement or the commit fails and
    /// [`DbError::Io`] when the JSON export cannot be written.
    pub async fn commit_run(
        &self,
        leads: &[ScoredLead],
        metadata: &RunMetadata,
        cache: &CacheSnapshot,
    ) -> Result<PersistReceipt, DbError> {
        let mut tx = self.pool.begin().await?;
        insert_run(&mut tx, metadata).await?;
        for lead in leads {
            upsert_lead(&mut tx, lead, metadata.run_id, cache).await?;
        }
        for entry in cache.entries.values() {
            upsert_cache_entry(&mut tx, entry).await?;
        }
        tx.commit().await?;

        let json_path = self.export_json(leads)?;
        tracing::info!(
            run_id = %metadata.run_id,
            rows = leads.len(),
            db = %self.db_path,
            "run committed"
        );
        Ok(PersistReceipt {
            rows_written: leads.len(),
            db_path: self.db_path.clone(),
            json_path,
        })
    }

    /// Loads the full cache snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] when the query fails and
    /// [`DbError::CorruptCacheEntry`] when a stored entry no longer parses.
    pub async fn read_cache(&self) -> Result<CacheSnapshot, DbError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT cache_key, entry_json FROM lead_cache")
                .fetch_all(&self.pool)
                .await?;
        let mut entries = HashMap::with_capacity(rows.len());
        for (key, json) in rows {
            let entry: CacheEntry =
                serde_json::from_str(&json).map_err(|e| DbError::CorruptCacheEntry {
                    key,
                    reason: e.to_string(),
                })?;
            entries.insert(entry.key.clone(), entry);
        }
        Ok(CacheSnapshot { entries })
    }

    fn export_json(&self, leads: &[ScoredLead]) -> Result<Option<String>, DbError> {
        let Some(path) = &self.json_path else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(leads)?)?;
        Ok(Some(path.to_string_lossy().into_owned()))
    }
}

/// Explicit `json_path` wins; bare `json_export` lands next to the database.
fn json_export_path(storage: &StorageSettings) -> Option<PathBuf> {
    if let Some(path) = &storage.json_path {
        return Some(PathBuf::from(path));
    }
    storage
        .json_export
        .then(|| Path::new(&storage.sqlite_path).with_extension("json"))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

async fn insert_run(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    metadata: &RunMetadata,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO runs (run_uuid, started_at, ended_at, sources_attempted, errors, stats)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(metadata.run_id.to_string())
    .bind(metadata.started_at)
    .bind(metadata.ended_at)
    .bind(serde_json::to_string(&metadata.sources_attempted)?)
    .bind(serde_json::to_string(&metadata.errors)?)
    .bind(serde_json::to_string(&metadata.stats)?)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Upsert keyed by cache key. A re-seen lead bumps `times_seen`, refreshes
/// the run pointer and scores, and fills still-missing optional fields
/// without clobbering known values.
async fn upsert_lead(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    lead: &ScoredLead,
    run_id: Uuid,
    cache: &CacheSnapshot,
) -> Result<(), DbError> {
    let key = CacheKey::derive(&lead.lead);
    let first_seen = cache
        .entries
        .get(&key)
        .map_or(run_id, |entry| entry.first_seen_run);

    sqlx::query(
        "INSERT INTO leads (
            cache_key, first_seen_run, last_seen_run,
            company_name, website, phone, email, address, category,
            contact_name, contact_title, confidence, source, source_url,
            score, rank, disqualified, disqualification_reason, rationale, captured_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        ON CONFLICT (cache_key) DO UPDATE SET
            times_seen = leads.times_seen + 1,
            last_seen_run = excluded.last_seen_run,
            company_name = excluded.company_name,
            website = COALESCE(excluded.website, leads.website),
            phone = COALESCE(excluded.phone, leads.phone),
            email = COALESCE(excluded.email, leads.email),
            address = COALESCE(excluded.address, leads.address),
            category = COALESCE(excluded.category, leads.category),
            contact_name = COALESCE(excluded.contact_name, leads.contact_name),
            contact_title = COALESCE(excluded.contact_title, leads.contact_title),
            confidence = excluded.confidence,
            source = excluded.source,
            source_url = COALESCE(excluded.source_url, leads.source_url),
            score = excluded.score,
            rank = excluded.rank,
            disqualified = excluded.disqualified,
            disqualification_reason = excluded.disqualification_reason,
            rationale = excluded.rationale,
            captured_at = excluded.captured_at",
    )
    .bind(key.as_str())
    .bind(first_seen.to_string())
    .bind(run_id.to_string())
    .bind(&lead.lead.company_name.value)
    .bind(lead.lead.website_value())
    .bind(lead.lead.phone_value())
    .bind(lead.lead.email_value())
    .bind(lead.lead.address_value())
    .bind(lead.lead.category_value())
    .bind(lead.lead.contact_name.as_ref().map(|s| s.value.as_str()))
    .bind(lead.lead.contact_title.as_ref().map(|s| s.value.as_str()))
    .bind(lead.lead.confidence)
    .bind(&lead.lead.source)
    .bind(lead.lead.source_url.as_deref())
    .bind(lead.score)
    .bind(lead.rank.and_then(|r| i64::try_from(r).ok()))
    .bind(lead.disqualified)
    .bind(lead.disqualification_reason.as_deref())
    .bind(&lead.rationale)
    .bind(lead.lead.captured_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_cache_entry(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    entry: &CacheEntry,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO lead_cache (cache_key, entry_json, hit_count, last_seen_run)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (cache_key) DO UPDATE SET
            entry_json = excluded.entry_json,
            hit_count = excluded.hit_count,
            last_seen_run = excluded.last_seen_run",
    )
    .bind(entry.key.as_str())
    .bind(serde_json::to_string(entry)?)
    .bind(i64::try_from(entry.hit_count).unwrap_or(i64::MAX))
    .bind(entry.last_seen_run.to_string())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[async_trait]
impl PersistenceSink for SqliteStore {
    async fn persist(
        &self,
        leads: &[ScoredLead],
        metadata: &RunMetadata,
        cache: &CacheSnapshot,
    ) -> Result<PersistReceipt, SinkError> {
        self.commit_run(leads, metadata, cache)
            .await
            .map_err(|e| SinkError::Storage(e.to_string()))
    }

    async fn load_cache(&self) -> Result<CacheSnapshot, SinkError> {
        self.read_cache()
            .await
            .map_err(|e| SinkError::Storage(e.to_string()))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
