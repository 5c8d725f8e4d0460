//! Core data model for the lead search pipeline.
//!
//! Everything that flows between the planner, orchestrator, extractor,
//! scorer, and cache manager is defined here so the stage crates share one
//! vocabulary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorRecord;

/// One unit of scraping work: a single (source, query, page) fetch.
///
/// Steps are produced by the planner grouped by source, then by
/// keyword×location, then by ascending page. Within a source that ordering
/// is a contract: later pages may depend on pagination state established by
/// earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyStep {
    pub source: String,
    pub query: String,
    pub location: Option<String>,
    /// 1-based page index within this query.
    pub page: u32,
    /// Politeness delay applied before this step's fetch.
    pub throttle: Duration,
    /// Selects the heuristic parser for artifacts produced by this step.
    pub parser_hint: String,
    /// Deterministic within a run: `{source}-{seq}`.
    pub step_id: String,
}

/// Outcome class of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Blocked,
    Timeout,
    Error,
    Skipped,
}

/// The raw result of one attempted step. Exactly one artifact exists per
/// attempted step; failure artifacts carry no content.
#[derive(Debug, Clone)]
pub struct ScrapeArtifact {
    pub source: String,
    pub step_id: String,
    pub status: FetchStatus,
    pub html: Option<String>,
    pub json_blob: Option<serde_json::Value>,
    pub screenshot_path: Option<String>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Wall-clock fetch duration in milliseconds (0 for skipped steps).
    pub fetch_ms: u64,
}

impl ScrapeArtifact {
    /// True when the artifact has content worth parsing.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// Builds a contentless artifact for a step that failed or was skipped.
    #[must_use]
    pub fn failure(step: &StrategyStep, status: FetchStatus, error: impl Into<String>) -> Self {
        Self {
            source: step.source.clone(),
            step_id: step.step_id.clone(),
            status,
            html: None,
            json_blob: None,
            screenshot_path: None,
            error: Some(error.into()),
            fetched_at: Utc::now(),
            fetch_ms: 0,
        }
    }
}

/// Which extraction path produced a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Heuristic,
    Llm,
}

/// A field value tagged with the extraction path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Sourced<T> {
    pub fn heuristic(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Heuristic,
        }
    }

    pub fn llm(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Llm,
        }
    }
}

/// A normalized lead extracted from one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadCandidate {
    pub company_name: Sourced<String>,
    pub website: Option<Sourced<String>>,
    pub phone: Option<Sourced<String>>,
    pub email: Option<Sourced<String>>,
    pub address: Option<Sourced<String>>,
    pub category: Option<Sourced<String>>,
    pub contact_name: Option<Sourced<String>>,
    pub contact_title: Option<Sourced<String>>,
    /// Extraction confidence in [0.0, 1.0].
    pub confidence: f64,
    pub source: String,
    /// Step that produced the artifact this candidate came from.
    pub step_id: String,
    pub source_url: Option<String>,
    pub captured_at: DateTime<Utc>,
    /// Position in the original extraction stream; the scorer's tie-break.
    pub extraction_order: usize,
}

impl LeadCandidate {
    #[must_use]
    pub fn website_value(&self) -> Option<&str> {
        self.website.as_ref().map(|s| s.value.as_str())
    }

    #[must_use]
    pub fn phone_value(&self) -> Option<&str> {
        self.phone.as_ref().map(|s| s.value.as_str())
    }

    #[must_use]
    pub fn email_value(&self) -> Option<&str> {
        self.email.as_ref().map(|s| s.value.as_str())
    }

    #[must_use]
    pub fn address_value(&self) -> Option<&str> {
        self.address.as_ref().map(|s| s.value.as_str())
    }

    #[must_use]
    pub fn category_value(&self) -> Option<&str> {
        self.category.as_ref().map(|s| s.value.as_str())
    }
}

/// A candidate wrapped with its score and rank within the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLead {
    pub lead: LeadCandidate,
    pub score: f64,
    /// Rank among qualified leads (0 = best). `None` when disqualified.
    pub rank: Option<usize>,
    pub disqualified: bool,
    pub disqualification_reason: Option<String>,
    pub rationale: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub steps_planned: usize,
    pub artifacts: usize,
    pub leads_raw: usize,
    pub leads_scored: usize,
    pub cache_hits: usize,
}

/// Metadata describing one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub sources_attempted: Vec<String>,
    pub errors: Vec<ErrorRecord>,
    pub stats: RunStats,
}

impl RunMetadata {
    /// Starts metadata for a new run with a fresh v4 run id.
    #[must_use]
    pub fn begin(sources_attempted: Vec<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            sources_attempted,
            errors: Vec::new(),
            stats: RunStats::default(),
        }
    }
}
