//! The run coordinator: plan, scrape, extract, score, reconcile, persist.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use leadsearch_core::{
    AppConfig, CacheSnapshot, CacheStats, ErrorRecord, RunMetadata, ScoredLead, SearchRequest,
    Stage,
};
use leadsearch_extract::{Extractor, ParserRegistry};
use leadsearch_llm::LlmCapability;
use leadsearch_scraper::{
    execute, plan, AntiDetectionConfig, CancelFlag, FetchCapability, FetchOptions, RetryPolicy,
    SourceRegistry,
};

use crate::cache::reconcile;
use crate::error::RunError;
use crate::scorer::{add_llm_rationales, score, ScoreWeights};
use crate::sink::{PersistReceipt, PersistenceSink};

/// Everything a run needs injected: the external capabilities and the
/// process configuration.
pub struct RunDeps {
    pub fetcher: Arc<dyn FetchCapability>,
    /// Absent when no LLM is configured; the pipeline then runs
    /// heuristic-only regardless of the request.
    pub llm: Option<Arc<dyn LlmCapability>>,
    pub sink: Arc<dyn PersistenceSink>,
    pub config: AppConfig,
    /// Cloned by the caller to cancel a run in flight.
    pub cancel: CancelFlag,
}

/// The always-returned result object: even a run where every fetch failed
/// produces metadata, an error log, and an (empty) lead list.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub metadata: RunMetadata,
    pub leads: Vec<ScoredLead>,
    pub cache_stats: CacheStats,
    /// `None` when the final commit did not happen (dry paths, commit
    /// failure).
    pub persistence: Option<PersistReceipt>,
}

/// Executes one full run.
///
/// Stage errors accumulate on the run's error log and never abort the run.
/// The fatal classes are planning configuration errors (before any network
/// activity) and a failed final commit, which surfaces the in-memory
/// results inside the error.
///
/// # Errors
///
/// Returns [`RunError::Plan`] for fatal planning configuration problems and
/// [`RunError::Persist`] when the final commit fails.
pub async fn run(request: &SearchRequest, deps: &RunDeps) -> Result<RunOutcome, RunError> {
    let config = &deps.config;
    let registry = SourceRegistry::builtin((config.throttle_min_ms, config.throttle_max_ms));
    let mut metadata = RunMetadata::begin(request.sources.clone());
    tracing::info!(
        run_id = %metadata.run_id,
        keywords = request.keywords.len(),
        sources = request.sources.len(),
        "run started"
    );

    let planned = plan(request, &registry)?;
    metadata.stats.steps_planned = planned.steps.len();
    metadata.errors.extend(planned.errors);

    let parser_hints: HashMap<String, String> = planned
        .steps
        .iter()
        .map(|s| (s.step_id.clone(), s.parser_hint.clone()))
        .collect();

    let mut anti_detection = AntiDetectionConfig::with_enabled(request.anti_detection);
    anti_detection.user_agent = config.user_agent.clone();
    let fetch_options = FetchOptions {
        anti_detection,
        page_timeout: Duration::from_secs(request.timeout_seconds),
        capture_screenshots: request.capture_screenshots,
    };
    let policy = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
        backoff_multiplier: config.retry_backoff_multiplier,
        ..RetryPolicy::default()
    };

    let scraped = execute(
        planned.steps,
        Arc::clone(&deps.fetcher),
        fetch_options,
        policy,
        config.worker_pool_size,
        deps.cancel.clone(),
    )
    .await;
    metadata.stats.artifacts = scraped.artifacts.len();
    metadata.errors.extend(scraped.errors);

    let llm = deps
        .llm
        .as_ref()
        .filter(|_| request.use_llm_extraction)
        .map(Arc::clone);
    let mut extractor = Extractor::new(ParserRegistry::builtin());
    if let Some(llm) = &llm {
        extractor = extractor.with_llm(Arc::clone(llm));
    }

    let extracted = extractor.extract_all(&scraped.artifacts, &parser_hints).await;
    metadata.stats.leads_raw = extracted.candidates.len();
    metadata.errors.extend(extracted.errors);

    let mut scored = score(extracted.candidates, &request.filters, &ScoreWeights::default());
    metadata.stats.leads_scored = scored.len();

    if let Some(llm) = &llm {
        let rationale_errors = add_llm_rationales(&mut scored, llm.as_ref()).await;
        metadata.errors.extend(rationale_errors);
    }

    // A missing prior cache degrades to a first-run snapshot; only the
    // final commit is fatal.
    let prior = match deps.sink.load_cache().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "prior cache unavailable, starting empty");
            metadata.errors.push(ErrorRecord::new(
                Stage::Cache,
                None,
                "cache_load",
                e.to_string(),
            ));
            CacheSnapshot::default()
        }
    };

    let reconciled = reconcile(scored, prior, metadata.run_id);
    metadata.stats.cache_hits = reconciled.stats.hits;

    let mut leads = reconciled.deduped;
    leads.truncate(request.max_results);
    metadata.ended_at = Some(Utc::now());

    tracing::info!(
        run_id = %metadata.run_id,
        leads = leads.len(),
        errors = metadata.errors.len(),
        "run finished, committing"
    );

    match deps.sink.persist(&leads, &metadata, &reconciled.cache).await {
        Ok(receipt) => Ok(RunOutcome {
            metadata,
            leads,
            cache_stats: reconciled.stats,
            persistence: Some(receipt),
        }),
        Err(error) => Err(RunError::Persist {
            error,
            outcome: Box::new(RunOutcome {
                metadata,
                leads,
                cache_stats: reconciled.stats,
                persistence: None,
            }),
        }),
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
