//! Scrape orchestration: executes planned steps against the fetch capability.
//!
//! Sources run as independent concurrent tasks over a bounded worker pool;
//! within one source, steps run strictly in order because later pages depend
//! on pagination state established by earlier ones. Every attempted step
//! yields exactly one artifact, failure or not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::sync::Semaphore;

use leadsearch_core::{ErrorRecord, FetchStatus, ScrapeArtifact, Stage, StrategyStep};

use crate::error::FetchError;
use crate::fetch::{FetchCapability, FetchOptions};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Cooperative cancellation for a run.
///
/// Cancelling ceases scheduling of new steps; in-flight fetches complete or
/// time out on their own.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Artifacts plus the non-fatal errors accumulated while producing them.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub artifacts: Vec<ScrapeArtifact>,
    pub errors: Vec<ErrorRecord>,
}

/// Executes all steps. Artifacts come back grouped by source in plan order.
///
/// Failure handling per source:
/// - disallowed by politeness: step skipped and recorded, never retried;
/// - transient errors retried per `policy`, exhaustion yields a failure
///   artifact and processing continues with the next step;
/// - interactive challenge: remaining pages of the source abandoned, one
///   error record, collected artifacts preserved;
/// - capability unavailable: remaining steps of that source aborted; other
///   sources are unaffected.
pub async fn execute(
    steps: Vec<StrategyStep>,
    fetcher: Arc<dyn FetchCapability>,
    options: FetchOptions,
    policy: RetryPolicy,
    worker_pool_size: usize,
    cancel: CancelFlag,
) -> ScrapeOutcome {
    let semaphore = Arc::new(Semaphore::new(worker_pool_size.max(1)));
    let mut handles = Vec::new();

    for (source, source_steps) in group_by_source(steps) {
        let fetcher = Arc::clone(&fetcher);
        let options = options.clone();
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        handles.push((
            source,
            tokio::spawn(async move {
                // Closed only if the semaphore is dropped, which never happens
                // while tasks hold a clone.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore closed while tasks are running");
                run_source(source_steps, &*fetcher, &options, policy, &cancel).await
            }),
        ));
    }

    let mut outcome = ScrapeOutcome::default();
    for (source, handle) in handles {
        match handle.await {
            Ok((artifacts, errors)) => {
                outcome.artifacts.extend(artifacts);
                outcome.errors.extend(errors);
            }
            Err(e) => {
                tracing::error!(source = %source, error = %e, "source scrape task panicked");
                outcome.errors.push(ErrorRecord::new(
                    Stage::Scrape,
                    Some(&source),
                    "task_failure",
                    e.to_string(),
                ));
            }
        }
    }
    outcome
}

/// Groups steps by source, preserving plan order of sources and of steps
/// within each source.
fn group_by_source(steps: Vec<StrategyStep>) -> Vec<(String, Vec<StrategyStep>)> {
    let mut groups: Vec<(String, Vec<StrategyStep>)> = Vec::new();
    for step in steps {
        match groups.iter_mut().find(|(source, _)| *source == step.source) {
            Some((_, group)) => group.push(step),
            None => groups.push((step.source.clone(), vec![step])),
        }
    }
    groups
}

/// Sequential execution of one source's steps.
async fn run_source(
    steps: Vec<StrategyStep>,
    fetcher: &dyn FetchCapability,
    options: &FetchOptions,
    policy: RetryPolicy,
    cancel: &CancelFlag,
) -> (Vec<ScrapeArtifact>, Vec<ErrorRecord>) {
    let mut artifacts = Vec::with_capacity(steps.len());
    let mut errors = Vec::new();

    for step in &steps {
        if cancel.is_cancelled() {
            tracing::info!(source = %step.source, "run cancelled, not scheduling further steps");
            break;
        }

        let path = request_path(&step.query);
        let allowance = fetcher.allowed(&step.source, &path).await;
        if !allowance.allowed {
            tracing::info!(source = %step.source, step = %step.step_id, "step disallowed by politeness rules");
            artifacts.push(ScrapeArtifact::failure(
                step,
                FetchStatus::Skipped,
                "disallowed by politeness rules",
            ));
            errors.push(ErrorRecord::new(
                Stage::Scrape,
                Some(&step.source),
                "disallowed",
                format!("step {} disallowed for path {path}", step.step_id),
            ));
            continue;
        }

        let delay = step.throttle.max(allowance.crawl_delay.unwrap_or_default());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        let result = retry_with_backoff(&policy, || async move {
            fetcher.fetch(step, options).await
        })
        .await;
        let fetch_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(page) => {
                artifacts.push(ScrapeArtifact {
                    source: step.source.clone(),
                    step_id: step.step_id.clone(),
                    status: FetchStatus::Ok,
                    html: page.html,
                    json_blob: page.json,
                    screenshot_path: page.screenshot_path,
                    error: None,
                    fetched_at: Utc::now(),
                    fetch_ms,
                });
            }
            Err(FetchError::Challenge) => {
                // Policy: skip, never solve. Abandon the source's remaining
                // pages but keep what was already collected.
                tracing::warn!(
                    source = %step.source,
                    step = %step.step_id,
                    "challenge detected, abandoning remaining pages for source"
                );
                artifacts.push(ScrapeArtifact::failure(
                    step,
                    FetchStatus::Blocked,
                    "interactive challenge detected",
                ));
                errors.push(ErrorRecord::new(
                    Stage::Scrape,
                    Some(&step.source),
                    "challenge",
                    format!(
                        "challenge at step {}; remaining pages skipped",
                        step.step_id
                    ),
                ));
                break;
            }
            Err(FetchError::CapabilityUnavailable(reason)) => {
                tracing::error!(
                    source = %step.source,
                    step = %step.step_id,
                    reason = %reason,
                    "fetch capability unavailable, aborting source"
                );
                artifacts.push(ScrapeArtifact::failure(step, FetchStatus::Error, &reason));
                errors.push(ErrorRecord::new(
                    Stage::Scrape,
                    Some(&step.source),
                    "capability_unavailable",
                    reason,
                ));
                break;
            }
            Err(err) => {
                let (status, kind) = match &err {
                    FetchError::Timeout => (FetchStatus::Timeout, "timeout"),
                    FetchError::Blocked { .. } => (FetchStatus::Blocked, "blocked"),
                    FetchError::ServerError { .. } => (FetchStatus::Error, "server_error"),
                    FetchError::Other(_) => (FetchStatus::Error, "fetch_error"),
                    FetchError::Challenge | FetchError::CapabilityUnavailable(_) => {
                        unreachable!("handled above")
                    }
                };
                tracing::warn!(
                    source = %step.source,
                    step = %step.step_id,
                    error = %err,
                    "step failed, continuing with next step"
                );
                artifacts.push(ScrapeArtifact::failure(step, status, err.to_string()));
                errors.push(ErrorRecord::new(
                    Stage::Scrape,
                    Some(&step.source),
                    kind,
                    format!("step {}: {err}", step.step_id),
                ));
            }
        }
    }

    (artifacts, errors)
}

/// URL-encoded request path used for politeness queries.
fn request_path(query: &str) -> String {
    format!("/search?q={}", utf8_percent_encode(query, NON_ALPHANUMERIC))
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
