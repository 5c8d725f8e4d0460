//! Command handlers, called from `main` after config and logging are
//! established.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use leadsearch_core::{AppConfig, SearchRequest, StorageSettings};
use leadsearch_db::SqliteStore;
use leadsearch_llm::{LlmCapability, OpenAiCompatClient};
use leadsearch_pipeline::{run as run_pipeline, RunDeps, RunError};
use leadsearch_scraper::{plan, CancelFlag, PreloadedFetcher, SourceRegistry};

/// Optional `preloaded` payload section: page fixtures served in place of a
/// live browser engine, keyed by step id or rendered query.
#[derive(Debug, Default, Deserialize)]
struct PreloadedFixtures {
    #[serde(default)]
    html: HashMap<String, String>,
    #[serde(default)]
    json: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct PlannedStep<'a> {
    source: &'a str,
    query: &'a str,
    page: u32,
    step_id: &'a str,
    parser_hint: &'a str,
    throttle_ms: u64,
}

fn read_payload(path: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    Ok(serde_json::from_str(&raw)?)
}

fn split_payload(payload: serde_json::Value) -> anyhow::Result<(SearchRequest, PreloadedFixtures)> {
    let fixtures = match payload.get("preloaded") {
        Some(section) => serde_json::from_value(section.clone())
            .map_err(|e| anyhow::anyhow!("malformed preloaded section: {e}"))?,
        None => PreloadedFixtures::default(),
    };
    let request = SearchRequest::from_payload(payload)?;
    Ok((request, fixtures))
}

pub(crate) async fn run(
    config: &AppConfig,
    payload_path: Option<&Path>,
    use_llm: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let payload = read_payload(payload_path)?;
    let (mut request, fixtures) = split_payload(payload)?;
    if use_llm {
        request.use_llm_extraction = true;
    }

    let registry = SourceRegistry::builtin((config.throttle_min_ms, config.throttle_max_ms));
    if dry_run {
        let planned = plan(&request, &registry)?;
        let steps: Vec<PlannedStep<'_>> = planned
            .steps
            .iter()
            .map(|step| PlannedStep {
                source: &step.source,
                query: &step.query,
                page: step.page,
                step_id: &step.step_id,
                parser_hint: &step.parser_hint,
                throttle_ms: u64::try_from(step.throttle.as_millis()).unwrap_or(u64::MAX),
            })
            .collect();
        let report = serde_json::json!({ "steps": steps, "errors": planned.errors });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let store = SqliteStore::connect(&request.storage).await?;
    store.ensure_schema().await?;

    let llm: Option<Arc<dyn LlmCapability>> = if request.use_llm_extraction {
        let client = OpenAiCompatClient::new(
            request.llm.clone(),
            Duration::from_secs(config.llm_timeout_secs),
        )?;
        Some(Arc::new(client))
    } else {
        None
    };

    let deps = RunDeps {
        fetcher: Arc::new(PreloadedFetcher::new(fixtures.html, fixtures.json)),
        llm,
        sink: Arc::new(store),
        config: config.clone(),
        cancel: CancelFlag::default(),
    };

    match run_pipeline(&request, &deps).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        // A storage failure must not lose the run: print the in-memory
        // results before failing.
        Err(RunError::Persist { error, outcome }) => {
            println!("{}", serde_json::to_string_pretty(&*outcome)?);
            Err(anyhow::anyhow!("persistence failed: {error}"))
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn init_db(db: Option<String>) -> anyhow::Result<()> {
    let mut storage = StorageSettings::default();
    if let Some(path) = db {
        storage.sqlite_path = path;
    }
    let store = SqliteStore::connect(&storage).await?;
    store.ensure_schema().await?;
    println!("schema ready at {}", storage.sqlite_path);
    Ok(())
}
