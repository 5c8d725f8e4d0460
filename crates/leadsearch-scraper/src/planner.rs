//! Strategy planning: turn a search request into ordered scrape steps.

use std::time::Duration;

use rand::Rng;

use leadsearch_core::{ErrorRecord, SearchRequest, Stage, StrategyStep};

use crate::error::PlanError;
use crate::sources::SourceRegistry;

/// The planner's output: steps to execute plus non-fatal planning errors.
#[derive(Debug, Default)]
pub struct Plan {
    pub steps: Vec<StrategyStep>,
    pub errors: Vec<ErrorRecord>,
}

/// Builds the ordered step list for a request.
///
/// Steps are grouped by source, then by keyword×location, then by ascending
/// page — the orchestrator relies on this ordering for pagination
/// correctness. Unknown sources are skipped with a planning [`ErrorRecord`];
/// requests with no keywords produce zero steps.
///
/// # Errors
///
/// Returns [`PlanError::MissingTemplate`] when a requested source resolves in
/// the registry but carries no query template. This is fatal and happens
/// before any network activity.
pub fn plan(request: &SearchRequest, registry: &SourceRegistry) -> Result<Plan, PlanError> {
    let mut plan = Plan::default();

    for requested in &request.sources {
        let Some(spec) = registry.resolve(requested) else {
            tracing::warn!(source = %requested, "skipping unknown source");
            plan.errors.push(ErrorRecord::new(
                Stage::Plan,
                Some(requested),
                "unknown_source",
                format!("source '{requested}' is not in the known-source registry"),
            ));
            continue;
        };

        let Some(template) = spec.query_template.as_deref() else {
            return Err(PlanError::MissingTemplate {
                source: spec.id.clone(),
            });
        };

        let mut seq = 0usize;
        let locations: Vec<Option<&str>> = if request.locations.is_empty() {
            vec![None]
        } else {
            request.locations.iter().map(|l| Some(l.as_str())).collect()
        };

        for keyword in &request.keywords {
            for location in &locations {
                let query = render_query(template, keyword, *location);
                for page in 1..=request.pages_per_source.max(1) {
                    plan.steps.push(StrategyStep {
                        source: spec.id.clone(),
                        query: query.clone(),
                        location: location.map(str::to_owned),
                        page,
                        throttle: draw_throttle(spec.throttle_range_ms),
                        parser_hint: spec.parser_hint.clone(),
                        step_id: format!("{}-{seq}", spec.id),
                    });
                    seq += 1;
                }
            }
        }
    }

    tracing::debug!(
        steps = plan.steps.len(),
        skipped_sources = plan.errors.len(),
        "plan built"
    );
    Ok(plan)
}

/// Renders a query template, dropping the `{location}` placeholder (and any
/// stranded whitespace) when no location is given.
fn render_query(template: &str, keyword: &str, location: Option<&str>) -> String {
    let rendered = template
        .replace("{keyword}", keyword)
        .replace("{location}", location.unwrap_or(""));
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn draw_throttle((min_ms, max_ms): (u64, u64)) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}
