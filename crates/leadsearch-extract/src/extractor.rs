//! The extraction stage: heuristics first, optional LLM enrichment on top.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use leadsearch_core::{ErrorRecord, LeadCandidate, ScrapeArtifact, Sourced, Stage};
use leadsearch_llm::{LlmCapability, LlmLead};

use crate::merge::{merge_into, MergePolicy};
use crate::parsers::ParserRegistry;
use crate::text::artifact_text;

/// Page text beyond this many chars is not sent to the LLM.
const MAX_LLM_INPUT_CHARS: usize = 6000;

/// Candidates plus the non-fatal errors hit while extracting them.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub candidates: Vec<LeadCandidate>,
    pub errors: Vec<ErrorRecord>,
}

/// Turns artifacts into lead candidates.
///
/// Heuristic parsing always runs. When an LLM capability is attached, each
/// successful artifact additionally gets at most one structured-extraction
/// call, merged field-by-field under the source's [`MergePolicy`]. Any LLM
/// failure degrades that artifact to heuristic-only with an error record;
/// it never fails the stage.
pub struct Extractor {
    registry: ParserRegistry,
    llm: Option<Arc<dyn LlmCapability>>,
}

impl Extractor {
    #[must_use]
    pub fn new(registry: ParserRegistry) -> Self {
        Self {
            registry,
            llm: None,
        }
    }

    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmCapability>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Extracts candidates from one artifact.
    ///
    /// Failure artifacts yield zero candidates and are never sent to the LLM.
    pub async fn extract(&self, artifact: &ScrapeArtifact, parser_hint: &str) -> ExtractOutcome {
        let mut outcome = ExtractOutcome::default();
        if !artifact.is_ok() {
            return outcome;
        }

        outcome.candidates = self.registry.get(parser_hint).parse(artifact);
        tracing::debug!(
            step = %artifact.step_id,
            candidates = outcome.candidates.len(),
            "heuristic extraction done"
        );

        if let Some(llm) = &self.llm {
            if let Some(text) = artifact_text(artifact) {
                let input = truncate_chars(&text, MAX_LLM_INPUT_CHARS);
                match llm.extract_leads(&artifact.source, &input).await {
                    Ok(llm_leads) => {
                        let policy = MergePolicy::for_source(&artifact.source);
                        for llm_lead in &llm_leads {
                            match find_match(&mut outcome.candidates, llm_lead) {
                                Some(candidate) => merge_into(candidate, llm_lead, policy),
                                None => outcome
                                    .candidates
                                    .push(candidate_from_llm(artifact, llm_lead)),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            step = %artifact.step_id,
                            error = %e,
                            "llm extraction failed, keeping heuristic candidates"
                        );
                        outcome.errors.push(ErrorRecord::new(
                            Stage::Extract,
                            Some(&artifact.source),
                            "llm_extraction",
                            e.to_string(),
                        ));
                    }
                }
            }
        }
        outcome
    }

    /// Extracts from all artifacts, looking up each parser hint by step id,
    /// and numbers the surviving candidates in extraction order.
    pub async fn extract_all(
        &self,
        artifacts: &[ScrapeArtifact],
        parser_hints: &HashMap<String, String>,
    ) -> ExtractOutcome {
        let mut merged = ExtractOutcome::default();
        for artifact in artifacts {
            let hint = parser_hints
                .get(&artifact.step_id)
                .map_or("", String::as_str);
            let outcome = self.extract(artifact, hint).await;
            merged.candidates.extend(outcome.candidates);
            merged.errors.extend(outcome.errors);
        }
        for (order, candidate) in merged.candidates.iter_mut().enumerate() {
            candidate.extraction_order = order;
        }
        merged
    }
}

/// Pairs an LLM lead with the heuristic candidate it describes: same email,
/// same phone digits, or same company name.
fn find_match<'a>(
    candidates: &'a mut [LeadCandidate],
    llm_lead: &LlmLead,
) -> Option<&'a mut LeadCandidate> {
    candidates.iter_mut().find(|c| {
        let email_match = match (c.email_value(), llm_lead.email.as_deref()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        let phone_match = match (c.phone_value(), llm_lead.phone.as_deref()) {
            (Some(a), Some(b)) => {
                let da = digits(a);
                !da.is_empty() && da == digits(b)
            }
            _ => false,
        };
        let name_match = llm_lead
            .company_name
            .as_deref()
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(c.company_name.value.trim()));
        email_match || phone_match || name_match
    })
}

fn candidate_from_llm(artifact: &ScrapeArtifact, llm_lead: &LlmLead) -> LeadCandidate {
    let sourced = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Sourced::llm(s.to_string()))
    };
    LeadCandidate {
        company_name: Sourced::llm(
            llm_lead
                .company_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string(),
        ),
        website: sourced(&llm_lead.website),
        phone: sourced(&llm_lead.phone),
        email: sourced(&llm_lead.email),
        address: sourced(&llm_lead.address),
        category: sourced(&llm_lead.category),
        contact_name: sourced(&llm_lead.contact_name),
        contact_title: sourced(&llm_lead.contact_title),
        confidence: llm_lead.confidence.unwrap_or(0.6).clamp(0.0, 1.0),
        source: artifact.source.clone(),
        step_id: artifact.step_id.clone(),
        source_url: llm_lead.source_url.clone(),
        captured_at: Utc::now(),
        extraction_order: 0,
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
