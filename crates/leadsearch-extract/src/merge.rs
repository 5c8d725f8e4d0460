//! Field-level merge of LLM extraction results into heuristic candidates.

use leadsearch_core::{LeadCandidate, Sourced};
use leadsearch_llm::LlmLead;

/// How one field resolves when both extraction paths produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPolicy {
    /// The LLM value is used only when the heuristic field is empty.
    #[default]
    FillEmpty,
    /// The LLM value replaces the heuristic one.
    PreferLlm,
}

/// Per-field merge policies for one source.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergePolicy {
    pub company_name: FieldPolicy,
    pub website: FieldPolicy,
    pub phone: FieldPolicy,
    pub email: FieldPolicy,
    pub address: FieldPolicy,
    pub category: FieldPolicy,
    pub contact_name: FieldPolicy,
    pub contact_title: FieldPolicy,
}

impl MergePolicy {
    /// The policy table for a source. Defaults to `FillEmpty` everywhere;
    /// maps listings prefer the LLM's company name because the heuristic
    /// prefix guess is noisy on that layout.
    #[must_use]
    pub fn for_source(source: &str) -> Self {
        match source {
            "google_maps" => Self {
                company_name: FieldPolicy::PreferLlm,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

/// Merges one LLM lead into a matching heuristic candidate in place.
///
/// Agreement between the two paths on a field raises confidence by 0.1 per
/// field, capped at 1.0.
pub fn merge_into(candidate: &mut LeadCandidate, llm: &LlmLead, policy: MergePolicy) {
    let mut agreements = 0usize;

    if let Some(name) = llm.company_name.as_deref() {
        if values_agree(&candidate.company_name.value, name) {
            agreements += 1;
        } else if policy.company_name == FieldPolicy::PreferLlm {
            candidate.company_name = Sourced::llm(name.to_string());
        }
    }

    merge_field(&mut candidate.website, llm.website.as_deref(), policy.website, &mut agreements);
    merge_field(&mut candidate.phone, llm.phone.as_deref(), policy.phone, &mut agreements);
    merge_field(&mut candidate.email, llm.email.as_deref(), policy.email, &mut agreements);
    merge_field(&mut candidate.address, llm.address.as_deref(), policy.address, &mut agreements);
    merge_field(&mut candidate.category, llm.category.as_deref(), policy.category, &mut agreements);
    merge_field(
        &mut candidate.contact_name,
        llm.contact_name.as_deref(),
        policy.contact_name,
        &mut agreements,
    );
    merge_field(
        &mut candidate.contact_title,
        llm.contact_title.as_deref(),
        policy.contact_title,
        &mut agreements,
    );

    if candidate.source_url.is_none() {
        candidate.source_url = llm.source_url.clone();
    }

    #[allow(clippy::cast_precision_loss)]
    let bump = 0.1 * agreements as f64;
    candidate.confidence = (candidate.confidence + bump).min(1.0);
}

fn merge_field(
    existing: &mut Option<Sourced<String>>,
    llm_value: Option<&str>,
    policy: FieldPolicy,
    agreements: &mut usize,
) {
    let Some(llm_value) = llm_value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    match existing {
        None => *existing = Some(Sourced::llm(llm_value.to_string())),
        Some(current) => {
            if values_agree(&current.value, llm_value) {
                *agreements += 1;
            } else if policy == FieldPolicy::PreferLlm {
                *existing = Some(Sourced::llm(llm_value.to_string()));
            }
        }
    }
}

fn values_agree(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
