//! Heuristic lead scoring and ranking.

use regex::Regex;

use leadsearch_core::{ErrorRecord, LeadCandidate, ScoredLead, SearchFilters, Stage};
use leadsearch_llm::LlmCapability;

/// Additive score weights, all in [0, 1]. The final score is clamped to
/// [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub base: f64,
    pub email_present: f64,
    pub phone_present: f64,
    pub category_match: f64,
    /// Bonus when the email passes the form check. Form only; deliverability
    /// is never verified.
    pub email_valid_form: f64,
    /// Multiplied by the candidate's extraction confidence.
    pub confidence_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 0.2,
            email_present: 0.3,
            phone_present: 0.2,
            category_match: 0.2,
            email_valid_form: 0.1,
            confidence_weight: 0.1,
        }
    }
}

/// Scores, ranks, and qualifies candidates.
///
/// Candidates missing a must-have field from the filters are disqualified
/// with a reason and retained in the output, excluded from ranking. Ranking
/// is a stable sort descending by score with ties broken by extraction
/// order, so identical inputs produce identical output regardless of input
/// order.
#[must_use]
pub fn score(
    candidates: Vec<LeadCandidate>,
    filters: &SearchFilters,
    weights: &ScoreWeights,
) -> Vec<ScoredLead> {
    let email_form = Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
        .expect("valid email form regex");

    let mut scored: Vec<ScoredLead> = candidates
        .into_iter()
        .map(|lead| score_one(lead, filters, weights, &email_form))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.lead.extraction_order.cmp(&b.lead.extraction_order))
    });

    let mut rank = 0usize;
    for lead in &mut scored {
        if lead.disqualified {
            lead.rank = None;
        } else {
            lead.rank = Some(rank);
            rank += 1;
        }
    }
    scored
}

fn score_one(
    lead: LeadCandidate,
    filters: &SearchFilters,
    weights: &ScoreWeights,
    email_form: &Regex,
) -> ScoredLead {
    let mut score = weights.base;
    let mut rationale_parts: Vec<&str> = Vec::new();

    if let Some(email) = lead.email_value() {
        score += weights.email_present;
        rationale_parts.push("has_email");
        if email_form.is_match(email.trim()) {
            score += weights.email_valid_form;
            rationale_parts.push("valid_email_form");
        }
    }
    if lead.phone_value().is_some() {
        score += weights.phone_present;
        rationale_parts.push("has_phone");
    }
    if let Some(category) = lead.category_value() {
        if filters
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
        {
            score += weights.category_match;
            rationale_parts.push("category_match");
        }
    }
    score += weights.confidence_weight * lead.confidence;

    let mut reasons: Vec<&str> = Vec::new();
    if filters.must_have_email && lead.email_value().is_none() {
        reasons.push("missing required email");
    }
    if filters.must_have_phone && lead.phone_value().is_none() {
        reasons.push("missing required phone");
    }
    let disqualified = !reasons.is_empty();

    ScoredLead {
        lead,
        score: score.clamp(0.0, 1.0),
        rank: None,
        disqualified,
        disqualification_reason: disqualified.then(|| reasons.join("; ")),
        rationale: if rationale_parts.is_empty() {
            "baseline".to_string()
        } else {
            rationale_parts.join(", ")
        },
    }
}

/// Replaces heuristic rationales with LLM ones for qualified leads.
///
/// A failed call keeps the heuristic rationale and records the provider's
/// message; it never fails the stage.
pub async fn add_llm_rationales(
    scored: &mut [ScoredLead],
    llm: &dyn LlmCapability,
) -> Vec<ErrorRecord> {
    let mut errors = Vec::new();
    for entry in scored.iter_mut().filter(|s| !s.disqualified) {
        let summary = lead_summary(&entry.lead);
        match llm.rationale(&summary).await {
            Ok(rationale) if !rationale.is_empty() => entry.rationale = rationale,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(company = %entry.lead.company_name.value, error = %e, "rationale call failed");
                errors.push(ErrorRecord::new(
                    Stage::Score,
                    Some(&entry.lead.source),
                    "llm_rationale",
                    e.to_string(),
                ));
            }
        }
    }
    errors
}

fn lead_summary(lead: &LeadCandidate) -> String {
    format!(
        "company_name: {}; category: {}; location: {}; email: {}; phone: {}",
        lead.company_name.value,
        lead.category_value().unwrap_or("unknown"),
        lead.address_value().unwrap_or("unknown"),
        lead.email_value().unwrap_or("none"),
        lead.phone_value().unwrap_or("none"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadsearch_core::Sourced;

    fn candidate(
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        category: Option<&str>,
        confidence: f64,
        extraction_order: usize,
    ) -> LeadCandidate {
        LeadCandidate {
            company_name: Sourced::heuristic(name.to_string()),
            website: None,
            phone: phone.map(|v| Sourced::heuristic(v.to_string())),
            email: email.map(|v| Sourced::heuristic(v.to_string())),
            address: None,
            category: category.map(|v| Sourced::heuristic(v.to_string())),
            contact_name: None,
            contact_title: None,
            confidence,
            source: "google_maps".to_string(),
            step_id: "google_maps-0".to_string(),
            source_url: None,
            captured_at: Utc::now(),
            extraction_order,
        }
    }

    #[test]
    fn weights_accumulate_per_field() {
        let scored = score(
            vec![candidate(
                "Acme",
                Some("info@acme.com"),
                Some("(612) 555-0101"),
                Some("plumbing"),
                0.5,
                0,
            )],
            &SearchFilters {
                categories: vec!["Plumbing".to_string()],
                ..SearchFilters::default()
            },
            &ScoreWeights::default(),
        );
        // 0.2 base + 0.3 email + 0.1 form + 0.2 phone + 0.2 category + 0.1 * 0.5.
        assert!((scored[0].score - 1.0).abs() < 1e-9);
        assert!(scored[0].rationale.contains("has_email"));
        assert!(scored[0].rationale.contains("valid_email_form"));
        assert!(scored[0].rationale.contains("category_match"));
    }

    #[test]
    fn invalid_email_form_gets_no_form_bonus() {
        let scored = score(
            vec![candidate("Acme", Some("not-an-email"), None, None, 0.0, 0)],
            &SearchFilters::default(),
            &ScoreWeights::default(),
        );
        // 0.2 base + 0.3 email present, no form bonus.
        assert!((scored[0].score - 0.5).abs() < 1e-9);
        assert!(!scored[0].rationale.contains("valid_email_form"));
    }

    #[test]
    fn contact_free_candidate_scores_baseline() {
        let scored = score(
            vec![candidate("Acme", None, None, None, 0.0, 0)],
            &SearchFilters::default(),
            &ScoreWeights::default(),
        );
        assert!((scored[0].score - 0.2).abs() < 1e-9);
        assert_eq!(scored[0].rationale, "baseline");
    }

    #[test]
    fn missing_must_have_disqualifies_but_retains() {
        let scored = score(
            vec![
                candidate("Has Email", Some("a@b.com"), None, None, 0.0, 0),
                candidate("No Email", None, Some("(612) 555-0101"), None, 0.0, 1),
            ],
            &SearchFilters {
                must_have_email: true,
                ..SearchFilters::default()
            },
            &ScoreWeights::default(),
        );
        assert_eq!(scored.len(), 2);
        let disqualified: Vec<_> = scored.iter().filter(|s| s.disqualified).collect();
        assert_eq!(disqualified.len(), 1);
        assert_eq!(disqualified[0].lead.company_name.value, "No Email");
        assert_eq!(
            disqualified[0].disqualification_reason.as_deref(),
            Some("missing required email")
        );
        assert!(disqualified[0].rank.is_none());
    }

    #[test]
    fn ranks_cover_only_qualified_leads() {
        let scored = score(
            vec![
                candidate("A", Some("a@a.com"), None, None, 0.0, 0),
                candidate("B", None, None, None, 0.0, 1),
                candidate("C", Some("c@c.com"), Some("(612) 555-0101"), None, 0.0, 2),
            ],
            &SearchFilters {
                must_have_email: true,
                ..SearchFilters::default()
            },
            &ScoreWeights::default(),
        );
        let ranks: Vec<Option<usize>> = scored.iter().map(|s| s.rank).collect();
        // C outscores A; B is disqualified and sorts last without a rank.
        assert_eq!(scored[0].lead.company_name.value, "C");
        assert_eq!(ranks, [Some(0), Some(1), None]);
    }

    #[test]
    fn ties_break_by_extraction_order() {
        let scored = score(
            vec![
                candidate("Second", None, Some("(612) 555-0102"), None, 0.0, 7),
                candidate("First", None, Some("(612) 555-0101"), None, 0.0, 3),
            ],
            &SearchFilters::default(),
            &ScoreWeights::default(),
        );
        assert_eq!(scored[0].lead.company_name.value, "First");
        assert_eq!(scored[1].lead.company_name.value, "Second");
    }

    #[test]
    fn output_is_deterministic_under_input_shuffle() {
        let batch = vec![
            candidate("A", Some("a@a.com"), None, None, 0.3, 0),
            candidate("B", None, Some("(612) 555-0101"), None, 0.9, 1),
            candidate("C", Some("c@c.com"), Some("(612) 555-0102"), None, 0.1, 2),
            candidate("D", None, None, None, 0.5, 3),
        ];
        let mut shuffled = batch.clone();
        shuffled.rotate_left(2);
        shuffled.swap(0, 1);

        let a = score(batch, &SearchFilters::default(), &ScoreWeights::default());
        let b = score(shuffled, &SearchFilters::default(), &ScoreWeights::default());

        let names =
            |v: &[ScoredLead]| v.iter().map(|s| s.lead.company_name.value.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        let ranks = |v: &[ScoredLead]| v.iter().map(|s| s.rank).collect::<Vec<_>>();
        assert_eq!(ranks(&a), ranks(&b));
    }
}
