//! Prompt templates for extraction and scoring.

/// System prompt for the structured-extraction call.
pub const EXTRACT_COMPANY: &str = "Extract company/contact details from the provided page text. \
Return JSON with a \"leads\" array whose items have fields: company_name, website, phone, email, \
address, category, contact_name, contact_title, confidence, source_url. Omit fields you cannot \
find; never invent values.";

/// System prompt for the scoring-rationale call.
pub const SCORE_LEAD: &str = "Given a lead with fields (company_name, category, location, email, \
phone), produce a short one-sentence rationale for how promising the lead is.";

/// Extraction prompt specialised to the source the text came from.
#[must_use]
pub fn extraction_prompt(source: &str) -> String {
    format!("{EXTRACT_COMPANY} The text was scraped from {source} search results.")
}
