//! Heuristic artifact parsers, keyed by the planner's parser hint.

use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;

use leadsearch_core::{LeadCandidate, ScrapeArtifact, Sourced};

use crate::text::artifact_text;

/// Per-page safeguard against pathological listing pages.
pub const MAX_CANDIDATES_PER_PAGE: usize = 20;

const EMAIL_PATTERN: &str = r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}";
const PHONE_PATTERN: &str = r"[+(]?\d[\d\s().-]{7,}";

/// Turns one successful artifact into zero or more candidates.
pub trait ArtifactParser: Send + Sync {
    fn parse(&self, artifact: &ScrapeArtifact) -> Vec<LeadCandidate>;
}

/// Line-oriented regex scan for emails and phone numbers.
///
/// A line with contact data becomes one candidate; the company name is the
/// line prefix before the first known separator. When no line matches, a
/// full-text phone sweep guesses company names from preceding words.
pub struct LineScanParser {
    /// Separators between company name and the rest of a listing line, in
    /// priority order.
    separators: &'static [&'static str],
    base_confidence: f64,
}

impl LineScanParser {
    #[must_use]
    pub fn new(separators: &'static [&'static str], base_confidence: f64) -> Self {
        Self {
            separators,
            base_confidence,
        }
    }

    fn company_from_line<'a>(&self, line: &'a str) -> &'a str {
        for separator in self.separators {
            if let Some((prefix, _)) = line.split_once(separator) {
                return prefix;
            }
        }
        line
    }
}

impl ArtifactParser for LineScanParser {
    fn parse(&self, artifact: &ScrapeArtifact) -> Vec<LeadCandidate> {
        let Some(text) = artifact_text(artifact) else {
            return Vec::new();
        };
        let email_re = Regex::new(EMAIL_PATTERN).expect("valid email regex");
        let phone_re = Regex::new(PHONE_PATTERN).expect("valid phone regex");

        let mut candidates = Vec::new();
        for line in text.lines() {
            if candidates.len() >= MAX_CANDIDATES_PER_PAGE {
                break;
            }
            let email = email_re.find(line).map(|m| m.as_str().to_string());
            let phone = phone_re
                .find(line)
                .map(|m| m.as_str().trim_end_matches([' ', '.', '-']).to_string());
            if email.is_none() && phone.is_none() {
                continue;
            }
            let company = truncate(self.company_from_line(line).trim(), 120);
            let confidence = self.base_confidence + if email.is_some() { 0.1 } else { 0.0 };
            candidates.push(candidate(artifact, company, email, phone, confidence));
        }

        // Line parse found nothing: sweep the whole text for phone numbers
        // and guess company names from the preceding words.
        if candidates.is_empty() {
            for m in phone_re.find_iter(&text).take(5) {
                let before = &text[..m.start()];
                let words: Vec<&str> = before.split_whitespace().collect();
                let guess_start = words.len().saturating_sub(5);
                let guess = words[guess_start..].join(" ");
                let company = if guess.trim().is_empty() {
                    "Unknown".to_string()
                } else {
                    truncate(guess.trim(), 120)
                };
                // Sweep matches may span line breaks; normalize to one line.
                let phone = m
                    .as_str()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim_end_matches([' ', '.', '-'])
                    .to_string();
                candidates.push(candidate(artifact, company, None, Some(phone), 0.3));
            }
        }
        candidates
    }
}

fn candidate(
    artifact: &ScrapeArtifact,
    company: String,
    email: Option<String>,
    phone: Option<String>,
    confidence: f64,
) -> LeadCandidate {
    LeadCandidate {
        company_name: Sourced::heuristic(company),
        website: None,
        phone: phone.map(Sourced::heuristic),
        email: email.map(Sourced::heuristic),
        address: None,
        category: None,
        contact_name: None,
        contact_title: None,
        confidence,
        source: artifact.source.clone(),
        step_id: artifact.step_id.clone(),
        source_url: None,
        captured_at: Utc::now(),
        // Assigned globally by the extractor once all artifacts are parsed.
        extraction_order: 0,
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Maps parser hints to parsers, with a generic fallback for unknown hints.
pub struct ParserRegistry {
    parsers: HashMap<String, Box<dyn ArtifactParser>>,
    fallback: Box<dyn ArtifactParser>,
}

impl ParserRegistry {
    /// Registry with the built-in heuristic parsers.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
            fallback: Box::new(LineScanParser::new(&[" - "], 0.35)),
        };
        registry.register(
            "maps_listing",
            Box::new(LineScanParser::new(&[" - ", " \u{b7} "], 0.4)),
        );
        registry.register(
            "directory_listing",
            Box::new(LineScanParser::new(&[" - ", " | "], 0.4)),
        );
        registry
    }

    pub fn register(&mut self, hint: &str, parser: Box<dyn ArtifactParser>) {
        self.parsers.insert(hint.to_string(), parser);
    }

    /// The parser for a hint, falling back to the generic line scan.
    #[must_use]
    pub fn get(&self, hint: &str) -> &dyn ArtifactParser {
        self.parsers
            .get(hint)
            .map_or(self.fallback.as_ref(), Box::as_ref)
    }
}
