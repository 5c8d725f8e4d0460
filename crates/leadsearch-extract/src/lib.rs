//! Candidate extraction from scrape artifacts.
//!
//! Heuristic parsers always run; an LLM pass is optional enrichment layered
//! on top, never a replacement. Failure artifacts produce zero candidates
//! and are never sent to the LLM.

mod extractor;
mod merge;
mod parsers;
mod text;

pub use extractor::{ExtractOutcome, Extractor};
pub use merge::{FieldPolicy, MergePolicy};
pub use parsers::{ArtifactParser, LineScanParser, ParserRegistry, MAX_CANDIDATES_PER_PAGE};
pub use text::{artifact_text, html_to_text};
