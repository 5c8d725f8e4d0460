//! Known-source registry: query templates and parser hints per source.
//!
//! New sources register a [`SourceSpec`] (and optionally aliases) without
//! touching the planner or orchestrator.

use std::collections::HashMap;

/// Per-source planning configuration.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub id: String,
    /// Rendered with `{keyword}` and `{location}` placeholders. A registered
    /// source without a template is a fatal configuration error at plan time.
    pub query_template: Option<String>,
    /// Selects the heuristic parser for this source's artifacts.
    pub parser_hint: String,
    /// Throttle delay range steps are drawn from, in milliseconds.
    pub throttle_range_ms: (u64, u64),
}

/// Registry of sources the planner may emit steps for.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    specs: HashMap<String, SourceSpec>,
    aliases: HashMap<String, String>,
}

impl SourceRegistry {
    /// Registry with the built-in sources, all drawing throttle delays from
    /// `throttle_range_ms`.
    #[must_use]
    pub fn builtin(throttle_range_ms: (u64, u64)) -> Self {
        let mut registry = Self::default();
        registry.register(SourceSpec {
            id: "google_maps".to_string(),
            query_template: Some("{keyword} {location}".to_string()),
            parser_hint: "maps_listing".to_string(),
            throttle_range_ms,
        });
        registry.alias("maps", "google_maps");
        registry.alias("google-maps", "google_maps");
        registry.register(SourceSpec {
            id: "yellow_pages".to_string(),
            query_template: Some("{keyword} near {location}".to_string()),
            parser_hint: "directory_listing".to_string(),
            throttle_range_ms,
        });
        registry.register(SourceSpec {
            id: "yelp".to_string(),
            query_template: Some("{keyword} {location}".to_string()),
            parser_hint: "directory_listing".to_string(),
            throttle_range_ms,
        });
        registry
    }

    pub fn register(&mut self, spec: SourceSpec) {
        self.specs.insert(spec.id.clone(), spec);
    }

    pub fn alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.to_lowercase(), canonical.to_string());
    }

    /// Resolves a requested source id (case-insensitive, alias-aware).
    /// Returns `None` for unknown sources.
    #[must_use]
    pub fn resolve(&self, requested: &str) -> Option<&SourceSpec> {
        let lowered = requested.to_lowercase();
        let canonical = self.aliases.get(&lowered).map_or(lowered, Clone::clone);
        self.specs.get(&canonical)
    }
}
