//! The external page-fetch capability boundary.
//!
//! The browser-automation engine lives outside this workspace; the
//! orchestrator only sees this trait. Implementations must detect
//! interactive challenges themselves and surface them as
//! [`FetchError::Challenge`] — the pipeline never attempts to solve one.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use leadsearch_core::StrategyStep;

use crate::anti_detection::AntiDetectionConfig;
use crate::error::FetchError;

/// Content returned by one successful fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub html: Option<String>,
    pub json: Option<serde_json::Value>,
    pub screenshot_path: Option<String>,
}

/// Per-run options handed to the fetch capability alongside each step.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub anti_detection: AntiDetectionConfig,
    /// Timeout the engine applies to one page load.
    pub page_timeout: Duration,
    /// Capture a screenshot of each fetched page; the engine reports the
    /// path on [`FetchedPage::screenshot_path`].
    pub capture_screenshots: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            anti_detection: AntiDetectionConfig::default(),
            page_timeout: Duration::from_secs(30),
            capture_screenshots: false,
        }
    }
}

/// Robots-style politeness answer for one (source, path) pair.
#[derive(Debug, Clone, Copy)]
pub struct Allowance {
    pub allowed: bool,
    /// Minimum delay the target asks for; the orchestrator takes the max of
    /// this and the step throttle.
    pub crawl_delay: Option<Duration>,
}

impl Allowance {
    #[must_use]
    pub fn permitted() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }

    #[must_use]
    pub fn denied() -> Self {
        Self {
            allowed: false,
            crawl_delay: None,
        }
    }
}

/// Opaque page-fetch capability.
#[async_trait]
pub trait FetchCapability: Send + Sync {
    /// Attempts one step. Exactly one attempt; retry policy lives in the
    /// orchestrator.
    async fn fetch(
        &self,
        step: &StrategyStep,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError>;

    /// Politeness query for a source and request path.
    async fn allowed(&self, source: &str, path: &str) -> Allowance;
}

/// Fetch adapter backed by payload-supplied fixtures.
///
/// Pages are looked up by step id first, then by rendered query. Steps with
/// no fixture report the capability unavailable for that source, which the
/// orchestrator treats as fatal for the source's remaining steps.
#[derive(Debug, Default)]
pub struct PreloadedFetcher {
    html: HashMap<String, String>,
    json: HashMap<String, serde_json::Value>,
}

impl PreloadedFetcher {
    #[must_use]
    pub fn new(
        html: HashMap<String, String>,
        json: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self { html, json }
    }

    fn lookup_html(&self, step: &StrategyStep) -> Option<&String> {
        self.html
            .get(&step.step_id)
            .or_else(|| self.html.get(&step.query))
    }

    fn lookup_json(&self, step: &StrategyStep) -> Option<&serde_json::Value> {
        self.json
            .get(&step.step_id)
            .or_else(|| self.json.get(&step.query))
    }
}

#[async_trait]
impl FetchCapability for PreloadedFetcher {
    async fn fetch(
        &self,
        step: &StrategyStep,
        _options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        let html = self.lookup_html(step).cloned();
        let json = self.lookup_json(step).cloned();
        if html.is_none() && json.is_none() {
            return Err(FetchError::CapabilityUnavailable(
                "no browser engine wired and no preloaded fixture for this step".to_string(),
            ));
        }
        Ok(FetchedPage {
            html,
            json,
            screenshot_path: None,
        })
    }

    async fn allowed(&self, _source: &str, _path: &str) -> Allowance {
        Allowance::permitted()
    }
}
