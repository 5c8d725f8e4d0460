//! Politeness and anti-detection settings handed to the fetch capability.
//!
//! These are configurable courtesy controls (user agent, viewport, headless
//! mode), not an evasion toolkit: captchas are never solved and blocks are
//! never bypassed.

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct AntiDetectionConfig {
    pub enabled: bool,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub stealth: bool,
    pub proxy: Option<String>,
    pub headless: bool,
}

impl AntiDetectionConfig {
    /// Baseline config; `enabled = false` turns every knob off.
    #[must_use]
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }
}

impl Default for AntiDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: (1366, 768),
            stealth: true,
            proxy: None,
            headless: true,
        }
    }
}
