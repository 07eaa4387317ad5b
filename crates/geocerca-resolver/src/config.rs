use std::time::Duration;

use geocerca_core::AppConfig;

/// Tunables for one orchestrator.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Quiet period after the last input before resolving starts.
    pub debounce: Duration,
    /// Degrees between the center and each outer search point (~200 m).
    pub sample_offset_deg: f64,
    /// Deadline applied to every individual port call while resolving.
    pub lookup_timeout: Duration,
    /// Below this many valid votes a matched winner still asks for confirmation.
    pub min_votes_for_auto: usize,
    pub nearby_radius_m: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            sample_offset_deg: 0.0018,
            lookup_timeout: Duration::from_secs(4),
            min_votes_for_auto: 1,
            nearby_radius_m: 500,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            sample_offset_deg: config.sample_offset_deg,
            lookup_timeout: Duration::from_millis(config.lookup_timeout_ms),
            min_votes_for_auto: config.min_votes_for_auto,
            nearby_radius_m: config.nearby_radius_m,
        }
    }
}
