use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub hierarchy_path: PathBuf,
    /// Normalized key of the country the hierarchy mapper binds to.
    pub country: String,
    pub geocoder_base_url: String,
    pub places_base_url: String,
    pub places_api_key: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub debounce_ms: u64,
    /// Offset in degrees between the center and each outer search point.
    pub sample_offset_deg: f64,
    pub lookup_timeout_ms: u64,
    pub min_votes_for_auto: usize,
    pub nearby_radius_m: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("hierarchy_path", &self.hierarchy_path)
            .field("country", &self.country)
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("places_base_url", &self.places_base_url)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("debounce_ms", &self.debounce_ms)
            .field("sample_offset_deg", &self.sample_offset_deg)
            .field("lookup_timeout_ms", &self.lookup_timeout_ms)
            .field("min_votes_for_auto", &self.min_votes_for_auto)
            .field("nearby_radius_m", &self.nearby_radius_m)
            .finish()
    }
}
