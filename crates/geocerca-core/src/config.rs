use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("GEOCERCA_ENV", "development"))?;
    let log_level = or_default("GEOCERCA_LOG_LEVEL", "info");
    let hierarchy_path = PathBuf::from(or_default(
        "GEOCERCA_HIERARCHY_PATH",
        "./config/hierarchy.yaml",
    ));
    let country = or_default("GEOCERCA_COUNTRY", "republica-dominicana");

    let geocoder_base_url = or_default(
        "GEOCERCA_GEOCODER_BASE_URL",
        "https://nominatim.openstreetmap.org/",
    );
    let places_base_url = or_default("GEOCERCA_PLACES_BASE_URL", "https://api.foursquare.com/v3/");
    let places_api_key = lookup("GEOCERCA_PLACES_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let user_agent = or_default("GEOCERCA_USER_AGENT", "geocerca/0.1 (listing-backoffice)");

    let request_timeout_secs: u64 = parse_as(
        "GEOCERCA_REQUEST_TIMEOUT_SECS",
        &or_default("GEOCERCA_REQUEST_TIMEOUT_SECS", "10"),
    )?;
    let debounce_ms: u64 = parse_as(
        "GEOCERCA_DEBOUNCE_MS",
        &or_default("GEOCERCA_DEBOUNCE_MS", "300"),
    )?;
    let sample_offset_deg: f64 = parse_as(
        "GEOCERCA_SAMPLE_OFFSET_DEG",
        &or_default("GEOCERCA_SAMPLE_OFFSET_DEG", "0.0018"),
    )?;
    if !sample_offset_deg.is_finite() || sample_offset_deg <= 0.0 || sample_offset_deg > 1.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GEOCERCA_SAMPLE_OFFSET_DEG".to_string(),
            reason: format!("must be within (0, 1] degrees, got {sample_offset_deg}"),
        });
    }
    let lookup_timeout_ms: u64 = parse_as(
        "GEOCERCA_LOOKUP_TIMEOUT_MS",
        &or_default("GEOCERCA_LOOKUP_TIMEOUT_MS", "4000"),
    )?;
    if lookup_timeout_ms == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GEOCERCA_LOOKUP_TIMEOUT_MS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let min_votes_for_auto: usize = parse_as(
        "GEOCERCA_MIN_VOTES_FOR_AUTO",
        &or_default("GEOCERCA_MIN_VOTES_FOR_AUTO", "1"),
    )?;
    let nearby_radius_m: u32 = parse_as(
        "GEOCERCA_NEARBY_RADIUS_M",
        &or_default("GEOCERCA_NEARBY_RADIUS_M", "500"),
    )?;

    Ok(AppConfig {
        env,
        log_level,
        hierarchy_path,
        country,
        geocoder_base_url,
        places_base_url,
        places_api_key,
        user_agent,
        request_timeout_secs,
        debounce_ms,
        sample_offset_deg,
        lookup_timeout_ms,
        min_votes_for_auto,
        nearby_radius_m,
    })
}

/// Parse a trimmed env-var value, mapping failures to [`ConfigError::InvalidEnvVar`].
fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GEOCERCA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
