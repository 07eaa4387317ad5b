use thiserror::Error;

/// Errors returned by a [`crate::GeocodingPort`] implementation.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The provider answered but had nothing for the query.
    #[error("no geocoding result for {query}")]
    NotFound { query: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The lookup needs configuration that is absent (e.g. an API key).
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The call did not complete within its deadline.
    #[error("geocoding call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}
