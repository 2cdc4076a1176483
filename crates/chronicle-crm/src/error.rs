use thiserror::Error;

/// Errors returned by the CRM REST client.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CRM answered with a non-2xx status.
    #[error("CRM API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured instance URL or a returned cursor is not a usable URL.
    #[error("invalid CRM URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
