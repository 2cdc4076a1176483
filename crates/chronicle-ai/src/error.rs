use thiserror::Error;

/// Errors returned by the assistant client and the summarizer.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("AI provider error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A provider response did not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The batch could not be serialized for delivery.
    #[error("failed to encode activity batch: {0}")]
    Encode(#[source] serde_json::Error),

    /// The model called a function other than the one it was forced to call.
    #[error("model invoked '{actual}' but '{expected}' was required")]
    WrongFunction { expected: String, actual: String },

    /// The forced call's arguments were not valid JSON.
    #[error("function '{function}' returned malformed arguments: {source} (excerpt: {excerpt})")]
    MalformedArguments {
        function: String,
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    /// The run ended without invoking any function.
    #[error("run finished with status '{status}' without a function call: {reason}")]
    NoFunctionCall { status: String, reason: String },

    /// The run reached a terminal failure state.
    #[error("run {status}: {reason}")]
    RunFailed { status: String, reason: String },

    /// The run did not reach a terminal state within the configured wait.
    #[error("run did not finish within {waited_secs}s")]
    RunTimedOut { waited_secs: u64 },

    /// Local temporary file handling failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// `true` when the provider answered but broke the forced-output contract.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AiError::WrongFunction { .. }
                | AiError::MalformedArguments { .. }
                | AiError::NoFunctionCall { .. }
        )
    }
}
