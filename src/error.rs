use thiserror::Error;

/// Failure to obtain the source page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Failure of the completion call itself, before any parsing.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API key configured for the completion service")]
    MissingApiKey,

    #[error("completion request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion service answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response carried no message content")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum StructuringError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("model output is not valid JSON: {0}")]
    ParseFailure(#[source] serde_json::Error),

    #[error("model output violates the report schema: {0}")]
    SchemaViolation(String),
}

/// Anything that sends a request down the fallback path.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Network(#[from] FetchError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),

    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Stable label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Network(_) => "network",
            PipelineError::Structuring(StructuringError::Completion(_)) => "completion",
            PipelineError::Structuring(StructuringError::ParseFailure(_)) => "parse_failure",
            PipelineError::Structuring(StructuringError::SchemaViolation(_)) => "schema_violation",
            PipelineError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            PipelineError::Unexpected(format!("pipeline stage panicked: {e}"))
        } else {
            PipelineError::Unexpected(format!("pipeline stage cancelled: {e}"))
        }
    }
}

// ── Tests ──
