// src/error.rs
use crate::aggregate::SourceReport;

/// Failure of a single retrieval backend.
///
/// Every variant is recoverable from the pipeline's point of view: the
/// aggregator records it against the source and carries on with the others.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RetrievalError {
    pub fn code_str(&self) -> &'static str {
        match self {
            RetrievalError::Http(_) => "upstream_error",
            RetrievalError::Status { .. } => "upstream_error",
            RetrievalError::RateLimited => "rate_limited",
            RetrievalError::Timeout(_) => "timeout",
            RetrievalError::Parse(_) => "parse_error",
            RetrievalError::MissingCredentials(_) => "auth_failed",
            RetrievalError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetrievalError::Timeout(_))
    }

    /// Transient failures that another attempt may fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Decode and builder errors repeat on every attempt.
            RetrievalError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            RetrievalError::RateLimited | RetrievalError::Timeout(_) => true,
            RetrievalError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status into the matching variant.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            RetrievalError::RateLimited
        } else {
            RetrievalError::Status {
                status: status.as_u16(),
                body: body.into(),
            }
        }
    }
}

/// Failure of the generative backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generator returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Generator returned an empty response")]
    EmptyResponse,

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GenerationError {
    pub fn code_str(&self) -> &'static str {
        match self {
            GenerationError::Http(_) | GenerationError::Status { .. } => "upstream_error",
            GenerationError::Timeout(_) => "timeout",
            GenerationError::EmptyResponse => "empty_response",
            GenerationError::MissingCredentials(_) => "auth_failed",
            GenerationError::Parse(_) => "parse_error",
        }
    }
}

/// Every source handed to the aggregator failed or came back empty.
#[derive(Debug, Clone, thiserror::Error)]
#[error("No source returned any records ({} attempted)", sources.len())]
pub struct AllSourcesUnavailable {
    pub sources: Vec<SourceReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No retriever bound for category '{0}'")]
    MissingBinding(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors a pipeline invocation surfaces to its caller.
///
/// Retrieval problems never appear here: single-source failures degrade the
/// context and total failure becomes a "no grounding context" answer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn code_str(&self) -> &'static str {
        match self {
            PipelineError::GenerationFailed(e) => e.code_str(),
            PipelineError::Config(_) => "config_error",
        }
    }
}
