use thiserror::Error;

use crate::diagnose::{self, Diagnosis};

/// Every failure a pipeline call can surface to its caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Disabled pipeline or unusable server address. Raised only while
    /// constructing a pipeline.
    #[error("configuration error: {0}")]
    Config(String),
    /// The query could not be turned into a field mapping.
    #[error("cannot encode query: {0}")]
    Encoding(String),
    /// The query is well formed but unusable, e.g. an empty audio buffer.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("cannot read attachment: {0}")]
    Io(#[from] std::io::Error),
    /// The request never produced an HTTP status.
    #[error("connection failed: {0}")]
    Connectivity(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The response body is not JSON at all.
    #[error("malformed JSON in response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    /// The response body is JSON, but not the expected shape.
    #[error("unexpected response shape: {message}")]
    Validation { message: String, body: String },
    #[error("unsupported audio format (leading bytes {0:02x?})")]
    UnsupportedFormat(Vec<u8>),
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl PipelineError {
    /// Map a `serde_json` failure on `body` onto the decode/validation split.
    pub fn from_json(err: serde_json::Error, body: &[u8]) -> Self {
        use serde_json::error::Category;
        let body = String::from_utf8_lossy(body).into_owned();
        match err.classify() {
            // A type mismatch can be reported before a later syntax error.
            Category::Data => match serde_json::from_str::<serde::de::IgnoredAny>(&body) {
                Ok(_) => PipelineError::Validation {
                    message: err.to_string(),
                    body,
                },
                Err(syntax) => PipelineError::Decode {
                    source: syntax,
                    body,
                },
            },
            Category::Syntax | Category::Eof | Category::Io => {
                PipelineError::Decode { source: err, body }
            }
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Http { status, .. } => Some(*status),
            PipelineError::Connectivity(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The actionable hint attached to this failure, if one applies.
    pub fn diagnosis(&self) -> Option<Diagnosis> {
        diagnose::diagnose(self)
    }
}

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
