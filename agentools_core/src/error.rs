//! error.rs – Error types for the tool registry and dispatcher

use serde_json::Error as JsonError;
use std::borrow::Cow;
use thiserror::Error;

/*───────────────────────────────────────────────────────────────────────────*/

/// The model's output could not be read as the structure we asked for.
///
/// Keeps the real message but avoids an extra allocation
/// when you can borrow the original `&'static str`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FormatError(pub Cow<'static, str>);

/// Keyword arguments did not fit the tool's parameters (JSON → args).
///
/// Carries the full `serde_json::Error` so callers can down‑cast or
/// inspect line/column information.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DeserializationError(#[from] pub JsonError);

/// The registry document could not be read, written or decoded.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read tool registry at {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write tool registry at {location}: {source}")]
    Write {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool registry at {location} is corrupt: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: JsonError,
    },

    #[error("failed to encode tool registry: {0}")]
    Encode(#[source] JsonError),
}

/// Failures of the language model collaborator.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("LLM is not configured: missing {0}")]
    NotConfigured(&'static str),

    /// A scripted model was asked for more responses than it was given.
    #[error("no scripted response left for prompt #{0}")]
    Exhausted(usize),
}

/*───────────────────────────────────────────────────────────────────────────*/

/// All the ways registration or dispatch can fail.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A module could not be imported or its source is unavailable.
    #[error("Failed to load module {module}: {reason}")]
    Resolution {
        module: String,
        reason: Cow<'static, str>,
    },

    /// The module description returned by the model is unusable.
    #[error("Invalid tool format from LLM: {0}")]
    Format(#[from] FormatError),

    /// The tool selection returned by the model is not valid JSON of the
    /// expected shape.
    #[error("Invalid tool selection from LLM: {0}")]
    SelectionFormat(#[source] JsonError),

    #[error("module '{module}' has no attribute '{name}'")]
    AttributeMissing { module: String, name: String },

    #[error("Tool function '{name}' not found")]
    FunctionNotFound { name: Cow<'static, str> },

    #[error(transparent)]
    Deserialize(#[from] DeserializationError),

    /// The tool itself reported an error.
    #[error("Tool '{name}' failed: {message}")]
    Failed { name: Cow<'static, str>, message: String },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ToolError {
    pub(crate) fn resolution(module: &str, reason: impl Into<Cow<'static, str>>) -> Self {
        ToolError::Resolution {
            module: module.to_owned(),
            reason: reason.into(),
        }
    }

    /// Whether the dispatcher treats this error as "no result" instead of
    /// passing it on to the caller.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            ToolError::SelectionFormat(_)
                | ToolError::Resolution { .. }
                | ToolError::AttributeMissing { .. }
                | ToolError::FunctionNotFound { .. }
        )
    }
}
