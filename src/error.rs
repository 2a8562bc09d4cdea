//! Centralized error types for mailsift.
//!
//! Two severities exist. [`IngestError`] is fatal for the message being
//! parsed: it ends up as the message diagnostic. [`FieldError`] is non-fatal:
//! the offending value is dropped or defaulted and parsing continues.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors produced while importing a message.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input exceeds the configured size limit.
    #[error("'{path}' is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    /// A header line that is neither a `tag: body` item nor a continuation.
    #[error("malformed header item at line {line}: {text}")]
    MalformedHeader { line: usize, text: String },

    /// A required header is absent from the header section.
    #[error("missing {name} header in header section (ends at line {line})")]
    MissingHeader { name: &'static str, line: usize },

    /// A part declares a content type outside the supported set.
    #[error("unknown content type '{content_type}' at line {line}")]
    UnknownContentType { content_type: String, line: usize },

    /// Input ended while a structure was still open.
    #[error("unexpected end of input {context} at line {line}")]
    UnexpectedEnd { context: &'static str, line: usize },

    /// A new-message marker or archive trailer appeared while a structure was still open.
    #[error("unexpected start of next message {context} at line {line}")]
    UnexpectedMarker { context: &'static str, line: usize },

    /// MIME nesting exceeded the configured depth.
    #[error("multipart nesting deeper than {limit} levels at line {line}")]
    NestingTooDeep { limit: usize, line: usize },

    /// The canonical document could not be written.
    #[error("serialization error: {0}")]
    Serialize(String),
}

impl IngestError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The 1-based source line the error was detected at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedHeader { line, .. }
            | Self::MissingHeader { line, .. }
            | Self::UnknownContentType { line, .. }
            | Self::UnexpectedEnd { line, .. }
            | Self::UnexpectedMarker { line, .. }
            | Self::NestingTooDeep { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Convenience alias for `Result<T, IngestError>`.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Non-fatal problems found in individual header values or part bodies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown header field '{0}'")]
    UnknownField(String),

    #[error("could not parse address '{0}'")]
    Address(String),

    #[error("could not parse address list '{0}'")]
    AddressList(String),

    #[error("could not parse date '{0}'")]
    Date(String),

    #[error("could not parse content type '{0}'")]
    ContentType(String),

    #[error("unsupported {param} value '{value}'")]
    ParamValue { param: &'static str, value: String },

    #[error("residual information in Content-Type: '{0}'")]
    Residual(String),

    #[error("no message id in {field} value '{value}'")]
    MessageId { field: &'static str, value: String },

    #[error("repeated {0} header, keeping the first")]
    Duplicate(String),

    #[error("unknown transfer encoding '{0}'")]
    TransferEncoding(String),

    #[error("could not decode {encoding} body: {reason}")]
    Decode {
        encoding: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Structure(String),
}
