use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a document was rejected. This is a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportErrorCode {
    /// The file is larger than the configured ceiling.
    FileTooLarge,
    /// The file name or content encoding is not accepted, or the document is not
    /// well-formed XML.
    InvalidFormat,
    /// A required section or required model is missing.
    MissingElements,
    /// The same content is already loaded in the session.
    Duplicate,
    /// A namespace of the document is already loaded, and the policy is to reject.
    NamespaceConflict,
    /// Something in the document body could not be interpreted.
    ParseError,
}

impl ImportErrorCode {
    /// The wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ImportErrorCode::InvalidFormat => "INVALID_FORMAT",
            ImportErrorCode::MissingElements => "MISSING_ELEMENTS",
            ImportErrorCode::Duplicate => "DUPLICATE",
            ImportErrorCode::NamespaceConflict => "NAMESPACE_CONFLICT",
            ImportErrorCode::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for ImportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{code}: {message} (file {file_name})")]
/// Error returned for a rejected document. Every rejected document produces exactly one.
pub struct ImportError {
    /// Category of the error.
    pub code: ImportErrorCode,
    /// Human readable description.
    pub message: String,
    /// Name of the rejected file.
    pub file_name: String,
    /// Additional detail, such as the underlying parser error.
    pub details: Option<String>,
}

impl ImportError {
    /// Create a new import error.
    pub fn new(
        code: ImportErrorCode,
        file_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            file_name: file_name.into(),
            details: None,
        }
    }

    /// Attach details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create a `PARSE_ERROR` from any error raised while interpreting the document body.
    pub fn parse(file_name: &str, message: &str, error: impl fmt::Display) -> Self {
        Self::new(ImportErrorCode::ParseError, file_name, message).with_details(error.to_string())
    }
}

/// A non-fatal problem found while importing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportWarning {
    /// Name of the file the warning is about.
    pub file_name: String,
    /// Human readable description.
    pub message: String,
}

impl ImportWarning {
    /// Create a new warning.
    pub fn new(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.message)
    }
}
