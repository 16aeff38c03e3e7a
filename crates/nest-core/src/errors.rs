//! Structured error types shared across NEST crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NestError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for NEST experiments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NestError {
    /// Invalid experiment configuration: malformed rules, unknown ids,
    /// exhausted blocklists, misplaced additions.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Persisted data contradicts an invariant (duplicate votes, missing
    /// rounds, history referencing unknown groups).
    #[error("integrity error: {0}")]
    Integrity(ErrorInfo),
    /// Failures raised by the storage backend.
    #[error("storage error: {0}")]
    Storage(ErrorInfo),
    /// Serialization, parsing and file I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl NestError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NestError::Config(info)
            | NestError::Integrity(info)
            | NestError::Storage(info)
            | NestError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error with the given code and message.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        NestError::Config(ErrorInfo::new(code, message))
    }

    /// Shorthand for an integrity error with the given code and message.
    pub fn integrity(code: impl Into<String>, message: impl Into<String>) -> Self {
        NestError::Integrity(ErrorInfo::new(code, message))
    }

    /// Returns `true` for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, NestError::Config(_))
    }

    /// Returns `true` for integrity violations.
    pub fn is_integrity(&self) -> bool {
        matches!(self, NestError::Integrity(_))
    }
}
