//! Structured error types shared across cgmfit crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CgmError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (ion names, paths, sizes, etc.).
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
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the cgmfit engine.
///
/// Sampler-side rejections (proposals outside the prior box, non-finite
/// posterior values) never surface here; they are ordinary `-inf` densities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CgmError {
    /// Grid or observation source is missing columns, rows or ions.
    #[error("schema error: {0}")]
    Schema(ErrorInfo),
    /// Observation carries unusable uncertainties or values.
    #[error("observation error: {0}")]
    Observation(ErrorInfo),
    /// Chain shape or flatten request cannot yield samples.
    #[error("chain error: {0}")]
    Chain(ErrorInfo),
    /// Configuration value outside its documented range.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Filesystem failures while reading inputs or writing artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and parsing errors (CSV, JSON, YAML).
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

impl CgmError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CgmError::Schema(info)
            | CgmError::Observation(info)
            | CgmError::Chain(info)
            | CgmError::Config(info)
            | CgmError::Io(info)
            | CgmError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`CgmError::Schema`] with the given code and message.
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        CgmError::Schema(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`CgmError::Config`] with the given code and message.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        CgmError::Config(ErrorInfo::new(code, message))
    }

    /// Wraps a filesystem error, recording the offending path.
    pub fn io(code: impl Into<String>, path: &std::path::Path, err: impl ToString) -> Self {
        CgmError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }

    /// Wraps a serialization error.
    pub fn serde(code: impl Into<String>, err: impl ToString) -> Self {
        CgmError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}
