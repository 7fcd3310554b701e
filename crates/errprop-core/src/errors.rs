//! Structured error types shared across the errprop crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`PropError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (shapes, indices, dtypes, etc.).
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

/// Canonical error type for uncertainty propagation.
///
/// None of these are recoverable locally: falling back to "no uncertainty"
/// would yield a numerically wrong result rather than a degraded one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum PropError {
    /// Operand or region shapes cannot be reconciled or broadcast.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(ErrorInfo),
    /// Ambiguous or insufficient constructor arguments.
    #[error("invalid construction: {0}")]
    InvalidConstruction(ErrorInfo),
    /// Operation undefined for the given operands (e.g. variance of complex sensitivities).
    #[error("invalid operation: {0}")]
    InvalidOperation(ErrorInfo),
    /// Configuration values out of range or unparsable.
    #[error("config error: {0}")]
    Config(ErrorInfo),
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

impl PropError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            PropError::ShapeMismatch(info)
            | PropError::InvalidConstruction(info)
            | PropError::InvalidOperation(info)
            | PropError::Config(info) => info,
        }
    }

    /// Shorthand for a [`PropError::ShapeMismatch`] carrying both shapes as context.
    pub fn shape_mismatch(
        code: &str,
        message: impl Into<String>,
        lhs: &[usize],
        rhs: &[usize],
    ) -> Self {
        PropError::ShapeMismatch(
            ErrorInfo::new(code, message)
                .with_context("lhs", format!("{lhs:?}"))
                .with_context("rhs", format!("{rhs:?}")),
        )
    }

    /// Shorthand for a [`PropError::InvalidOperation`].
    pub fn invalid_operation(code: &str, message: impl Into<String>) -> Self {
        PropError::InvalidOperation(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`PropError::InvalidConstruction`].
    pub fn invalid_construction(code: &str, message: impl Into<String>) -> Self {
        PropError::InvalidConstruction(ErrorInfo::new(code, message))
    }
}
