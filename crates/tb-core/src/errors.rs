//! Structured error types shared across the tight-binding crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and context carried by every [`TbError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Dotted identifier such as `modifier.return-count`.
    pub code: String,
    /// Sentence describing the failure.
    pub message: String,
    /// Offending modifier, kind, sizes and similar details.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier entry with the same key.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a suggested fix.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut entries = self.context.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in entries {
                write!(f, ", {key}={value}")?;
            }
            f.write_str(")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// Canonical error type for the toolkit.
///
/// Every family is a programmer error in either the lattice description or a
/// user supplied modifier. None of them is recoverable mid-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum TbError {
    /// A modifier declares a parameter outside its kind's vocabulary.
    #[error("signature error: {0}")]
    Signature(ErrorInfo),
    /// Arguments handed to a modifier do not match its binding table.
    #[error("binding error: {0}")]
    Binding(ErrorInfo),
    /// A modifier returned the wrong number of arrays.
    #[error("return count error: {0}")]
    ReturnCount(ErrorInfo),
    /// A returned array differs in shape from its input.
    #[error("return shape error: {0}")]
    ReturnShape(ErrorInfo),
    /// A returned array has an element type the kind cannot accept.
    #[error("return type error: {0}")]
    ReturnType(ErrorInfo),
    /// A modifier that is not complex-capable produced complex values.
    #[error("complexity error: {0}")]
    Complexity(ErrorInfo),
    /// A returned array contains NaN or infinite values.
    #[error("non-finite error: {0}")]
    NonFinite(ErrorInfo),
    /// Error raised from inside a user supplied modifier body.
    #[error("modifier error: {0}")]
    Modifier(ErrorInfo),
    /// Lattice description errors (unknown names, bad offsets).
    #[error("lattice error: {0}")]
    Lattice(ErrorInfo),
    /// Model assembly errors.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Configuration loading errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl TbError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            TbError::Signature(info)
            | TbError::Binding(info)
            | TbError::ReturnCount(info)
            | TbError::ReturnShape(info)
            | TbError::ReturnType(info)
            | TbError::Complexity(info)
            | TbError::NonFinite(info)
            | TbError::Modifier(info)
            | TbError::Lattice(info)
            | TbError::Model(info)
            | TbError::Config(info)
            | TbError::Serde(info) => info,
        }
    }

    /// Adds a context entry to whichever family the error belongs to.
    pub fn with_context(self, key: impl Into<String>, value: impl Display) -> Self {
        match self {
            TbError::Signature(info) => TbError::Signature(info.with_context(key, value)),
            TbError::Binding(info) => TbError::Binding(info.with_context(key, value)),
            TbError::ReturnCount(info) => TbError::ReturnCount(info.with_context(key, value)),
            TbError::ReturnShape(info) => TbError::ReturnShape(info.with_context(key, value)),
            TbError::ReturnType(info) => TbError::ReturnType(info.with_context(key, value)),
            TbError::Complexity(info) => TbError::Complexity(info.with_context(key, value)),
            TbError::NonFinite(info) => TbError::NonFinite(info.with_context(key, value)),
            TbError::Modifier(info) => TbError::Modifier(info.with_context(key, value)),
            TbError::Lattice(info) => TbError::Lattice(info.with_context(key, value)),
            TbError::Model(info) => TbError::Model(info.with_context(key, value)),
            TbError::Config(info) => TbError::Config(info.with_context(key, value)),
            TbError::Serde(info) => TbError::Serde(info.with_context(key, value)),
        }
    }

    /// Shorthand for an error raised by a modifier body.
    pub fn modifier(message: impl Into<String>) -> Self {
        TbError::Modifier(ErrorInfo::new("modifier.raised", message))
    }
}
