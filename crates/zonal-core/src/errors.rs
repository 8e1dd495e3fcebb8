//! Structured error types shared across the zonal crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::SourceLocation;

/// Structured payload attached to every [`ZonalError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (locations, ranges, counts).
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

    /// Records the source location the error refers to.
    pub fn at(self, location: &SourceLocation) -> Self {
        self.with_context("location", location)
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(location) = self.context.get("location") {
            write!(f, " at {location}")?;
        }
        let rest: Vec<String> = self
            .context
            .iter()
            .filter(|(key, _)| key.as_str() != "location")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if !rest.is_empty() {
            write!(f, " ({})", rest.join(", "))?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type of the analysis core.
///
/// `Infeasible` and `EmptyBranch` only abandon the branch being explored and
/// are absorbed by the nearest enclosing exploration region. Every other
/// family propagates to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ZonalError {
    /// The real and implementation domains of a value became inconsistent.
    #[error("infeasible branch: {0}")]
    Infeasible(ErrorInfo),
    /// Every branch of a region was infeasible.
    #[error("empty branch: {0}")]
    EmptyBranch(ErrorInfo),
    /// A replayed decision trace disagrees with the live computation.
    #[error("trace desynchronization: {0}")]
    Desync(ErrorInfo),
    /// Defect in the core itself (bad controller state, malformed arguments).
    #[error("invariant violation: {0}")]
    Invariant(ErrorInfo),
    /// Rejected settings or exhausted exploration limits.
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl ZonalError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ZonalError::Infeasible(info)
            | ZonalError::EmptyBranch(info)
            | ZonalError::Desync(info)
            | ZonalError::Invariant(info)
            | ZonalError::Config(info)
            | ZonalError::Serde(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the family.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        match self {
            ZonalError::Infeasible(info) => ZonalError::Infeasible(info.with_context(key, value)),
            ZonalError::EmptyBranch(info) => ZonalError::EmptyBranch(info.with_context(key, value)),
            ZonalError::Desync(info) => ZonalError::Desync(info.with_context(key, value)),
            ZonalError::Invariant(info) => ZonalError::Invariant(info.with_context(key, value)),
            ZonalError::Config(info) => ZonalError::Config(info.with_context(key, value)),
            ZonalError::Serde(info) => ZonalError::Serde(info.with_context(key, value)),
        }
    }

    /// Whether the error only abandons the branch currently being explored.
    pub fn is_branch_local(&self) -> bool {
        matches!(self, ZonalError::Infeasible(_) | ZonalError::EmptyBranch(_))
    }
}
