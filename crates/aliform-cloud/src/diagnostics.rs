//! Structured operation diagnostics
//!
//! Every operation reports zero or more diagnostics; an empty list means
//! success. Sensitive values are scrubbed before diagnostics leave the engine.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::error::Error;

const REDACTED: &str = "<sensitive>";

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single structured failure or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Symbolic code (control-plane code or error taxonomy name)
    pub code: String,

    pub summary: String,

    /// Cause chain, outermost first
    pub detail: Option<String>,

    /// Field path the diagnostic refers to
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            summary: summary.into(),
            detail: None,
            field: None,
        }
    }

    pub fn warning(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, summary)
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn redact(&mut self, secrets: &[String]) {
        for secret in secrets {
            self.summary = self.summary.replace(secret.as_str(), REDACTED);
            if let Some(detail) = self.detail.as_mut() {
                *detail = detail.replace(secret.as_str(), REDACTED);
            }
        }
    }
}

impl From<&CloudError> for Diagnostic {
    fn from(err: &CloudError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            severity: Severity::Error,
            code: err.code(),
            summary: err.to_string(),
            detail: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\ncaused by: "))
            },
            field: None,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.summary)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

/// Ordered list of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics for the outcome of an operation
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::new(),
            Err(err) => Self(vec![Diagnostic::from(err)]),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn push_error(&mut self, err: &CloudError) {
        self.0.push(Diagnostic::from(err));
    }

    pub fn push_field_error(
        &mut self,
        code: impl Into<String>,
        summary: impl Into<String>,
        field: impl Into<String>,
    ) {
        self.0.push(Diagnostic::error(code, summary).with_field(field));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Replace every occurrence of the given secrets with a placeholder
    pub fn redact(&mut self, secrets: &[String]) {
        if secrets.is_empty() {
            return;
        }
        for diagnostic in &mut self.0 {
            diagnostic.redact(secrets);
        }
    }

    /// Collapse error diagnostics into a single validation error
    pub fn into_result(self) -> Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let message = self
            .0
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.summary.clone())
            .collect::<Vec<_>>()
            .join("; ");
        Err(CloudError::Validation(message))
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
