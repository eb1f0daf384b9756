//! Semantic checks on a loaded [`SandboxConfig`].
//!
//! Parsing already rejects unknown keys and wrong types; this pass catches
//! values that parse fine but cannot work.

use crate::{
    error::{Error, Result},
    schema::SandboxConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Config field the diagnostic is about, e.g. "max_attempts".
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.field, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Collapse error diagnostics into [`Error::Invalid`]. Warnings pass.
    pub fn into_result(self) -> Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let message = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Invalid(message))
    }

    fn push(&mut self, severity: Severity, field: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            field,
            message: message.into(),
        });
    }
}

/// Validate a configuration.
#[must_use]
pub fn validate(config: &SandboxConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if let Some(root) = &config.root {
        if root.as_os_str().is_empty() {
            result.push(Severity::Error, "root", "root must not be empty");
        } else if root.is_relative() {
            result.push(
                Severity::Warning,
                "root",
                format!(
                    "relative root {} depends on the working directory",
                    root.display()
                ),
            );
        }
    }

    if config.max_attempts == Some(0) {
        result.push(
            Severity::Error,
            "max_attempts",
            "max_attempts must be at least 1",
        );
    }

    if config.test_suffixes.is_empty() {
        result.push(
            Severity::Warning,
            "test_suffixes",
            "no test suffixes, caller-context names will always be unknown-test-class-<n>",
        );
    }
    if config.test_suffixes.iter().any(|s| s.trim().is_empty()) {
        result.push(
            Severity::Error,
            "test_suffixes",
            "test suffixes must not be blank",
        );
    }

    result
}
