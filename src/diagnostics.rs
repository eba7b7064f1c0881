//! Field-addressed validation diagnostics
//!
//! Validators never fail fast on the first problem. Each one appends
//! [`Diagnostic`]s to a shared [`Diagnostics`] aggregator so that a single
//! run surfaces every problem in the configuration at once. The aggregator
//! converts to a single reportable [`ValidationErrors`] at the validation
//! boundary; an empty aggregator is success.

use std::fmt;

/// A structured locator for a configuration node.
///
/// Paths are built with [`child`](FieldPath::child) and
/// [`index`](FieldPath::index) and render in the configuration's wire form,
/// e.g. `compute[2].platform.aws.type`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// Create a path rooted at the given field name
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// Append a child field to the path
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }

    /// Append a list index to the path
    pub fn index(&self, idx: usize) -> Self {
        Self(format!("{}[{}]", self.0, idx))
    }

    /// The rendered dotted path
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How serious a diagnostic is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot be provisioned as declared
    Error,
    /// The configuration is suspect but provisioning may proceed
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single validation finding, addressed to one configuration field.
///
/// Diagnostics are created by exactly one validator and never mutated
/// afterwards; the aggregator owns them for the remainder of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The configuration node this diagnostic concerns
    pub path: FieldPath,
    /// The offending value, when one exists
    pub value: Option<String>,
    /// Human-readable detail, safe to render to an end user
    pub detail: String,
    /// Severity of the finding
    pub severity: Severity,
}

impl Diagnostic {
    /// A field holds an invalid value
    pub fn invalid(path: FieldPath, value: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path,
            value: Some(value.into()),
            detail: detail.into(),
            severity: Severity::Error,
        }
    }

    /// A required field or condition is missing
    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path,
            value: None,
            detail: detail.into(),
            severity: Severity::Error,
        }
    }

    /// An infrastructure lookup failed while validating this field.
    ///
    /// The failure is field-scoped so the run can continue; the lookup
    /// error is wrapped with context rather than rendered bare.
    pub fn internal(path: FieldPath, err: impl fmt::Display) -> Self {
        Self {
            path,
            value: None,
            detail: format!("internal error: {err}"),
            severity: Severity::Error,
        }
    }

    /// A suspect but non-fatal finding
    pub fn warning(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path,
            value: None,
            detail: detail.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: invalid value {:?}: {}", self.path, value, self.detail),
            None => write!(f, "{}: {}", self.path, self.detail),
        }
    }
}

/// Ordered accumulator for diagnostics.
///
/// Entries are kept in call order and never deduplicated, so output is
/// deterministic for a given input and downstream reporting can group
/// entries by field-path subtree.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append all diagnostics from another aggregator, preserving order
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// True when no diagnostics have been collected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of collected diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate the collected diagnostics in order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Convert to a single combined error, or `Ok(())` when empty.
    ///
    /// This combine-or-absent conversion is the sole boundary through
    /// which validators report failure.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.entries.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                diagnostics: self.entries,
            })
        }
    }
}

/// All diagnostics from one validation run, combined into one error
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationErrors {
    diagnostics: Vec<Diagnostic>,
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    /// The individual diagnostics, in the order they were collected
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{diagnostic}")?;
        }
        f.write_str("]")
    }
}
