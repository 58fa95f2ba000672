// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for treetrans.
//!
//! Every failure a translation run can hit is a [`TranslateError`]. Most
//! variants are scoped to a single rule: the rule executor records them in
//! the rule's outcome and moves on. [`TranslateError::ContainerIo`] is the
//! exception; it means the underlying storage can no longer be trusted and
//! aborts the run.

use std::fmt;

/// Errors that can occur while translating containers.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// A rule's source path does not exist in the source container
    SourceNotFound {
        /// Path that was looked up
        path: String,
    },

    /// A destination path holds a node of the wrong kind
    PathConflict {
        /// Conflicting path
        path: String,
        /// Node kind the operation needed
        expected: &'static str,
        /// Node kind found at the path
        found: &'static str,
    },

    /// Units are defined but dimensionally incompatible
    UnitMismatch {
        /// Source unit expression
        from: String,
        /// Destination unit expression
        to: String,
        /// Why the conversion is impossible
        reason: String,
    },

    /// Unit expression could not be parsed or names an unknown unit
    UnknownUnit {
        /// Offending expression
        unit: String,
        /// Parser or lookup message
        message: String,
    },

    /// Requested minimum dimensionality is negative
    InvalidRank {
        /// Requested rank
        requested: i64,
    },

    /// Attribute present on both sides with different values under strict merge
    AttributeConflict {
        /// Attribute key
        key: String,
    },

    /// Write would violate a template-declared dataset shape or type
    TemplateShapeMismatch {
        /// Dataset path
        path: String,
        /// Template declaration, e.g. `float64 (10, 10)`
        expected: String,
        /// What the write would have produced
        actual: String,
    },

    /// Transformation failed or produced an unexpected shape
    Transformation {
        /// Transformation name
        name: String,
        /// Error message
        message: String,
    },

    /// Element type cast failed
    InvalidCast {
        /// Source element type
        from: String,
        /// Target element type
        to: String,
        /// Error message
        message: String,
    },

    /// Rule or configuration document is invalid
    InvalidRule {
        /// Rule identifier (index or path)
        rule: String,
        /// Why it was rejected
        reason: String,
    },

    /// Underlying storage failure; aborts the run
    ContainerIo {
        /// Operation context, e.g. "TreeFileWriter::finish"
        context: String,
        /// Error message
        message: String,
    },
}

impl TranslateError {
    /// Create a "source not found" error.
    pub fn source_not_found(path: impl Into<String>) -> Self {
        TranslateError::SourceNotFound { path: path.into() }
    }

    /// Create a path conflict error.
    pub fn path_conflict(
        path: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        TranslateError::PathConflict {
            path: path.into(),
            expected,
            found,
        }
    }

    /// Create a unit mismatch error.
    pub fn unit_mismatch(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TranslateError::UnitMismatch {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown unit error.
    pub fn unknown_unit(unit: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::UnknownUnit {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Create a template shape mismatch error.
    pub fn template_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        TranslateError::TemplateShapeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a transformation error.
    pub fn transformation(name: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::Transformation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a cast error.
    pub fn invalid_cast(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TranslateError::InvalidCast {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Create an invalid rule error.
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        TranslateError::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Create a container I/O error.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::ContainerIo {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TranslateError::ContainerIo { .. })
    }

    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::SourceNotFound { .. } => "SourceNotFoundError",
            TranslateError::PathConflict { .. } => "PathConflictError",
            TranslateError::UnitMismatch { .. } => "UnitMismatchError",
            TranslateError::UnknownUnit { .. } => "UnknownUnitError",
            TranslateError::InvalidRank { .. } => "InvalidRankError",
            TranslateError::AttributeConflict { .. } => "AttributeConflictError",
            TranslateError::TemplateShapeMismatch { .. } => "TemplateShapeMismatchError",
            TranslateError::Transformation { .. } => "TransformationError",
            TranslateError::InvalidCast { .. } => "InvalidCastError",
            TranslateError::InvalidRule { .. } => "InvalidRuleError",
            TranslateError::ContainerIo { .. } => "ContainerIOError",
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            TranslateError::SourceNotFound { path } => vec![("path", path.clone())],
            TranslateError::PathConflict {
                path,
                expected,
                found,
            } => vec![
                ("path", path.clone()),
                ("expected", expected.to_string()),
                ("found", found.to_string()),
            ],
            TranslateError::UnitMismatch { from, to, reason } => vec![
                ("from", from.clone()),
                ("to", to.clone()),
                ("reason", reason.clone()),
            ],
            TranslateError::UnknownUnit { unit, message } => {
                vec![("unit", unit.clone()), ("message", message.clone())]
            }
            TranslateError::InvalidRank { requested } => {
                vec![("requested", requested.to_string())]
            }
            TranslateError::AttributeConflict { key } => vec![("key", key.clone())],
            TranslateError::TemplateShapeMismatch {
                path,
                expected,
                actual,
            } => vec![
                ("path", path.clone()),
                ("expected", expected.clone()),
                ("actual", actual.clone()),
            ],
            TranslateError::Transformation { name, message } => {
                vec![("transformation", name.clone()), ("message", message.clone())]
            }
            TranslateError::InvalidCast { from, to, message } => vec![
                ("from", from.clone()),
                ("to", to.clone()),
                ("message", message.clone()),
            ],
            TranslateError::InvalidRule { rule, reason } => {
                vec![("rule", rule.clone()), ("reason", reason.clone())]
            }
            TranslateError::ContainerIo { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::SourceNotFound { path } => {
                write!(f, "Source path '{path}' not found")
            }
            TranslateError::PathConflict {
                path,
                expected,
                found,
            } => write!(f, "Path conflict at '{path}': expected {expected}, found {found}"),
            TranslateError::UnitMismatch { from, to, reason } => {
                write!(f, "Cannot convert '{from}' to '{to}': {reason}")
            }
            TranslateError::UnknownUnit { unit, message } => {
                write!(f, "Unknown unit '{unit}': {message}")
            }
            TranslateError::InvalidRank { requested } => {
                write!(f, "Invalid minimum dimensionality {requested}: must be non-negative")
            }
            TranslateError::AttributeConflict { key } => {
                write!(f, "Attribute '{key}' differs between source and destination")
            }
            TranslateError::TemplateShapeMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "Template dataset '{path}' declares {expected}, write would produce {actual}"
            ),
            TranslateError::Transformation { name, message } => {
                write!(f, "Transformation '{name}' failed: {message}")
            }
            TranslateError::InvalidCast { from, to, message } => {
                write!(f, "Cannot cast {from} to {to}: {message}")
            }
            TranslateError::InvalidRule { rule, reason } => {
                write!(f, "Invalid rule '{rule}': {reason}")
            }
            TranslateError::ContainerIo { context, message } => {
                write!(f, "Container I/O error in {context}: {message}")
            }
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<std::io::Error> for TranslateError {
    fn from(err: std::io::Error) -> Self {
        TranslateError::ContainerIo {
            context: "IO".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for treetrans operations.
pub type Result<T> = std::result::Result<T, TranslateError>;
