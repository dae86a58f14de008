//! Error reporting and diagnostics for Weft.
//!
//! This crate provides structured diagnostics with source location tracking.
//! The key invariant: no unification variables in user-facing output;
//! inference internals are sanitized before they reach a `Diagnostic`.
//!
//! Diagnostics are created by other crates (for example `weft-infer`) and
//! rendered here for display.

use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Type mismatch: expected X, got Y.
    TypeMismatch,
    /// Occurs check failed: a type would contain itself.
    InfiniteType,
    /// A name is used with no binder or definition.
    UndefinedName,
    /// Construction referenced an undeclared type.
    UndeclaredType,
    /// Constructor not declared by the named type.
    UnknownConstructor,
    /// Constructor or pattern applied to the wrong number of arguments.
    ArityMismatch,
    /// Pattern used a name that is not a variant constructor.
    PatternConstructor,
    /// A type could not be fully inferred.
    AmbiguousType,
    /// Field requirements never resolved to a declared record.
    OpenRecord,
    /// Field requirements attached to a non-record type.
    InvalidFields,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::TypeMismatch,
        Category::InfiniteType,
        Category::UndefinedName,
        Category::UndeclaredType,
        Category::UnknownConstructor,
        Category::ArityMismatch,
        Category::PatternConstructor,
        Category::AmbiguousType,
        Category::OpenRecord,
        Category::InvalidFields,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeMismatch => "type_mismatch",
            Category::InfiniteType => "infinite_type",
            Category::UndefinedName => "undefined_name",
            Category::UndeclaredType => "undeclared_type",
            Category::UnknownConstructor => "unknown_constructor",
            Category::ArityMismatch => "arity_mismatch",
            Category::PatternConstructor => "pattern_constructor",
            Category::AmbiguousType => "ambiguous_type",
            Category::OpenRecord => "open_record",
            Category::InvalidFields => "invalid_fields",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::TypeMismatch => "E0001",
            Category::InfiniteType => "E0002",
            Category::UndefinedName => "E0003",
            Category::UndeclaredType => "E0004",
            Category::UnknownConstructor => "E0005",
            Category::ArityMismatch => "E0006",
            Category::PatternConstructor => "E0007",
            Category::AmbiguousType => "E0008",
            Category::OpenRecord => "E0009",
            Category::InvalidFields => "E0010",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::TypeMismatch => "Expression type does not match expected type.",
            Category::InfiniteType => "A type would have to contain itself to solve.",
            Category::UndefinedName => "A referenced variable or helper is not defined.",
            Category::UndeclaredType => "A constructor names a type with no declaration.",
            Category::UnknownConstructor => {
                "A constructor is not declared by the type it is used with."
            }
            Category::ArityMismatch => {
                "A constructor or pattern has the wrong number of arguments."
            }
            Category::PatternConstructor => {
                "A case pattern uses a name that is not a variant constructor."
            }
            Category::AmbiguousType => "An expression's type could not be fully inferred.",
            Category::OpenRecord => {
                "Field accesses never pinned the value down to a declared record."
            }
            Category::InvalidFields => "Fields were required of a type that has none.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::TypeMismatch => {
                "Adjust the expression or its ascription so the types agree."
            }
            Category::InfiniteType => {
                "Break the cycle; a value cannot be a list (or function) of itself."
            }
            Category::UndefinedName => "Define the name, or check the spelling at the use site.",
            Category::UndeclaredType => "Declare the type, or fix the constructor's type name.",
            Category::UnknownConstructor => {
                "Use one of the declared constructors of the target type."
            }
            Category::ArityMismatch => {
                "Supply exactly the declared number of constructor arguments."
            }
            Category::PatternConstructor => {
                "Match on a declared variant constructor, or bind with a plain name."
            }
            Category::AmbiguousType => {
                "Add a type ascription on the nearest binder to pin the type down."
            }
            Category::OpenRecord => {
                "Ascribe the record type so the accessed fields can be checked."
            }
            Category::InvalidFields => "Only declared record types have fields to project.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of weft-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `weft-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
///
/// Every diagnostic carries enough context to produce an actionable error
/// message without exposing checker internals.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0001).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Option<SourceLocation>,
    /// Additional labeled spans (e.g., "conflicting type came from here").
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Warning,
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_builder() {
        let loc = SourceLocation {
            file_id: 0,
            start: 10,
            end: 20,
        };
        let diag = Diagnostic::error(Category::TypeMismatch, "expected `Int`, got `String`")
            .at(loc)
            .with_help("adjust the ascription");

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.as_deref(), Some("E0001"));
        assert_eq!(diag.category, Category::TypeMismatch);
        assert!(diag.message.contains("expected `Int`"));
        assert!(diag.help.unwrap().contains("ascription"));
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::error(Category::AmbiguousType, "cannot infer a concrete type");
        let s = format!("{diag}");
        assert!(s.starts_with("error[E0008]: cannot infer"));
    }

    #[test]
    fn warnings_share_the_category_codes() {
        let diag = Diagnostic::warning(Category::OpenRecord, "field set never closed");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.code.as_deref(), Some("E0009"));
    }

    #[test]
    fn diagnostic_error_displays_its_first_diagnostic() {
        let err = DiagnosticError::multiple(vec![
            Diagnostic::error(Category::TypeMismatch, "expected `Int`, got `Bool`"),
            Diagnostic::error(Category::AmbiguousType, "cannot infer"),
        ]);
        assert!(err.to_string().starts_with("error[E0001]"));
        assert_eq!(err.diagnostics().len(), 2);

        let single =
            DiagnosticError::single(Diagnostic::error(Category::UndefinedName, "undefined"));
        assert_eq!(single.diagnostics().len(), 1);
    }

    #[test]
    fn category_metadata_is_stable_and_unique() {
        let mut codes = std::collections::BTreeSet::new();
        for cat in Category::all() {
            assert!(!cat.as_str().is_empty());
            assert!(!cat.description().is_empty());
            assert!(!cat.example_fix().is_empty());
            assert!(
                codes.insert(cat.code()),
                "duplicate diagnostic code detected: {}",
                cat.code()
            );
        }
    }
}
