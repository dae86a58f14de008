//! The type error taxonomy and its rendering to diagnostics.
//!
//! Errors carry the source annotation of the offending site(s) and, where
//! types are involved, sanitized surface types: unification variables are
//! renamed to `a`, `b`, … jointly across one error before they are stored,
//! so no raw variable id ever reaches user-facing output.

use weft_ast::Span;
use weft_diag::{Category, Diagnostic, SourceLocation};
use weft_types::{InferType, Label, Type, TypeDecl, VarNamer};

/// A type checking error, annotated with the source annotation `A` at the
/// relevant site(s).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError<A> {
    /// Two concrete types cannot be reconciled.
    Mismatch {
        expected: (Type, A),
        actual: (Type, A),
    },
    /// The occurs check failed: a variable appears inside its own solution.
    InfiniteType { var: (Type, A), ty: (Type, A) },
    /// A name is used with no binder, definition, or known typing.
    FreeVariable { name: String, ann: A },
    /// Construction referenced a type name with no declaration.
    UndeclaredType { name: String, ann: A },
    /// Construction referenced a constructor the declared type does not have.
    UnknownConstructor {
        ctor: String,
        type_name: String,
        decl: TypeDecl,
        ann: A,
    },
    /// A constructor was applied to the wrong number of arguments.
    ConstructorArity {
        ctor: String,
        decl: TypeDecl,
        given: usize,
        ann: A,
    },
    /// A pattern applied a constructor to the wrong number of sub-patterns.
    PatternArity {
        ctor: String,
        ty: Type,
        expected: usize,
        given: usize,
        ann: A,
    },
    /// A pattern referenced a name with no variant declaration.
    PatternConstructor { ctor: String, ann: A },
    /// A type escaped solving without resolving.
    AmbiguousType { ann: A },
    /// A type escaped solving with outstanding field requirements.
    OpenRecord {
        ann: A,
        fields: Vec<(Label, (Type, A))>,
    },
    /// Field requirements attached to a type that cannot carry fields.
    InvalidFields {
        ty: (Type, A),
        fields: Vec<(Label, (Type, A))>,
    },
}

impl<A> TypeError<A> {
    pub fn category(&self) -> Category {
        match self {
            TypeError::Mismatch { .. } => Category::TypeMismatch,
            TypeError::InfiniteType { .. } => Category::InfiniteType,
            TypeError::FreeVariable { .. } => Category::UndefinedName,
            TypeError::UndeclaredType { .. } => Category::UndeclaredType,
            TypeError::UnknownConstructor { .. } => Category::UnknownConstructor,
            TypeError::ConstructorArity { .. } => Category::ArityMismatch,
            TypeError::PatternArity { .. } => Category::ArityMismatch,
            TypeError::PatternConstructor { .. } => Category::PatternConstructor,
            TypeError::AmbiguousType { .. } => Category::AmbiguousType,
            TypeError::OpenRecord { .. } => Category::OpenRecord,
            TypeError::InvalidFields { .. } => Category::InvalidFields,
        }
    }
}

impl TypeError<Span> {
    /// Render this error as a structured diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TypeError::Mismatch { expected, actual } => Diagnostic::error(
                Category::TypeMismatch,
                format!("type mismatch: expected `{}`, got `{}`", expected.0, actual.0),
            )
            .at(span_to_location(expected.1))
            .with_label(span_to_location(actual.1), "conflicting type is here"),

            TypeError::InfiniteType { var, ty } => Diagnostic::error(
                Category::InfiniteType,
                format!(
                    "infinite type: `{}` would have to contain itself as `{}`",
                    var.0, ty.0
                ),
            )
            .at(span_to_location(var.1))
            .with_label(span_to_location(ty.1), "the containing type is here"),

            TypeError::FreeVariable { name, ann } => Diagnostic::error(
                Category::UndefinedName,
                format!("undefined name `{name}`"),
            )
            .at(span_to_location(*ann))
            .with_help(format!(
                "define `{name}` in this batch or supply it from the template context"
            )),

            TypeError::UndeclaredType { name, ann } => Diagnostic::error(
                Category::UndeclaredType,
                format!("construction of undeclared type `{name}`"),
            )
            .at(span_to_location(*ann)),

            TypeError::UnknownConstructor {
                ctor,
                type_name,
                decl,
                ann,
            } => {
                let diag = Diagnostic::error(
                    Category::UnknownConstructor,
                    format!("type `{type_name}` has no constructor `{ctor}`"),
                )
                .at(span_to_location(*ann));
                match decl {
                    TypeDecl::Variant(constructors) => {
                        let declared: Vec<&str> =
                            constructors.iter().map(|(name, _)| name.as_str()).collect();
                        diag.with_help(format!(
                            "declared constructors are: {}",
                            declared.join(", ")
                        ))
                    }
                    TypeDecl::Record(_) => diag.with_help(format!(
                        "`{type_name}` is a record; construct it as `{type_name}` itself"
                    )),
                }
            }

            TypeError::ConstructorArity {
                ctor, decl, given, ann,
            } => {
                let expected = declared_arity(ctor, decl);
                Diagnostic::error(
                    Category::ArityMismatch,
                    format!(
                        "constructor `{ctor}` expects {expected} argument(s), got {given}"
                    ),
                )
                .at(span_to_location(*ann))
            }

            TypeError::PatternArity {
                ctor,
                ty,
                expected,
                given,
                ann,
            } => Diagnostic::error(
                Category::ArityMismatch,
                format!(
                    "pattern `{ctor}` of type `{ty}` expects {expected} argument(s), got {given}"
                ),
            )
            .at(span_to_location(*ann)),

            TypeError::PatternConstructor { ctor, ann } => Diagnostic::error(
                Category::PatternConstructor,
                format!("`{ctor}` is not a variant constructor"),
            )
            .at(span_to_location(*ann))
            .with_help("records cannot be matched in patterns; bind with a plain name"),

            TypeError::AmbiguousType { ann } => Diagnostic::error(
                Category::AmbiguousType,
                "cannot infer a concrete type for this expression",
            )
            .at(span_to_location(*ann))
            .with_help("add a type ascription on the nearest binder"),

            TypeError::OpenRecord { ann, fields } => Diagnostic::error(
                Category::OpenRecord,
                format!(
                    "cannot determine a record with the required fields {{{}}}",
                    format_fields(fields)
                ),
            )
            .at(span_to_location(*ann))
            .with_help("ascribe the record type so the accessed fields can be checked"),

            TypeError::InvalidFields { ty, fields } => Diagnostic::error(
                Category::InvalidFields,
                format!(
                    "type `{}` has no fields, but {{{}}} was required of it",
                    ty.0,
                    format_fields(fields)
                ),
            )
            .at(span_to_location(ty.1)),
        }
    }
}

fn format_fields(fields: &[(Label, (Type, Span))]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|(label, (ty, _))| format!("{label}: {ty}"))
        .collect();
    parts.join(", ")
}

fn declared_arity(ctor: &str, decl: &TypeDecl) -> usize {
    match decl {
        TypeDecl::Variant(constructors) => constructors
            .iter()
            .find(|(name, _)| name == ctor)
            .map(|(_, args)| args.len())
            .unwrap_or(0),
        TypeDecl::Record(fields) => fields.len(),
    }
}

/// Bundle a session's errors for collaborators that consume diagnostics
/// (the template driver reports them this way).
pub fn diagnostic_error(errors: &[TypeError<Span>]) -> weft_diag::DiagnosticError {
    weft_diag::DiagnosticError::multiple(errors.iter().map(TypeError::to_diagnostic).collect())
}

pub fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}

// ---------------------------------------------------------------------------
// Sanitized payload construction
// ---------------------------------------------------------------------------

/// Render one inference type through a shared namer, pairing it with its
/// annotation.
pub(crate) fn display_of<A: Clone>(ty: &InferType<A>, namer: &mut VarNamer) -> (Type, A) {
    (ty.to_display_type(namer), ty.ann().clone())
}

/// Render a field-constraint list through a shared namer.
pub(crate) fn display_fields<A: Clone>(
    fields: &[(Label, InferType<A>)],
    namer: &mut VarNamer,
) -> Vec<(Label, (Type, A))> {
    fields
        .iter()
        .map(|(label, ty)| (label.clone(), display_of(ty, namer)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::FileId;
    use weft_types::LitKind;

    fn s() -> Span {
        Span::new(FileId(0), 0, 1)
    }

    #[test]
    fn mismatch_renders_both_sides() {
        let err = TypeError::Mismatch {
            expected: (Type::Lit(LitKind::Int), s()),
            actual: (Type::Lit(LitKind::String), s()),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.category, Category::TypeMismatch);
        assert_eq!(
            diag.message,
            "type mismatch: expected `Int`, got `String`"
        );
        assert_eq!(diag.labels.len(), 1);
    }

    #[test]
    fn unknown_constructor_lists_declared_ones() {
        let decl = TypeDecl::Variant(vec![
            ("Circle".into(), vec![Type::Lit(LitKind::Float)]),
            ("Point".into(), vec![]),
        ]);
        let err = TypeError::UnknownConstructor {
            ctor: "Square".into(),
            type_name: "Shape".into(),
            decl,
            ann: s(),
        };
        let diag = err.to_diagnostic();
        assert!(diag.help.unwrap().contains("Circle, Point"));
    }

    #[test]
    fn open_record_message_shows_required_fields() {
        let err = TypeError::OpenRecord {
            ann: s(),
            fields: vec![(Label::new("name"), (Type::Lit(LitKind::String), s()))],
        };
        let diag = err.to_diagnostic();
        assert!(diag.message.contains("{name: String}"));
    }
}
