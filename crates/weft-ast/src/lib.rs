//! Elaborated expression trees for the Weft template compiler.
//!
//! The template front-end parses surface templates and lowers the embedded
//! expressions into the [`Expr`] tree defined here. Every node carries an
//! annotation `A` (the front-end uses [`Span`]), and the checker rebuilds
//! the same tree with each annotation replaced by `(Type, A)`.

use weft_types::{Label, LitKind, Type};

/// Identifies a source template in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for elaborator-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Unit,
}

impl Lit {
    /// The ground type of this literal value.
    pub fn kind(&self) -> LitKind {
        match self {
            Lit::Int(_) => LitKind::Int,
            Lit::Float(_) => LitKind::Float,
            Lit::Bool(_) => LitKind::Bool,
            Lit::String(_) => LitKind::String,
            Lit::Unit => LitKind::Unit,
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An elaborated template expression, annotated with `A` at every node.
///
/// The elaborator guarantees: `List` carries its element type, `Con` carries
/// the owning type name, and `Foreign` carries a fully resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<A> {
    /// Literal value.
    Lit { ann: A, value: Lit },

    /// Variable reference.
    Var { ann: A, name: String },

    /// Single-parameter lambda, with an optional type ascription on the
    /// binder.
    Lam {
        ann: A,
        param: String,
        annotation: Option<Type>,
        body: Box<Expr<A>>,
    },

    /// Function application: `func(arg)`.
    App {
        ann: A,
        func: Box<Expr<A>>,
        arg: Box<Expr<A>>,
    },

    /// List literal with the element type supplied by the elaborator.
    List {
        ann: A,
        elem: Type,
        items: Vec<Expr<A>>,
    },

    /// Polymorphic list map: `map(func, list)`.
    MapList {
        ann: A,
        func: Box<Expr<A>>,
        list: Box<Expr<A>>,
    },

    /// Variant or record construction. For records the constructor name is
    /// the type name itself.
    Con {
        ann: A,
        ctor: String,
        type_name: String,
        args: Vec<Expr<A>>,
    },

    /// Case analysis over a scrutinee. `alts` is non-empty.
    Case {
        ann: A,
        scrutinee: Box<Expr<A>>,
        alts: Vec<(Pattern<A>, Expr<A>)>,
    },

    /// Record field projection.
    Prj {
        ann: A,
        record: Box<Expr<A>>,
        field: Label,
    },

    /// Opaque external binding with a known type.
    Foreign { ann: A, name: String, ty: Type },
}

impl<A> Expr<A> {
    pub fn ann(&self) -> &A {
        match self {
            Expr::Lit { ann, .. }
            | Expr::Var { ann, .. }
            | Expr::Lam { ann, .. }
            | Expr::App { ann, .. }
            | Expr::List { ann, .. }
            | Expr::MapList { ann, .. }
            | Expr::Con { ann, .. }
            | Expr::Case { ann, .. }
            | Expr::Prj { ann, .. }
            | Expr::Foreign { ann, .. } => ann,
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A case-alternative pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern<A> {
    /// Bind the scrutinee to a name.
    Var { ann: A, name: String },

    /// Match a variant constructor and its arguments.
    Con {
        ann: A,
        ctor: String,
        args: Vec<Pattern<A>>,
    },
}

impl<A> Pattern<A> {
    pub fn ann(&self) -> &A {
        match self {
            Pattern::Var { ann, .. } | Pattern::Con { ann, .. } => ann,
        }
    }

    /// The names this pattern binds, in left-to-right order.
    pub fn binders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_binders(&mut names);
        names
    }

    fn collect_binders<'p>(&'p self, names: &mut Vec<&'p str>) {
        match self {
            Pattern::Var { name, .. } => names.push(name.as_str()),
            Pattern::Con { args, .. } => {
                for arg in args {
                    arg.collect_binders(names);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(FileId(0), 4, 10);
        let b = Span::new(FileId(0), 8, 20);
        assert_eq!(a.merge(b), Span::new(FileId(0), 4, 20));
    }

    #[test]
    fn synthetic_spans_use_a_reserved_file() {
        assert_eq!(Span::synthetic().file, FileId(u32::MAX));
    }

    #[test]
    fn literal_kinds() {
        assert_eq!(Lit::Int(3).kind(), LitKind::Int);
        assert_eq!(Lit::String("x".into()).kind(), LitKind::String);
        assert_eq!(Lit::Unit.kind(), LitKind::Unit);
    }

    #[test]
    fn pattern_binders_are_left_to_right() {
        let pat: Pattern<()> = Pattern::Con {
            ann: (),
            ctor: "Pair".into(),
            args: vec![
                Pattern::Var {
                    ann: (),
                    name: "left".into(),
                },
                Pattern::Con {
                    ann: (),
                    ctor: "Wrap".into(),
                    args: vec![Pattern::Var {
                        ann: (),
                        name: "right".into(),
                    }],
                },
            ],
        };
        assert_eq!(pat.binders(), vec!["left", "right"]);
    }
}
