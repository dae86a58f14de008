//! Constraint-based type inference for Weft template expressions.
//!
//! This crate implements:
//! - Bottom-up constraint generation over assumption sets, so mutually
//!   recursive top-level definitions check without pre-declaration
//! - Union-find unification with an occurs check and multi-error
//!   accumulation
//! - Deferred field constraints: a variable can require `name: String`
//!   before anything is known about the record it projects from
//! - A lowering pass that refuses any type left unresolved after solving
//!
//! The solver accumulates diagnostics instead of short-circuiting, and
//! every constraint carries provenance for error reporting.

mod check;
mod error;

pub mod assume;
pub mod generate;
pub mod lower;
pub mod solve;
pub mod store;
pub mod trace;

use weft_types::{InferType, Label, TypeVarId};

pub use check::{type_check, type_check_all, type_check_incremental, type_tree};
pub use error::{TypeError, diagnostic_error};
pub use generate::{Generated, Generator, generate_constraints};
pub use lower::{lower_expr, substitute_expr};
pub use solve::{SolveOptions, Solver, solve_constraints};

// Re-export for convenience.
pub use weft_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use weft_types::Substitutions;

// ---------------------------------------------------------------------------
// Provenance: why a constraint exists
// ---------------------------------------------------------------------------

/// Why a constraint was generated.
///
/// Every constraint records its origin so that when unification fails, the
/// error message can explain what required the two types to agree.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// Uses of a lambda binder must match the binder's type.
    BinderUse,
    /// The function position of an application must accept the argument.
    Application,
    /// List elements must match the declared element type.
    ListElement,
    /// The mapped function must be an arrow.
    MapFunction,
    /// The mapped source must be a list of the function's domain.
    MapSource,
    /// Constructor argument must match the declared argument type.
    ConstructorArg { index: usize },
    /// Every case arm must produce the same result type.
    CaseArm,
    /// A pattern must match the scrutinee type.
    PatternMatch,
    /// Field projection requires the field on the projected value.
    FieldAccess { label: Label },
    /// Uses of a top-level name must match its definition.
    Definition { name: String },
}

// ---------------------------------------------------------------------------
// Type constraints
// ---------------------------------------------------------------------------

/// A constraint generated during inference.
///
/// The generator appends these to a flat list; the solver processes each
/// one independently. Field requirements travel attached to the inference
/// types themselves, so equality is the only constraint form.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint<A> {
    /// Two inference types must be equal.
    Equal {
        expected: InferType<A>,
        actual: InferType<A>,
        reason: Reason,
    },
}

// ---------------------------------------------------------------------------
// Name supply: fresh unification variables
// ---------------------------------------------------------------------------

/// Generates fresh unification variable ids for one check session.
///
/// The counter is per-session and starts at zero: sessions never share
/// mutable state, and a fixed starting point keeps output byte-identical
/// across runs.
#[derive(Debug, Default)]
pub struct VarSupply {
    next: u32,
}

impl VarSupply {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Create a supply with an explicit starting offset.
    ///
    /// Exists for tests that combine hand-allocated ids with generated ones
    /// and need the ranges not to overlap.
    pub fn with_offset(next: u32) -> Self {
        Self { next }
    }

    /// Allocate a fresh variable id.
    pub fn fresh_id(&mut self) -> TypeVarId {
        let id = TypeVarId(self.next);
        self.next += 1;
        id
    }

    /// Allocate a fresh unresolved variable annotated with `ann`.
    pub fn fresh<A>(&mut self, ann: A) -> InferType<A> {
        InferType::Var {
            ann,
            id: self.fresh_id(),
            fields: Vec::new(),
        }
    }
}


#[cfg(test)]
mod prop_tests;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{LitKind, Shape};

    #[test]
    fn supply_ids_are_unique_and_monotone() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_id();
        let b = supply.fresh_id();
        assert_eq!(a, TypeVarId(0));
        assert_eq!(b, TypeVarId(1));
    }

    #[test]
    fn supply_offset_shifts_ids() {
        let mut supply = VarSupply::with_offset(100);
        assert_eq!(supply.fresh_id(), TypeVarId(100));
    }

    #[test]
    fn fresh_variables_start_without_fields() {
        let mut supply = VarSupply::new();
        let ty = supply.fresh(());
        assert!(ty.fields().is_empty());
        assert_eq!(ty.var_id(), Some(TypeVarId(0)));
    }

    #[test]
    fn constraints_compare_structurally() {
        let left = Constraint::Equal {
            expected: InferType::Known {
                ann: (),
                shape: Shape::<()>::Lit(LitKind::Int),
                fields: vec![],
            },
            actual: InferType::Var {
                ann: (),
                id: TypeVarId(0),
                fields: vec![],
            },
            reason: Reason::BinderUse,
        };
        assert_eq!(left, left.clone());
    }
}
