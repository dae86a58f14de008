//! Tracing types for solver observability.
//!
//! These types capture step-by-step traces of unification, enabling
//! downstream tooling to expose the checker's reasoning process. Tracing is
//! opt-in via [`Solver::enable_tracing`](crate::Solver::enable_tracing) —
//! zero overhead when disabled.

use serde::Serialize;

/// A single step in a unification trace.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
    pub detail: String,
}

/// What action was taken during a unification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// The two sides were already the same class — no-op.
    Identity,
    /// Structural recursion: decompose compound shapes
    /// (e.g. `List(A) ~ List(B)` → `A ~ B`).
    Decompose,
    /// A variable's class was merged into another type's class.
    Bind,
    /// Two field-constraint lists were merged by label.
    MergeFields,
    /// Occurs check fired — infinite type prevented.
    OccursCheck,
    /// Unification failed — type mismatch.
    Error,
}
