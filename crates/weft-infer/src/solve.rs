//! The unifier: solves equality constraints against the union-find store.
//!
//! The solver processes each constraint independently and accumulates
//! diagnostics, so one failed constraint never hides the others. Field
//! constraints attached to the two sides are merged by label on every
//! union; two requirements for the same field unify their types.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use weft_types::{InferType, Label, Shape, Substitutions, TypeVarId, VarNamer};

use crate::error::{display_fields, display_of};
use crate::store::Store;
use crate::trace::{UnifyAction, UnifyStep};
use crate::{Constraint, TypeError};

/// Solver configuration.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Maximum number of trace steps recorded when tracing is enabled;
    /// recording stops past the cap so a pathological session cannot grow
    /// the trace without bound.
    pub trace_limit: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self { trace_limit: 1024 }
    }
}

/// Solves type constraints via unification over a union-find store.
///
/// Owns the store and the accumulated errors for one check session.
pub struct Solver<A> {
    store: Store<A>,
    errors: Vec<TypeError<A>>,
    options: SolveOptions,
    tracing: bool,
    trace: Vec<UnifyStep>,
}

impl<A: Clone> Solver<A> {
    pub fn new() -> Self {
        Self::with_options(SolveOptions::default())
    }

    pub fn with_options(options: SolveOptions) -> Self {
        Self {
            store: Store::new(),
            errors: Vec::new(),
            options,
            tracing: false,
            trace: Vec::new(),
        }
    }

    /// Enable step-by-step unification tracing for observability tools.
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    /// Whether unification tracing is currently enabled.
    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// The collected unification trace.
    pub fn trace(&self) -> &[UnifyStep] {
        &self.trace
    }

    pub fn errors(&self) -> &[TypeError<A>] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<TypeError<A>> {
        std::mem::take(&mut self.errors)
    }

    /// Solve a batch of constraints. Each constraint is processed
    /// independently; failures accumulate as errors.
    pub fn solve(&mut self, constraints: Vec<Constraint<A>>) {
        for constraint in constraints {
            match constraint {
                Constraint::Equal {
                    expected, actual, ..
                } => self.unify(&expected, &actual),
            }
        }
    }

    /// Extract the solved classes as a substitution map.
    pub fn substitutions(&mut self) -> Substitutions<A> {
        self.store.substitutions()
    }

    /// The class representative of a type (path-compresses internally).
    pub fn repr(&mut self, ty: &InferType<A>) -> InferType<A> {
        self.store.repr(ty)
    }

    // -----------------------------------------------------------------------
    // Most-general-unifier
    // -----------------------------------------------------------------------

    /// Unify two inference types.
    ///
    /// Dispatches on the outer shapes after reading the class
    /// representatives, so a variable that already resolved behaves as its
    /// solution.
    pub fn unify(&mut self, expected: &InferType<A>, actual: &InferType<A>) {
        let expected = self.resolve(expected);
        let actual = self.resolve(actual);

        match (&expected, &actual) {
            (InferType::Var { ann, id, fields, .. }, other)
            | (other, InferType::Var { ann, id, fields, .. }) => {
                let (ann, id, fields) = (ann.clone(), *id, fields.clone());
                self.unify_var(&ann, id, &fields, other);
            }

            (
                InferType::Known {
                    shape: expected_shape,
                    fields: expected_fields,
                    ..
                },
                InferType::Known {
                    shape: actual_shape,
                    fields: actual_fields,
                    ..
                },
            ) => match (expected_shape, actual_shape) {
                (Shape::Named(left), Shape::Named(right)) => {
                    if left != right {
                        self.mismatch(&expected, &actual);
                        return;
                    }
                    self.push_step(
                        UnifyAction::Decompose,
                        &expected,
                        &actual,
                        format!("{left} ~ {right}: reconcile field requirements"),
                    );
                    // Both sides name the same declared type; their field
                    // requirements are consistency constraints and must
                    // agree pairwise.
                    let _ = self.unify_fields(expected_fields.clone(), actual_fields.clone());
                }

                (Shape::Lit(left), Shape::Lit(right)) => {
                    if left != right {
                        self.mismatch(&expected, &actual);
                        return;
                    }
                    self.push_step(
                        UnifyAction::Identity,
                        &expected,
                        &actual,
                        "literal types already equal".into(),
                    );
                    self.require_no_fields(&expected);
                    self.require_no_fields(&actual);
                }

                (Shape::Arrow(left_dom, left_cod), Shape::Arrow(right_dom, right_cod)) => {
                    self.push_step(
                        UnifyAction::Decompose,
                        &expected,
                        &actual,
                        "A -> B ~ C -> D: unify domains and codomains".into(),
                    );
                    self.unify(left_dom, right_dom);
                    self.unify(left_cod, right_cod);
                    self.require_no_fields(&expected);
                    self.require_no_fields(&actual);
                }

                (Shape::List(left), Shape::List(right)) => {
                    self.push_step(
                        UnifyAction::Decompose,
                        &expected,
                        &actual,
                        "List(A) ~ List(B): unify elements".into(),
                    );
                    self.unify(left, right);
                    self.require_no_fields(&expected);
                    self.require_no_fields(&actual);
                }

                _ => self.mismatch(&expected, &actual),
            },
        }
    }

    /// Replace a variable by its class representative, if it has one.
    ///
    /// An occurrence that carries its own field requirements is left alone:
    /// `unify_var` folds those into the class before continuing, and
    /// resolving here would drop them.
    fn resolve(&mut self, ty: &InferType<A>) -> InferType<A> {
        if let InferType::Var { id, fields, .. } = ty
            && fields.is_empty()
            && let Some(rep) = self.store.lookup_var(*id)
        {
            rep
        } else {
            ty.clone()
        }
    }

    /// Unify a variable occurrence with another type.
    fn unify_var(
        &mut self,
        ann: &A,
        id: TypeVarId,
        var_fields: &[(Label, InferType<A>)],
        other: &InferType<A>,
    ) {
        match self.store.lookup_var(id) {
            // Never seen: bind directly.
            None => self.safe_union(ann, id, var_fields, other),
            Some(rep) => match &rep {
                // Its own class representative: bind directly.
                InferType::Var { id: rep_id, .. } if *rep_id == id => {
                    self.safe_union(ann, id, var_fields, other)
                }
                // Resolved to another variable: continue with that one.
                InferType::Var { .. } => self.unify(&rep, other),
                // Resolved to a known shape: fold this occurrence's field
                // requirements into the class, then unify the solution with
                // the other side.
                InferType::Known { .. } => {
                    self.safe_union(ann, id, var_fields, &rep);
                    if let Some(new_rep) = self.store.lookup_var(id) {
                        self.unify(&new_rep, other);
                    }
                }
            },
        }
    }

    /// Merge the class of variable `id` into `other`'s class, unifying the
    /// two field lists and running the occurs check first.
    fn safe_union(
        &mut self,
        ann: &A,
        id: TypeVarId,
        var_fields: &[(Label, InferType<A>)],
        other: &InferType<A>,
    ) {
        // Binding a variable to itself is a no-op.
        if let InferType::Var { id: other_id, .. } = other
            && *other_id == id
        {
            let var = InferType::Var {
                ann: ann.clone(),
                id,
                fields: var_fields.to_vec(),
            };
            self.push_step(
                UnifyAction::Identity,
                &var,
                other,
                "variable already in its own class".into(),
            );
            return;
        }

        let var = InferType::Var {
            ann: ann.clone(),
            id,
            fields: var_fields.to_vec(),
        };

        if self.occurs(id, other) {
            self.push_step(
                UnifyAction::OccursCheck,
                &var,
                other,
                format!("t{} occurs in {other} — infinite type prevented", id.0),
            );
            let mut namer = VarNamer::new();
            self.errors.push(TypeError::InfiniteType {
                var: display_of(&var, &mut namer),
                ty: display_of(other, &mut namer),
            });
            return;
        }

        let other_rep = self.store.repr(other);
        let merged = self.unify_fields(var_fields.to_vec(), other_rep.fields().to_vec());
        // Only declared type references may end up carrying field
        // requirements; committing them onto any other known shape is a
        // record-field error (the union still happens, so solving
        // continues).
        if !merged.is_empty()
            && let InferType::Known { shape, .. } = &other_rep
            && !matches!(shape, Shape::Named(_))
        {
            let mut namer = VarNamer::new();
            self.errors.push(TypeError::InvalidFields {
                ty: display_of(&other_rep, &mut namer),
                fields: display_fields(&merged, &mut namer),
            });
        }
        self.push_step(
            UnifyAction::Bind,
            &var,
            other,
            format!("t{} := {other}", id.0),
        );
        self.store.union(merged, &var, other);
    }

    /// Whether `id` occurs anywhere inside `ty`, reading variables through
    /// their class representatives before descending.
    fn occurs(&mut self, id: TypeVarId, ty: &InferType<A>) -> bool {
        match ty {
            InferType::Var {
                id: other,
                fields,
                ..
            } => {
                if *other == id {
                    return true;
                }
                if fields.iter().any(|(_, field_ty)| self.occurs(id, field_ty)) {
                    return true;
                }
                match self.store.lookup_var(*other) {
                    None => false,
                    Some(rep) => {
                        if let InferType::Var { id: rep_id, .. } = &rep
                            && rep_id == other
                        {
                            false
                        } else {
                            self.occurs(id, &rep)
                        }
                    }
                }
            }
            InferType::Known { shape, fields, .. } => {
                let in_shape = match shape {
                    Shape::Lit(_) | Shape::Named(_) => false,
                    Shape::Arrow(domain, codomain) => {
                        self.occurs(id, domain) || self.occurs(id, codomain)
                    }
                    Shape::List(element) => self.occurs(id, element),
                };
                in_shape || fields.iter().any(|(_, field_ty)| self.occurs(id, field_ty))
            }
        }
    }

    /// Merge two field-constraint lists by label.
    ///
    /// Labels present on both sides unify their types and keep the updated
    /// class representative; labels present on one side are kept as-is.
    fn unify_fields(
        &mut self,
        left: Vec<(Label, InferType<A>)>,
        right: Vec<(Label, InferType<A>)>,
    ) -> Vec<(Label, InferType<A>)> {
        if !left.is_empty() || !right.is_empty() {
            let detail = format!(
                "merging {} + {} field requirement(s)",
                left.len(),
                right.len()
            );
            if let (Some((_, l)), Some((_, r))) = (left.first(), right.first()) {
                let (l, r) = (l.clone(), r.clone());
                self.push_step(UnifyAction::MergeFields, &l, &r, detail);
            }
        }

        let mut merged: BTreeMap<Label, InferType<A>> = BTreeMap::new();
        for (label, ty) in left {
            merged.insert(label, ty);
        }
        for (label, ty) in right {
            match merged.entry(label) {
                Entry::Vacant(entry) => {
                    entry.insert(ty);
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get().clone();
                    self.unify(&existing, &ty);
                    let updated = self.store.repr(&existing);
                    entry.insert(updated);
                }
            }
        }
        merged.into_iter().collect()
    }

    /// A shape that cannot carry fields must have an empty field list.
    fn require_no_fields(&mut self, ty: &InferType<A>) {
        if ty.fields().is_empty() {
            return;
        }
        let mut namer = VarNamer::new();
        self.errors.push(TypeError::InvalidFields {
            ty: display_of(ty, &mut namer),
            fields: display_fields(ty.fields(), &mut namer),
        });
    }

    fn mismatch(&mut self, expected: &InferType<A>, actual: &InferType<A>) {
        self.push_step(
            UnifyAction::Error,
            expected,
            actual,
            "type mismatch".into(),
        );
        let mut namer = VarNamer::new();
        self.errors.push(TypeError::Mismatch {
            expected: display_of(expected, &mut namer),
            actual: display_of(actual, &mut namer),
        });
    }

    fn push_step(
        &mut self,
        action: UnifyAction,
        left: &InferType<A>,
        right: &InferType<A>,
        detail: String,
    ) {
        if !self.tracing || self.trace.len() >= self.options.trace_limit {
            return;
        }
        self.trace.push(UnifyStep {
            step: self.trace.len(),
            action,
            left: left.to_string(),
            right: right.to_string(),
            detail,
        });
    }
}

impl<A: Clone> Default for Solver<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Solve a batch of constraints with a fresh solver and return it, errors
/// and all. Test-visible entry point.
pub fn solve_constraints<A: Clone>(constraints: Vec<Constraint<A>>) -> Solver<A> {
    let mut solver = Solver::new();
    solver.solve(constraints);
    solver
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::LitKind;

    fn var(id: u32) -> InferType<()> {
        InferType::Var {
            ann: (),
            id: TypeVarId(id),
            fields: vec![],
        }
    }

    fn lit(kind: LitKind) -> InferType<()> {
        InferType::Known {
            ann: (),
            shape: Shape::Lit(kind),
            fields: vec![],
        }
    }

    fn list(element: InferType<()>) -> InferType<()> {
        InferType::Known {
            ann: (),
            shape: Shape::List(Box::new(element)),
            fields: vec![],
        }
    }

    fn arrow(domain: InferType<()>, codomain: InferType<()>) -> InferType<()> {
        InferType::Known {
            ann: (),
            shape: Shape::Arrow(Box::new(domain), Box::new(codomain)),
            fields: vec![],
        }
    }

    #[test]
    fn unify_identical_literals() {
        let mut solver = Solver::new();
        solver.unify(&lit(LitKind::Int), &lit(LitKind::Int));
        assert!(!solver.has_errors());
    }

    #[test]
    fn unify_literal_mismatch() {
        let mut solver = Solver::new();
        solver.unify(&lit(LitKind::Int), &lit(LitKind::String));
        assert!(solver.has_errors());
        assert_eq!(solver.errors().len(), 1);
    }

    #[test]
    fn unify_variable_binds() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &lit(LitKind::Int));
        assert!(!solver.has_errors());
        let subs = solver.substitutions();
        assert!(matches!(
            subs.apply(&var(0)),
            InferType::Known {
                shape: Shape::Lit(LitKind::Int),
                ..
            }
        ));
    }

    #[test]
    fn unify_transitive() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &var(1));
        solver.unify(&var(1), &lit(LitKind::Int));
        assert!(!solver.has_errors());
        let subs = solver.substitutions();
        assert!(matches!(
            subs.apply(&var(0)),
            InferType::Known {
                shape: Shape::Lit(LitKind::Int),
                ..
            }
        ));
    }

    #[test]
    fn arrow_decomposes_and_accumulates_both_errors() {
        let mut solver = Solver::new();
        solver.unify(
            &arrow(lit(LitKind::Int), lit(LitKind::Bool)),
            &arrow(lit(LitKind::String), lit(LitKind::Unit)),
        );
        // Both the domain and the codomain mismatches are reported.
        assert_eq!(solver.errors().len(), 2);
    }

    #[test]
    fn occurs_check_reports_infinite_type() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &list(var(0)));
        assert!(matches!(
            solver.errors(),
            [TypeError::InfiniteType { .. }]
        ));
    }

    #[test]
    fn occurs_check_sees_through_the_store() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &list(var(1)));
        solver.unify(&var(1), &list(var(0)));
        assert!(
            solver
                .errors()
                .iter()
                .any(|e| matches!(e, TypeError::InfiniteType { .. }))
        );
    }

    #[test]
    fn fields_merge_by_label_and_shared_labels_unify() {
        let mut solver = Solver::new();
        let left = InferType::Var {
            ann: (),
            id: TypeVarId(0),
            fields: vec![(Label::new("age"), lit(LitKind::Int))],
        };
        let right = InferType::Var {
            ann: (),
            id: TypeVarId(1),
            fields: vec![
                (Label::new("age"), var(2)),
                (Label::new("name"), lit(LitKind::String)),
            ],
        };
        solver.unify(&left, &right);
        assert!(!solver.has_errors());

        let rep = solver.repr(&var(0));
        assert_eq!(rep.fields().len(), 2);
        // The shared label forced t2 := Int.
        let subs = solver.substitutions();
        assert!(matches!(
            subs.apply(&var(2)),
            InferType::Known {
                shape: Shape::Lit(LitKind::Int),
                ..
            }
        ));
    }

    #[test]
    fn conflicting_field_requirements_error() {
        let mut solver = Solver::new();
        let left = InferType::Var {
            ann: (),
            id: TypeVarId(0),
            fields: vec![(Label::new("age"), lit(LitKind::Int))],
        };
        let right = InferType::Var {
            ann: (),
            id: TypeVarId(1),
            fields: vec![(Label::new("age"), lit(LitKind::String))],
        };
        solver.unify(&left, &right);
        assert!(
            solver
                .errors()
                .iter()
                .any(|e| matches!(e, TypeError::Mismatch { .. }))
        );
    }

    #[test]
    fn fields_on_literal_shapes_are_invalid() {
        let mut solver = Solver::new();
        let with_fields = InferType::Known {
            ann: (),
            shape: Shape::Lit(LitKind::Int),
            fields: vec![(Label::new("age"), lit(LitKind::Int))],
        };
        solver.unify(&with_fields, &lit(LitKind::Int));
        assert!(matches!(
            solver.errors(),
            [TypeError::InvalidFields { .. }]
        ));
    }

    #[test]
    fn variable_resolved_to_shape_unifies_as_that_shape() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &lit(LitKind::Int));
        solver.unify(&var(0), &lit(LitKind::String));
        assert!(matches!(solver.errors(), [TypeError::Mismatch { .. }]));
    }

    #[test]
    fn mismatch_payloads_are_sanitized_jointly() {
        let mut solver = Solver::new();
        solver.unify(&list(arrow(var(7), var(7))), &lit(LitKind::Int));
        match &solver.errors()[0] {
            TypeError::Mismatch { expected, .. } => {
                assert_eq!(format!("{}", expected.0), "List(a -> a)");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn tracing_records_steps_when_enabled() {
        let mut solver = Solver::new();
        solver.enable_tracing();
        solver.unify(&var(0), &lit(LitKind::Int));
        assert!(solver.is_tracing());
        assert!(
            solver
                .trace()
                .iter()
                .any(|step| step.action == UnifyAction::Bind)
        );
    }

    #[test]
    fn tracing_is_off_by_default() {
        let mut solver = Solver::new();
        solver.unify(&var(0), &lit(LitKind::Int));
        assert!(solver.trace().is_empty());
    }

    #[test]
    fn trace_recording_stops_at_the_configured_cap() {
        let mut solver = Solver::with_options(SolveOptions { trace_limit: 2 });
        solver.enable_tracing();
        for id in 0..8 {
            solver.unify(&var(id), &lit(LitKind::Int));
        }
        assert_eq!(solver.trace().len(), 2);
    }
}
