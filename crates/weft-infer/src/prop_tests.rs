//! Property tests for the generator and solver using proptest.
//!
//! These tests stress invariants that must hold for ANY input, not just
//! hand-picked examples:
//!
//! 1. Unification reflexivity: unify(t, t) never errors
//! 2. Consistency: after a clean unify(a, b), both sides resolve to the
//!    same shape
//! 3. Substitution idempotence: apply(apply(t)) == apply(t)
//! 4. Occurs safety: a variable never unifies with a type containing it,
//!    however deeply wrapped
//! 5. Determinism: checking the same expression twice gives identical
//!    results, error lists included

use proptest::prelude::*;

use weft_ast::{Expr, Lit};
use weft_types::{Decls, InferType, Label, LitKind, Shape, Type, TypeVarId};

use crate::solve::Solver;
use crate::type_check;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const LABEL_POOL: &[&str] = &["a", "b", "name", "age", "id", "val"];
const NAME_POOL: &[&str] = &["User", "Point", "Pair", "Item"];
const VAR_POOL: &[&str] = &["x", "y", "item", "user"];

fn arb_label() -> impl Strategy<Value = Label> {
    prop::sample::select(LABEL_POOL).prop_map(Label::new)
}

fn arb_lit_kind() -> impl Strategy<Value = LitKind> {
    prop_oneof![
        Just(LitKind::Int),
        Just(LitKind::Float),
        Just(LitKind::Bool),
        Just(LitKind::String),
        Just(LitKind::Unit),
    ]
}

fn known(shape: Shape<()>) -> InferType<()> {
    InferType::Known {
        ann: (),
        shape,
        fields: vec![],
    }
}

fn type_var(id: u32) -> InferType<()> {
    InferType::Var {
        ann: (),
        id: TypeVarId(id),
        fields: vec![],
    }
}

/// Inference types where field constraints only appear on declared type
/// references, the shape every well-formed session maintains (the solver
/// reports fields on anything else).
fn arb_infer_type() -> impl Strategy<Value = InferType<()>> {
    let leaf = prop_oneof![
        arb_lit_kind().prop_map(|kind| known(Shape::Lit(kind))),
        (0u32..6).prop_map(type_var),
        prop::sample::select(NAME_POOL)
            .prop_map(|name| known(Shape::Named(name.to_string()))),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(domain, codomain)| {
                known(Shape::Arrow(Box::new(domain), Box::new(codomain)))
            }),
            inner
                .clone()
                .prop_map(|element| known(Shape::List(Box::new(element)))),
            (
                prop::sample::select(NAME_POOL),
                prop::collection::btree_map(arb_label(), inner, 0..3),
            )
                .prop_map(|(name, fields)| InferType::Known {
                    ann: (),
                    shape: Shape::Named(name.to_string()),
                    fields: fields.into_iter().collect(),
                }),
        ]
    })
}

/// Small elaborated expressions over a fixed name pool. Most are
/// ill-typed; that is the point for the determinism property.
fn arb_expr() -> impl Strategy<Value = Expr<()>> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(|n| Expr::Lit {
            ann: (),
            value: Lit::Int(n),
        }),
        "[a-z]{1,4}".prop_map(|s| Expr::Lit {
            ann: (),
            value: Lit::String(s),
        }),
        prop::sample::select(VAR_POOL).prop_map(|name| Expr::Var {
            ann: (),
            name: name.to_string(),
        }),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (
                prop::sample::select(VAR_POOL),
                prop::option::of(prop_oneof![
                    Just(Type::Lit(LitKind::Int)),
                    Just(Type::Lit(LitKind::String)),
                ]),
                inner.clone(),
            )
                .prop_map(|(param, annotation, body)| Expr::Lam {
                    ann: (),
                    param: param.to_string(),
                    annotation,
                    body: Box::new(body),
                }),
            (inner.clone(), inner.clone()).prop_map(|(func, arg)| Expr::App {
                ann: (),
                func: Box::new(func),
                arg: Box::new(arg),
            }),
            (arb_label(), inner.clone()).prop_map(|(field, record)| Expr::Prj {
                ann: (),
                record: Box::new(record),
                field,
            }),
            prop::collection::vec(inner, 0..3).prop_map(|items| Expr::List {
                ann: (),
                elem: Type::Lit(LitKind::Int),
                items,
            }),
        ]
    })
}

/// Compare two inference types by shape alone, ignoring field-constraint
/// lists (which deliberately survive unification unmerged on tree copies).
fn same_shape(left: &InferType<()>, right: &InferType<()>) -> bool {
    match (left, right) {
        (InferType::Var { id: l, .. }, InferType::Var { id: r, .. }) => l == r,
        (InferType::Known { shape: l, .. }, InferType::Known { shape: r, .. }) => {
            match (l, r) {
                (Shape::Lit(a), Shape::Lit(b)) => a == b,
                (Shape::Named(a), Shape::Named(b)) => a == b,
                (Shape::Arrow(a1, a2), Shape::Arrow(b1, b2)) => {
                    same_shape(a1, b1) && same_shape(a2, b2)
                }
                (Shape::List(a), Shape::List(b)) => same_shape(a, b),
                _ => false,
            }
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unification_is_reflexive(ty in arb_infer_type()) {
        let mut solver = Solver::new();
        solver.unify(&ty, &ty);
        prop_assert!(!solver.has_errors(), "errors: {:?}", solver.errors());
    }

    #[test]
    fn clean_unification_makes_both_sides_resolve_alike(
        left in arb_infer_type(),
        right in arb_infer_type(),
    ) {
        let mut solver = Solver::new();
        solver.unify(&left, &right);
        if solver.has_errors() {
            return Ok(());
        }
        let subs = solver.substitutions();
        prop_assert!(
            same_shape(&subs.apply(&left), &subs.apply(&right)),
            "left resolved to {}, right to {}",
            subs.apply(&left),
            subs.apply(&right),
        );
    }

    #[test]
    fn substitution_is_idempotent(
        left in arb_infer_type(),
        right in arb_infer_type(),
        probe in arb_infer_type(),
    ) {
        let mut solver = Solver::new();
        solver.unify(&left, &right);
        let subs = solver.substitutions();
        let once = subs.apply(&probe);
        let twice = subs.apply(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn occurs_check_fires_at_any_depth(id in 0u32..4, depth in 1usize..4) {
        let mut wrapped = known(Shape::List(Box::new(type_var(id))));
        for level in 0..depth {
            wrapped = if level % 2 == 0 {
                known(Shape::Arrow(
                    Box::new(known(Shape::Lit(LitKind::Int))),
                    Box::new(wrapped),
                ))
            } else {
                known(Shape::List(Box::new(wrapped)))
            };
        }
        let mut solver = Solver::new();
        solver.unify(&type_var(id), &wrapped);
        prop_assert!(
            solver
                .errors()
                .iter()
                .any(|e| matches!(e, crate::TypeError::InfiniteType { .. })),
            "expected an InfiniteType error"
        );
        // Extraction terminates and stays finite even after the failed bind.
        let subs = solver.substitutions();
        let _ = subs.apply(&type_var(id));
    }

    #[test]
    fn checking_is_deterministic(expr in arb_expr()) {
        let decls = Decls::new();
        let first = type_check(&decls, &expr);
        let second = type_check(&decls, &expr);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn solved_trees_never_contain_variables(
        kind in arb_lit_kind(),
        depth in 1usize..4,
    ) {
        // Build `apply(identity, ... apply(identity, lit))` with ascribed
        // identities: fully typeable, so lowering must produce a tree with
        // no inference leftovers at any node.
        let lit = match kind {
            LitKind::Int => Lit::Int(1),
            LitKind::Float => Lit::Float(1.0),
            LitKind::Bool => Lit::Bool(true),
            LitKind::String => Lit::String("w".into()),
            LitKind::Unit => Lit::Unit,
        };
        let mut expr = Expr::Lit { ann: (), value: lit };
        for _ in 0..depth {
            expr = Expr::App {
                ann: (),
                func: Box::new(Expr::Lam {
                    ann: (),
                    param: "x".to_string(),
                    annotation: Some(Type::Lit(kind)),
                    body: Box::new(Expr::Var {
                        ann: (),
                        name: "x".to_string(),
                    }),
                }),
                arg: Box::new(expr),
            };
        }
        let decls = Decls::new();
        let checked = type_check(&decls, &expr);
        prop_assert_eq!(checked, Ok(Type::Lit(kind)));
    }
}
