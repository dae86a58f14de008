//! Check-session drivers.
//!
//! A session runs generation, assumption discharge, solving, substitution
//! and lowering in order, accumulating errors from every phase into one
//! flat list: generation errors first, then free variables, then solver
//! errors, then lowering errors.
//!
//! The batch entry points share a single generation session across all
//! definitions (one assumption set, one constraint list), which is what
//! makes every name in the batch visible to every other (top-level
//! letrec).

use std::collections::BTreeMap;

use weft_ast::Expr;
use weft_types::{Decls, InferType, Type};

use crate::generate::Generator;
use crate::lower::{lower_expr, substitute_expr};
use crate::solve::Solver;
use crate::{Constraint, Reason, TypeError};

/// Infer the outer type of a single expression.
pub fn type_check<A: Clone>(decls: &Decls, expr: &Expr<A>) -> Result<Type, Vec<TypeError<A>>> {
    type_tree(decls, expr).map(|tree| tree.ann().0.clone())
}

/// Check a single expression, annotating every node with its type.
pub fn type_tree<A: Clone>(
    decls: &Decls,
    expr: &Expr<A>,
) -> Result<Expr<(Type, A)>, Vec<TypeError<A>>> {
    let mut generator = Generator::new(decls);
    let tree = generator.infer(expr);
    let (constraints, mut assumptions, mut errors, _) = generator.finish();

    // No definitions to discharge against: every remaining assumption is a
    // use without a binder.
    for name in assumptions.names() {
        for use_ty in assumptions.take(&name) {
            errors.push(TypeError::FreeVariable {
                name: name.clone(),
                ann: use_ty.ann().clone(),
            });
        }
    }

    let mut solver = Solver::new();
    solver.solve(constraints);
    errors.extend(solver.take_errors());

    let subs = solver.substitutions();
    let tree = substitute_expr(&subs, &tree);
    let lowered = lower_expr(decls, &tree);

    finish(errors, lowered)
}

/// Check a batch of named definitions that may reference each other
/// freely.
pub fn type_check_all<A: Clone>(
    decls: &Decls,
    exprs: &BTreeMap<String, Expr<A>>,
) -> Result<BTreeMap<String, Expr<(Type, A)>>, Vec<TypeError<A>>> {
    type_check_incremental(decls, &BTreeMap::new(), exprs)
}

/// Check a batch of named definitions against previously checked names.
///
/// `known` supplies typings from earlier batches (e.g. already-checked
/// modules); names in `exprs` shadow them. Uses of names found in neither
/// are free-variable errors, one per use site.
pub fn type_check_incremental<A: Clone>(
    decls: &Decls,
    known: &BTreeMap<String, Type>,
    exprs: &BTreeMap<String, Expr<A>>,
) -> Result<BTreeMap<String, Expr<(Type, A)>>, Vec<TypeError<A>>> {
    let mut generator = Generator::new(decls);
    let mut trees: BTreeMap<String, Expr<(InferType<A>, A)>> = BTreeMap::new();
    for (name, expr) in exprs {
        trees.insert(name.clone(), generator.infer(expr));
    }
    let (mut constraints, mut assumptions, mut errors, _) = generator.finish();

    // Discharge every assumption against this batch's definitions, then
    // against externally known typings. Anything left is free.
    for name in assumptions.names() {
        let uses = assumptions.take(&name);
        if let Some(definition) = trees.get(&name) {
            let definition_ty = definition.ann().0.clone();
            for use_ty in uses {
                constraints.push(Constraint::Equal {
                    expected: definition_ty.clone(),
                    actual: use_ty,
                    reason: Reason::Definition { name: name.clone() },
                });
            }
        } else if let Some(known_ty) = known.get(&name) {
            for use_ty in uses {
                let expected = InferType::from_type(use_ty.ann().clone(), known_ty);
                constraints.push(Constraint::Equal {
                    expected,
                    actual: use_ty,
                    reason: Reason::Definition { name: name.clone() },
                });
            }
        } else {
            for use_ty in uses {
                errors.push(TypeError::FreeVariable {
                    name: name.clone(),
                    ann: use_ty.ann().clone(),
                });
            }
        }
    }

    let mut solver = Solver::new();
    solver.solve(constraints);
    errors.extend(solver.take_errors());

    let subs = solver.substitutions();
    let mut lowered = BTreeMap::new();
    for (name, tree) in &trees {
        let tree = substitute_expr(&subs, tree);
        match lower_expr(decls, &tree) {
            Ok(tree) => {
                lowered.insert(name.clone(), tree);
            }
            Err(lower_errors) => errors.extend(lower_errors),
        }
    }

    if errors.is_empty() {
        Ok(lowered)
    } else {
        Err(errors)
    }
}

fn finish<A>(
    mut errors: Vec<TypeError<A>>,
    lowered: Result<Expr<(Type, A)>, Vec<TypeError<A>>>,
) -> Result<Expr<(Type, A)>, Vec<TypeError<A>>> {
    match lowered {
        Ok(tree) if errors.is_empty() => Ok(tree),
        Ok(_) => Err(errors),
        Err(lower_errors) => {
            errors.extend(lower_errors);
            Err(errors)
        }
    }
}
