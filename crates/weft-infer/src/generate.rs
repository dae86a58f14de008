//! Bottom-up constraint generation over assumption sets.
//!
//! The generator walks an expression with no environment at hand. Each use
//! of a name records an assumption; binding sites (lambda binders, pattern
//! variables, top-level definitions) discharge the recorded uses by
//! equating them with the binding's type. This is what lets a batch of
//! mutually recursive definitions check in one shared session.
//!
//! The walk rebuilds the tree with every annotation replaced by
//! `(InferType, A)` and accumulates as many errors as it can reach:
//! a failed constructor lookup still checks the argument expressions.

use weft_ast::{Expr, Pattern};
use weft_types::{Decls, InferType, Shape, TypeDecl};

use crate::assume::Assumptions;
use crate::{Constraint, Reason, TypeError, VarSupply};

/// The result of generating constraints for one expression.
pub struct Generated<A> {
    pub tree: Expr<(InferType<A>, A)>,
    pub constraints: Vec<Constraint<A>>,
    pub assumptions: Assumptions<A>,
    pub errors: Vec<TypeError<A>>,
}

/// Generate constraints for a single expression with a fresh session.
/// Test-visible entry point; `type_tree` and friends drive the same
/// machinery through a shared [`Generator`].
pub fn generate_constraints<A: Clone>(decls: &Decls, expr: &Expr<A>) -> Generated<A> {
    let mut generator = Generator::new(decls);
    let tree = generator.infer(expr);
    let (constraints, assumptions, errors, _) = generator.finish();
    Generated {
        tree,
        constraints,
        assumptions,
        errors,
    }
}

/// Walks expressions bottom-up, emitting constraints and assumptions.
///
/// One generator is one session's generation phase: the driver shares a
/// single generator (and therefore one assumption set and one constraint
/// list) across every definition of a batch.
pub struct Generator<'d, A> {
    decls: &'d Decls,
    supply: VarSupply,
    assumptions: Assumptions<A>,
    constraints: Vec<Constraint<A>>,
    errors: Vec<TypeError<A>>,
}

impl<'d, A: Clone> Generator<'d, A> {
    pub fn new(decls: &'d Decls) -> Self {
        Self {
            decls,
            supply: VarSupply::new(),
            assumptions: Assumptions::new(),
            constraints: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn assumptions(&self) -> &Assumptions<A> {
        &self.assumptions
    }

    pub fn constraints(&self) -> &[Constraint<A>] {
        &self.constraints
    }

    pub fn errors(&self) -> &[TypeError<A>] {
        &self.errors
    }

    /// Tear down the generation phase.
    pub fn finish(
        self,
    ) -> (
        Vec<Constraint<A>>,
        Assumptions<A>,
        Vec<TypeError<A>>,
        VarSupply,
    ) {
        (self.constraints, self.assumptions, self.errors, self.supply)
    }

    fn equal(&mut self, expected: InferType<A>, actual: InferType<A>, reason: Reason) {
        self.constraints.push(Constraint::Equal {
            expected,
            actual,
            reason,
        });
    }

    /// Scope the assumption set to a set of binder names.
    ///
    /// Saves the current assumption lists for `names`, clears them, runs
    /// `body`, collects the lists that accumulated during `body` (one per
    /// name, in order), and restores the saved lists. Enclosing uses of a
    /// shadowed name keep their assumptions; the collected lists are
    /// exactly the uses of the binders inside the scope.
    pub fn with_bindings<T>(
        &mut self,
        names: &[&str],
        body: impl FnOnce(&mut Self) -> T,
    ) -> (Vec<Vec<InferType<A>>>, T) {
        let saved: Vec<Option<Vec<InferType<A>>>> =
            names.iter().map(|name| self.assumptions.remove(name)).collect();

        let result = body(self);

        let collected: Vec<Vec<InferType<A>>> = names
            .iter()
            .map(|name| self.assumptions.take(name))
            .collect();
        for (name, previous) in names.iter().zip(saved) {
            if let Some(previous) = previous {
                self.assumptions.set((*name).to_string(), previous);
            }
        }
        (collected, result)
    }

    /// Infer an expression, producing the annotated node and emitting its
    /// constraints and assumptions.
    pub fn infer(&mut self, expr: &Expr<A>) -> Expr<(InferType<A>, A)> {
        match expr {
            Expr::Lit { ann, value } => {
                let ty = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::Lit(value.kind()),
                    fields: Vec::new(),
                };
                Expr::Lit {
                    ann: (ty, ann.clone()),
                    value: value.clone(),
                }
            }

            Expr::Var { ann, name } => {
                let ty = self.supply.fresh(ann.clone());
                self.assumptions.add(name, ty.clone());
                Expr::Var {
                    ann: (ty, ann.clone()),
                    name: name.clone(),
                }
            }

            Expr::Lam {
                ann,
                param,
                annotation,
                body,
            } => {
                let (mut collected, body) =
                    self.with_bindings(&[param.as_str()], |generator| generator.infer(body));
                let uses = collected.pop().expect("one binder was scoped");

                let binder_ty = match annotation {
                    Some(ascription) => InferType::from_type(ann.clone(), ascription),
                    None => self.supply.fresh(ann.clone()),
                };
                for use_ty in uses {
                    self.equal(binder_ty.clone(), use_ty, Reason::BinderUse);
                }

                let ty = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::Arrow(
                        Box::new(binder_ty),
                        Box::new(body.ann().0.clone()),
                    ),
                    fields: Vec::new(),
                };
                Expr::Lam {
                    ann: (ty, ann.clone()),
                    param: param.clone(),
                    annotation: annotation.clone(),
                    body: Box::new(body),
                }
            }

            Expr::App { ann, func, arg } => {
                let func = self.infer(func);
                let arg = self.infer(arg);
                let result = self.supply.fresh(ann.clone());
                let expected = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::Arrow(
                        Box::new(arg.ann().0.clone()),
                        Box::new(result.clone()),
                    ),
                    fields: Vec::new(),
                };
                self.equal(expected, func.ann().0.clone(), Reason::Application);
                Expr::App {
                    ann: (result, ann.clone()),
                    func: Box::new(func),
                    arg: Box::new(arg),
                }
            }

            Expr::List { ann, elem, items } => {
                let elem_ty = InferType::from_type(ann.clone(), elem);
                let items: Vec<_> = items
                    .iter()
                    .map(|item| {
                        let item = self.infer(item);
                        self.equal(
                            elem_ty.clone(),
                            item.ann().0.clone(),
                            Reason::ListElement,
                        );
                        item
                    })
                    .collect();
                let ty = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::List(Box::new(elem_ty)),
                    fields: Vec::new(),
                };
                Expr::List {
                    ann: (ty, ann.clone()),
                    elem: elem.clone(),
                    items,
                }
            }

            Expr::MapList { ann, func, list } => {
                let func = self.infer(func);
                let list = self.infer(list);
                let domain = self.supply.fresh(ann.clone());
                let codomain = self.supply.fresh(ann.clone());

                let wanted_func = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::Arrow(
                        Box::new(domain.clone()),
                        Box::new(codomain.clone()),
                    ),
                    fields: Vec::new(),
                };
                self.equal(wanted_func, func.ann().0.clone(), Reason::MapFunction);

                let wanted_list = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::List(Box::new(domain)),
                    fields: Vec::new(),
                };
                self.equal(wanted_list, list.ann().0.clone(), Reason::MapSource);

                let ty = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::List(Box::new(codomain)),
                    fields: Vec::new(),
                };
                Expr::MapList {
                    ann: (ty, ann.clone()),
                    func: Box::new(func),
                    list: Box::new(list),
                }
            }

            Expr::Con {
                ann,
                ctor,
                type_name,
                args,
            } => {
                // Argument expressions are checked regardless of whether
                // the constructor itself resolves, so their own errors and
                // assumptions are still collected.
                let args: Vec<_> = args.iter().map(|arg| self.infer(arg)).collect();
                let ty = self.check_construction(ann, ctor, type_name, &args);
                Expr::Con {
                    ann: (ty, ann.clone()),
                    ctor: ctor.clone(),
                    type_name: type_name.clone(),
                    args,
                }
            }

            Expr::Case {
                ann,
                scrutinee,
                alts,
            } => {
                let scrutinee = self.infer(scrutinee);
                let scrutinee_ty = scrutinee.ann().0.clone();
                let result = self.supply.fresh(ann.clone());

                let alts: Vec<_> = alts
                    .iter()
                    .map(|(pattern, alt_body)| {
                        let binders = pattern.binders();
                        let (_, checked) = self.with_bindings(&binders, |generator| {
                            // Order matters: the body populates the
                            // assumption set with the binders' uses, which
                            // pattern checking then discharges against the
                            // scrutinee.
                            let alt_body = generator.infer(alt_body);
                            let pattern = generator.infer_pattern(pattern, &scrutinee_ty);
                            generator.equal(
                                result.clone(),
                                alt_body.ann().0.clone(),
                                Reason::CaseArm,
                            );
                            (pattern, alt_body)
                        });
                        checked
                    })
                    .collect();

                Expr::Case {
                    ann: (result, ann.clone()),
                    scrutinee: Box::new(scrutinee),
                    alts,
                }
            }

            Expr::Prj { ann, record, field } => {
                let record = self.infer(record);
                let field_ty = self.supply.fresh(ann.clone());
                // A fresh variable carrying just this field requirement;
                // unifying it with the record's type defers the lookup
                // until the record resolves.
                let carrier = InferType::Var {
                    ann: ann.clone(),
                    id: self.supply.fresh_id(),
                    fields: vec![(field.clone(), field_ty.clone())],
                };
                self.equal(
                    carrier,
                    record.ann().0.clone(),
                    Reason::FieldAccess {
                        label: field.clone(),
                    },
                );
                Expr::Prj {
                    ann: (field_ty, ann.clone()),
                    record: Box::new(record),
                    field: field.clone(),
                }
            }

            Expr::Foreign { ann, name, ty } => {
                let lifted = InferType::from_type(ann.clone(), ty);
                Expr::Foreign {
                    ann: (lifted, ann.clone()),
                    name: name.clone(),
                    ty: ty.clone(),
                }
            }
        }
    }

    fn check_construction(
        &mut self,
        ann: &A,
        ctor: &str,
        type_name: &str,
        args: &[Expr<(InferType<A>, A)>],
    ) -> InferType<A> {
        let decls: &'d Decls = self.decls;
        let named = |fields: Vec<_>| InferType::Known {
            ann: ann.clone(),
            shape: Shape::Named(type_name.to_string()),
            fields,
        };

        let Some(decl) = decls.get(type_name) else {
            self.errors.push(TypeError::UndeclaredType {
                name: type_name.to_string(),
                ann: ann.clone(),
            });
            return named(Vec::new());
        };

        match decl {
            TypeDecl::Variant(constructors) => {
                let Some((_, declared_args)) =
                    constructors.iter().find(|(name, _)| name == ctor)
                else {
                    self.errors.push(TypeError::UnknownConstructor {
                        ctor: ctor.to_string(),
                        type_name: type_name.to_string(),
                        decl: decl.clone(),
                        ann: ann.clone(),
                    });
                    return named(Vec::new());
                };
                if declared_args.len() != args.len() {
                    self.errors.push(TypeError::ConstructorArity {
                        ctor: ctor.to_string(),
                        decl: decl.clone(),
                        given: args.len(),
                        ann: ann.clone(),
                    });
                    return named(Vec::new());
                }
                for (index, (arg, declared)) in args.iter().zip(declared_args).enumerate() {
                    let expected = InferType::from_type(arg.ann().1.clone(), declared);
                    self.equal(
                        expected,
                        arg.ann().0.clone(),
                        Reason::ConstructorArg { index },
                    );
                }
                named(Vec::new())
            }

            TypeDecl::Record(declared_fields) => {
                // A record's sole constructor is the type name itself.
                if ctor != type_name {
                    self.errors.push(TypeError::UnknownConstructor {
                        ctor: ctor.to_string(),
                        type_name: type_name.to_string(),
                        decl: decl.clone(),
                        ann: ann.clone(),
                    });
                    return named(Vec::new());
                }
                if declared_fields.len() != args.len() {
                    self.errors.push(TypeError::ConstructorArity {
                        ctor: ctor.to_string(),
                        decl: decl.clone(),
                        given: args.len(),
                        ann: ann.clone(),
                    });
                    return named(Vec::new());
                }
                for (index, (arg, (_, declared))) in
                    args.iter().zip(declared_fields).enumerate()
                {
                    let expected = InferType::from_type(arg.ann().1.clone(), declared);
                    self.equal(
                        expected,
                        arg.ann().0.clone(),
                        Reason::ConstructorArg { index },
                    );
                }
                // Seed the node's own field constraints with the declared
                // fields, so projections on this very expression resolve.
                let fields = declared_fields
                    .iter()
                    .map(|(label, declared)| {
                        (label.clone(), InferType::from_type(ann.clone(), declared))
                    })
                    .collect();
                named(fields)
            }
        }
    }

    fn infer_pattern(
        &mut self,
        pattern: &Pattern<A>,
        scrutinee: &InferType<A>,
    ) -> Pattern<(InferType<A>, A)> {
        match pattern {
            Pattern::Var { ann, name } => {
                // Every use of the binder recorded while checking the alt
                // body must equal the scrutinee type.
                for use_ty in self.assumptions.take(name) {
                    self.equal(scrutinee.clone(), use_ty, Reason::PatternMatch);
                }
                Pattern::Var {
                    ann: (scrutinee.clone(), ann.clone()),
                    name: name.clone(),
                }
            }

            Pattern::Con { ann, ctor, args } => {
                let decls: &'d Decls = self.decls;
                let Some((owner, declared_args)) = decls.constructor(ctor) else {
                    self.errors.push(TypeError::PatternConstructor {
                        ctor: ctor.clone(),
                        ann: ann.clone(),
                    });
                    return self.recover_pattern_args(pattern);
                };

                let owner_ty = InferType::Known {
                    ann: ann.clone(),
                    shape: Shape::Named(owner.to_string()),
                    fields: Vec::new(),
                };
                if declared_args.len() != args.len() {
                    self.errors.push(TypeError::PatternArity {
                        ctor: ctor.clone(),
                        ty: weft_types::Type::Named(owner.to_string()),
                        expected: declared_args.len(),
                        given: args.len(),
                        ann: ann.clone(),
                    });
                    return self.recover_pattern_args(pattern);
                }

                self.equal(owner_ty.clone(), scrutinee.clone(), Reason::PatternMatch);
                let args = args
                    .iter()
                    .zip(declared_args)
                    .map(|(sub, declared)| {
                        let expected = InferType::from_type(sub.ann().clone(), declared);
                        self.infer_pattern(sub, &expected)
                    })
                    .collect();
                Pattern::Con {
                    ann: (owner_ty, ann.clone()),
                    ctor: ctor.clone(),
                    args,
                }
            }
        }
    }

    /// Check a failed constructor pattern's sub-patterns against fresh
    /// variables so their binders still discharge instead of leaking as
    /// free variables.
    fn recover_pattern_args(&mut self, pattern: &Pattern<A>) -> Pattern<(InferType<A>, A)> {
        match pattern {
            Pattern::Var { .. } => {
                unreachable!("recovery is only entered for constructor patterns")
            }
            Pattern::Con { ann, ctor, args } => {
                let ty = self.supply.fresh(ann.clone());
                let args = args
                    .iter()
                    .map(|sub| {
                        let placeholder = self.supply.fresh(sub.ann().clone());
                        self.infer_pattern(sub, &placeholder)
                    })
                    .collect();
                Pattern::Con {
                    ann: (ty, ann.clone()),
                    ctor: ctor.clone(),
                    args,
                }
            }
        }
    }
}
