//! Substitution over the annotated tree, and lowering to surface types.
//!
//! After solving, every node's inference type is rewritten through the
//! substitution map and then lowered to a surface [`Type`]. Lowering is
//! where inference failure surfaces: any type still containing a variable
//! is refused, with or without outstanding field requirements, and
//! leftover field requirements are checked against the record
//! declarations.

use weft_ast::{Expr, Pattern};
use weft_types::{Decls, InferType, Shape, Substitutions, Type, TypeDecl, VarNamer};

use crate::TypeError;
use crate::error::{display_fields, display_of};

/// Rewrite every annotation's inference type through the substitution.
///
/// The original annotation `A` at each node is preserved untouched.
pub fn substitute_expr<A: Clone>(
    subs: &Substitutions<A>,
    expr: &Expr<(InferType<A>, A)>,
) -> Expr<(InferType<A>, A)> {
    let resolve = |(ty, ann): &(InferType<A>, A)| (subs.apply(ty), ann.clone());
    match expr {
        Expr::Lit { ann, value } => Expr::Lit {
            ann: resolve(ann),
            value: value.clone(),
        },
        Expr::Var { ann, name } => Expr::Var {
            ann: resolve(ann),
            name: name.clone(),
        },
        Expr::Lam {
            ann,
            param,
            annotation,
            body,
        } => Expr::Lam {
            ann: resolve(ann),
            param: param.clone(),
            annotation: annotation.clone(),
            body: Box::new(substitute_expr(subs, body)),
        },
        Expr::App { ann, func, arg } => Expr::App {
            ann: resolve(ann),
            func: Box::new(substitute_expr(subs, func)),
            arg: Box::new(substitute_expr(subs, arg)),
        },
        Expr::List { ann, elem, items } => Expr::List {
            ann: resolve(ann),
            elem: elem.clone(),
            items: items.iter().map(|item| substitute_expr(subs, item)).collect(),
        },
        Expr::MapList { ann, func, list } => Expr::MapList {
            ann: resolve(ann),
            func: Box::new(substitute_expr(subs, func)),
            list: Box::new(substitute_expr(subs, list)),
        },
        Expr::Con {
            ann,
            ctor,
            type_name,
            args,
        } => Expr::Con {
            ann: resolve(ann),
            ctor: ctor.clone(),
            type_name: type_name.clone(),
            args: args.iter().map(|arg| substitute_expr(subs, arg)).collect(),
        },
        Expr::Case {
            ann,
            scrutinee,
            alts,
        } => Expr::Case {
            ann: resolve(ann),
            scrutinee: Box::new(substitute_expr(subs, scrutinee)),
            alts: alts
                .iter()
                .map(|(pattern, body)| {
                    (
                        substitute_pattern(subs, pattern),
                        substitute_expr(subs, body),
                    )
                })
                .collect(),
        },
        Expr::Prj { ann, record, field } => Expr::Prj {
            ann: resolve(ann),
            record: Box::new(substitute_expr(subs, record)),
            field: field.clone(),
        },
        Expr::Foreign { ann, name, ty } => Expr::Foreign {
            ann: resolve(ann),
            name: name.clone(),
            ty: ty.clone(),
        },
    }
}

fn substitute_pattern<A: Clone>(
    subs: &Substitutions<A>,
    pattern: &Pattern<(InferType<A>, A)>,
) -> Pattern<(InferType<A>, A)> {
    let resolve = |(ty, ann): &(InferType<A>, A)| (subs.apply(ty), ann.clone());
    match pattern {
        Pattern::Var { ann, name } => Pattern::Var {
            ann: resolve(ann),
            name: name.clone(),
        },
        Pattern::Con { ann, ctor, args } => Pattern::Con {
            ann: resolve(ann),
            ctor: ctor.clone(),
            args: args
                .iter()
                .map(|sub| substitute_pattern(subs, sub))
                .collect(),
        },
    }
}

/// Lower a fully substituted tree to surface types.
///
/// Walks every node (patterns included), accumulating one error per node
/// whose type cannot lower. On success the output tree carries
/// `(Type, A)` with the original annotations preserved.
pub fn lower_expr<A: Clone>(
    decls: &Decls,
    expr: &Expr<(InferType<A>, A)>,
) -> Result<Expr<(Type, A)>, Vec<TypeError<A>>> {
    let mut lowerer = Lowerer {
        decls,
        errors: Vec::new(),
    };
    let lowered = lowerer.expr(expr);
    if lowerer.errors.is_empty() {
        Ok(lowered)
    } else {
        Err(lowerer.errors)
    }
}

struct Lowerer<'d, A> {
    decls: &'d Decls,
    errors: Vec<TypeError<A>>,
}

/// Placeholder for nodes that failed to lower. Never escapes: a non-empty
/// error list discards the partial tree.
fn poisoned() -> Type {
    Type::Named("<error>".to_string())
}

impl<A: Clone> Lowerer<'_, A> {
    fn expr(&mut self, expr: &Expr<(InferType<A>, A)>) -> Expr<(Type, A)> {
        match expr {
            Expr::Lit { ann, value } => Expr::Lit {
                ann: self.lower_ann(ann),
                value: value.clone(),
            },
            Expr::Var { ann, name } => Expr::Var {
                ann: self.lower_ann(ann),
                name: name.clone(),
            },
            Expr::Lam {
                ann,
                param,
                annotation,
                body,
            } => Expr::Lam {
                ann: self.lower_ann(ann),
                param: param.clone(),
                annotation: annotation.clone(),
                body: Box::new(self.expr(body)),
            },
            Expr::App { ann, func, arg } => Expr::App {
                ann: self.lower_ann(ann),
                func: Box::new(self.expr(func)),
                arg: Box::new(self.expr(arg)),
            },
            Expr::List { ann, elem, items } => Expr::List {
                ann: self.lower_ann(ann),
                elem: elem.clone(),
                items: items.iter().map(|item| self.expr(item)).collect(),
            },
            Expr::MapList { ann, func, list } => Expr::MapList {
                ann: self.lower_ann(ann),
                func: Box::new(self.expr(func)),
                list: Box::new(self.expr(list)),
            },
            Expr::Con {
                ann,
                ctor,
                type_name,
                args,
            } => Expr::Con {
                ann: self.lower_ann(ann),
                ctor: ctor.clone(),
                type_name: type_name.clone(),
                args: args.iter().map(|arg| self.expr(arg)).collect(),
            },
            Expr::Case {
                ann,
                scrutinee,
                alts,
            } => Expr::Case {
                ann: self.lower_ann(ann),
                scrutinee: Box::new(self.expr(scrutinee)),
                alts: alts
                    .iter()
                    .map(|(pattern, body)| (self.pattern(pattern), self.expr(body)))
                    .collect(),
            },
            Expr::Prj { ann, record, field } => Expr::Prj {
                ann: self.lower_ann(ann),
                record: Box::new(self.expr(record)),
                field: field.clone(),
            },
            Expr::Foreign { ann, name, ty } => Expr::Foreign {
                ann: self.lower_ann(ann),
                name: name.clone(),
                ty: ty.clone(),
            },
        }
    }

    fn pattern(&mut self, pattern: &Pattern<(InferType<A>, A)>) -> Pattern<(Type, A)> {
        match pattern {
            Pattern::Var { ann, name } => Pattern::Var {
                ann: self.lower_ann(ann),
                name: name.clone(),
            },
            Pattern::Con { ann, ctor, args } => Pattern::Con {
                ann: self.lower_ann(ann),
                ctor: ctor.clone(),
                args: args.iter().map(|sub| self.pattern(sub)).collect(),
            },
        }
    }

    fn lower_ann(&mut self, (ty, ann): &(InferType<A>, A)) -> (Type, A) {
        (self.lower_type(ty), ann.clone())
    }

    fn lower_type(&mut self, ty: &InferType<A>) -> Type {
        match ty {
            InferType::Var { ann, fields, .. } => {
                if fields.is_empty() {
                    self.errors.push(TypeError::AmbiguousType { ann: ann.clone() });
                } else {
                    let mut namer = VarNamer::new();
                    self.errors.push(TypeError::OpenRecord {
                        ann: ann.clone(),
                        fields: display_fields(fields, &mut namer),
                    });
                }
                poisoned()
            }

            InferType::Known { shape, fields, .. } => {
                if !fields.is_empty() {
                    self.check_leftover_fields(ty, shape, fields);
                }
                match shape {
                    Shape::Lit(kind) => Type::Lit(*kind),
                    Shape::Named(name) => Type::Named(name.clone()),
                    Shape::Arrow(domain, codomain) => {
                        Type::arrow(self.lower_type(domain), self.lower_type(codomain))
                    }
                    Shape::List(element) => Type::list(self.lower_type(element)),
                }
            }
        }
    }

    /// Field requirements left on a known shape after solving.
    ///
    /// On a declared record they were consistency constraints: accept them
    /// as long as they only name declared fields. Anything else cannot
    /// carry fields.
    fn check_leftover_fields(
        &mut self,
        ty: &InferType<A>,
        shape: &Shape<A>,
        fields: &[(weft_types::Label, InferType<A>)],
    ) {
        if let Shape::Named(name) = shape {
            match self.decls.get(name) {
                Some(TypeDecl::Record(declared)) => {
                    let undeclared: Vec<_> = fields
                        .iter()
                        .filter(|(label, _)| {
                            !declared.iter().any(|(decl_label, _)| decl_label == label)
                        })
                        .cloned()
                        .collect();
                    if undeclared.is_empty() {
                        return;
                    }
                    let mut namer = VarNamer::new();
                    self.errors.push(TypeError::InvalidFields {
                        ty: display_of(ty, &mut namer),
                        fields: display_fields(&undeclared, &mut namer),
                    });
                    return;
                }
                Some(TypeDecl::Variant(_)) => {}
                // Undeclared type name: generation already reported it;
                // swallowing the fields here avoids a cascade.
                None => return,
            }
        }
        let mut namer = VarNamer::new();
        self.errors.push(TypeError::InvalidFields {
            ty: display_of(ty, &mut namer),
            fields: display_fields(fields, &mut namer),
        });
    }
}
