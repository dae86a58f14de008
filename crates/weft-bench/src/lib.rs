//! Synthetic workloads for benchmarking the inference core.

use weft_ast::{Expr, FileId, Lit, Span};
use weft_types::{Decls, Label, LitKind, Type};

fn s() -> Span {
    Span::new(FileId(0), 0, 1)
}

/// `apply(identity, apply(identity, ... lit))` with ascribed identities:
/// one constraint chain per level, fully typeable.
pub fn identity_chain(depth: usize) -> Expr<Span> {
    let mut expr = Expr::Lit {
        ann: s(),
        value: Lit::Int(1),
    };
    for _ in 0..depth {
        expr = Expr::App {
            ann: s(),
            func: Box::new(Expr::Lam {
                ann: s(),
                param: "x".to_string(),
                annotation: Some(Type::Lit(LitKind::Int)),
                body: Box::new(Expr::Var {
                    ann: s(),
                    name: "x".to_string(),
                }),
            }),
            arg: Box::new(expr),
        };
    }
    expr
}

/// Declarations backing [`projection_list`].
pub fn point_decls() -> Decls {
    let mut decls = Decls::new();
    decls
        .insert_record(
            "Point",
            vec![
                (Label::new("x"), Type::Lit(LitKind::Int)),
                (Label::new("y"), Type::Lit(LitKind::Int)),
            ],
        )
        .expect("benchmark declarations are well-formed");
    decls
}

/// A list of field projections off freshly constructed records: exercises
/// the field-constraint merge path of the solver.
pub fn projection_list(width: usize) -> Expr<Span> {
    let items = (0..width)
        .map(|i| Expr::Prj {
            ann: s(),
            record: Box::new(Expr::Con {
                ann: s(),
                ctor: "Point".to_string(),
                type_name: "Point".to_string(),
                args: vec![
                    Expr::Lit {
                        ann: s(),
                        value: Lit::Int(i as i64),
                    },
                    Expr::Lit {
                        ann: s(),
                        value: Lit::Int(0),
                    },
                ],
            }),
            field: Label::new("x"),
        })
        .collect();
    Expr::List {
        ann: s(),
        elem: Type::Lit(LitKind::Int),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_infer::type_check;

    #[test]
    fn workloads_are_well_typed() {
        let decls = Decls::new();
        assert_eq!(
            type_check(&decls, &identity_chain(4)),
            Ok(Type::Lit(LitKind::Int))
        );
        assert_eq!(
            type_check(&point_decls(), &projection_list(4)),
            Ok(Type::list(Type::Lit(LitKind::Int)))
        );
    }
}
