//! Union-find store over inference types.
//!
//! Each unification variable belongs to an equivalence class; the class
//! representative is the inference type the class currently stands for,
//! carrying the merged field constraints of every member. Known shapes get
//! fresh singleton classes; they are never shared by id.
//!
//! Uses path compression and union-by-rank, with one twist: the merge is
//! directed. The surviving descriptor is always the right-hand side's
//! current representative carrying the caller-supplied merged field list,
//! whichever root wins by rank.

use std::collections::BTreeMap;

use weft_types::{InferType, Label, Substitutions, TypeVarId};

#[derive(Debug, Clone)]
enum Node<A> {
    Root {
        rank: u32,
        descriptor: InferType<A>,
    },
    Link(usize),
}

/// Equivalence classes of inference types for one check session.
#[derive(Debug, Clone, Default)]
pub struct Store<A> {
    vars: BTreeMap<TypeVarId, usize>,
    nodes: Vec<Node<A>>,
}

impl<A: Clone> Store<A> {
    pub fn new() -> Self {
        Self {
            vars: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    fn alloc(&mut self, descriptor: InferType<A>) -> usize {
        self.nodes.push(Node::Root {
            rank: 0,
            descriptor,
        });
        self.nodes.len() - 1
    }

    /// The class point of `ty`.
    ///
    /// Variables map to their (possibly shared) class, created on first
    /// sight with the occurrence itself as descriptor. Known shapes always
    /// get a fresh singleton class.
    pub fn point_of(&mut self, ty: &InferType<A>) -> usize {
        match ty {
            InferType::Var { id, .. } => match self.vars.get(id) {
                Some(&point) => point,
                None => {
                    let point = self.alloc(ty.clone());
                    self.vars.insert(*id, point);
                    point
                }
            },
            InferType::Known { .. } => self.alloc(ty.clone()),
        }
    }

    fn find(&mut self, point: usize) -> usize {
        match self.nodes[point] {
            Node::Root { .. } => point,
            Node::Link(next) => {
                let root = self.find(next);
                self.nodes[point] = Node::Link(root);
                root
            }
        }
    }

    fn descriptor_at(&self, root: usize) -> &InferType<A> {
        match &self.nodes[root] {
            Node::Root { descriptor, .. } => descriptor,
            Node::Link(_) => unreachable!("find always returns a root"),
        }
    }

    fn rank_at(&self, root: usize) -> u32 {
        match &self.nodes[root] {
            Node::Root { rank, .. } => *rank,
            Node::Link(_) => unreachable!("find always returns a root"),
        }
    }

    /// The representative descriptor of `ty`'s class.
    pub fn repr(&mut self, ty: &InferType<A>) -> InferType<A> {
        let point = self.point_of(ty);
        let root = self.find(point);
        self.descriptor_at(root).clone()
    }

    /// The representative of a variable's class, if the variable has been
    /// seen at all.
    pub fn lookup_var(&mut self, id: TypeVarId) -> Option<InferType<A>> {
        let point = *self.vars.get(&id)?;
        let root = self.find(point);
        Some(self.descriptor_at(root).clone())
    }

    /// Merge the classes of `var` and `other`.
    ///
    /// The new representative's shape is `other`'s current representative
    /// and its field list is `fields`, supplied by the unifier after field
    /// merging.
    pub fn union(
        &mut self,
        fields: Vec<(Label, InferType<A>)>,
        var: &InferType<A>,
        other: &InferType<A>,
    ) {
        let var_root = {
            let point = self.point_of(var);
            self.find(point)
        };
        let other_root = {
            let point = self.point_of(other);
            self.find(point)
        };

        let mut descriptor = self.descriptor_at(other_root).clone();
        descriptor.set_fields(fields);

        if var_root == other_root {
            self.nodes[var_root] = Node::Root {
                rank: self.rank_at(var_root),
                descriptor,
            };
            return;
        }

        let var_rank = self.rank_at(var_root);
        let other_rank = self.rank_at(other_root);
        let (winner, loser, rank) = if var_rank > other_rank {
            (var_root, other_root, var_rank)
        } else if var_rank < other_rank {
            (other_root, var_root, other_rank)
        } else {
            (other_root, var_root, other_rank + 1)
        };
        self.nodes[loser] = Node::Link(winner);
        self.nodes[winner] = Node::Root { rank, descriptor };
    }

    /// Extract the solved classes as a substitution map.
    ///
    /// Classes whose representative is still the variable itself with no
    /// accumulated field constraints are unresolved and omitted; lowering
    /// reports them from the tree.
    pub fn substitutions(&mut self) -> Substitutions<A> {
        let ids: Vec<TypeVarId> = self.vars.keys().copied().collect();
        let mut subs = Substitutions::new();
        for id in ids {
            let point = self.vars[&id];
            let root = self.find(point);
            let descriptor = self.descriptor_at(root);
            if let InferType::Var {
                id: rep_id, fields, ..
            } = descriptor
                && *rep_id == id
                && fields.is_empty()
            {
                continue;
            }
            subs.bind(id, descriptor.clone());
        }
        subs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{LitKind, Shape};

    fn var(id: u32) -> InferType<()> {
        InferType::Var {
            ann: (),
            id: TypeVarId(id),
            fields: vec![],
        }
    }

    fn int() -> InferType<()> {
        InferType::Known {
            ann: (),
            shape: Shape::Lit(LitKind::Int),
            fields: vec![],
        }
    }

    #[test]
    fn variable_points_are_shared_by_id() {
        let mut store: Store<()> = Store::new();
        let first = store.point_of(&var(0));
        let second = store.point_of(&var(0));
        assert_eq!(first, second);
    }

    #[test]
    fn known_points_are_fresh_singletons() {
        let mut store: Store<()> = Store::new();
        let first = store.point_of(&int());
        let second = store.point_of(&int());
        assert_ne!(first, second);
    }

    #[test]
    fn union_adopts_right_hand_descriptor() {
        let mut store: Store<()> = Store::new();
        store.union(vec![], &var(0), &int());
        assert!(matches!(
            store.lookup_var(TypeVarId(0)),
            Some(InferType::Known {
                shape: Shape::Lit(LitKind::Int),
                ..
            })
        ));
    }

    #[test]
    fn union_preserves_merged_fields_on_the_representative() {
        let mut store: Store<()> = Store::new();
        let fields = vec![(Label::new("name"), var(5))];
        store.union(fields.clone(), &var(0), &var(1));

        let rep = store.lookup_var(TypeVarId(0)).unwrap();
        assert_eq!(rep.var_id(), Some(TypeVarId(1)));
        assert_eq!(rep.fields(), fields.as_slice());
        // Both members now share the class.
        let rep_via_other = store.lookup_var(TypeVarId(1)).unwrap();
        assert_eq!(rep, rep_via_other);
    }

    #[test]
    fn chained_unions_resolve_through_the_class() {
        let mut store: Store<()> = Store::new();
        store.union(vec![], &var(0), &var(1));
        store.union(vec![], &var(1), &int());
        for id in [0, 1] {
            assert!(matches!(
                store.lookup_var(TypeVarId(id)),
                Some(InferType::Known {
                    shape: Shape::Lit(LitKind::Int),
                    ..
                })
            ));
        }
    }

    #[test]
    fn substitutions_skip_untouched_variables() {
        let mut store: Store<()> = Store::new();
        store.point_of(&var(0));
        store.union(vec![], &var(1), &int());
        let subs = store.substitutions();
        assert!(subs.lookup(TypeVarId(0)).is_none());
        assert!(subs.lookup(TypeVarId(1)).is_some());
    }

    #[test]
    fn substitutions_keep_self_classes_with_fields() {
        let mut store: Store<()> = Store::new();
        // A variable constrained to have a field but never resolved: its
        // class representative is itself, carrying the field.
        let open = InferType::Var {
            ann: (),
            id: TypeVarId(0),
            fields: vec![(Label::new("name"), var(1))],
        };
        store.union(open.fields().to_vec(), &var(0), &open);
        let subs = store.substitutions();
        let bound = subs.lookup(TypeVarId(0)).unwrap();
        assert_eq!(bound.var_id(), Some(TypeVarId(0)));
        assert_eq!(bound.fields().len(), 1);
    }
}
