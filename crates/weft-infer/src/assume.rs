//! Assumption sets: pending requirements on free names.
//!
//! Constraint generation walks the tree bottom-up with no environment.
//! Each use of a name allocates a fresh variable and records it here as an
//! *assumption*; whoever turns out to bind the name (a lambda binder, a
//! pattern variable, a top-level definition) discharges the recorded uses
//! by equating them with the binding's type. Names still assumed when a
//! session ends are free variables.

use std::collections::BTreeMap;

use weft_types::InferType;

/// Pending uses of names whose types are not yet known.
#[derive(Debug, Clone, Default)]
pub struct Assumptions<A> {
    map: BTreeMap<String, Vec<InferType<A>>>,
}

impl<A> Assumptions<A> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Record a use of `name` at type `ty`.
    pub fn add(&mut self, name: &str, ty: InferType<A>) {
        self.map.entry(name.to_string()).or_default().push(ty);
    }

    /// The recorded uses of `name`, in generation order.
    pub fn lookup(&self, name: &str) -> &[InferType<A>] {
        self.map.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return the recorded uses of `name`.
    pub fn take(&mut self, name: &str) -> Vec<InferType<A>> {
        self.map.remove(name).unwrap_or_default()
    }

    /// Remove `name`, returning its uses only if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<InferType<A>>> {
        self.map.remove(name)
    }

    /// Replace the recorded uses of `name`. An empty list removes the key.
    pub fn set(&mut self, name: String, uses: Vec<InferType<A>>) {
        if uses.is_empty() {
            self.map.remove(&name);
        } else {
            self.map.insert(name, uses);
        }
    }

    /// Names with outstanding assumptions, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
