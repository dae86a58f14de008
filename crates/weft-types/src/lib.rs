//! Type representations for the Weft template compiler.
//!
//! This crate defines the semantic types shared by the elaborator and the
//! inference engine: surface types, type declarations, and the inference-time
//! types that carry unification variables and deferred field constraints.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a unification variable during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// A record field label. Uses String for now; can switch to interned strings
/// later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub String);

impl Label {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Literal kinds
// ---------------------------------------------------------------------------

/// The ground literal kinds of the template language.
///
/// This is the closed set of types a literal can have. Literal *values* live
/// in `weft-ast`; `Lit::kind` maps a value to its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LitKind {
    Int,
    Float,
    Bool,
    String,
    Unit,
}

impl LitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LitKind::Int => "Int",
            LitKind::Float => "Float",
            LitKind::Bool => "Bool",
            LitKind::String => "String",
            LitKind::Unit => "Unit",
        }
    }
}

impl fmt::Display for LitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Surface types
// ---------------------------------------------------------------------------

/// A fully resolved surface type.
///
/// This is what the elaborator writes into ascriptions and what the checker
/// produces for every node of a well-typed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Ground literal type.
    Lit(LitKind),
    /// Reference to a declared variant or record type.
    Named(String),
    /// Function type.
    Arrow(Box<Type>, Box<Type>),
    /// Homogeneous list.
    List(Box<Type>),
}

impl Type {
    pub fn arrow(domain: Type, codomain: Type) -> Type {
        Type::Arrow(Box::new(domain), Box::new(codomain))
    }

    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Lit(kind) => write!(f, "{kind}"),
            Type::Named(name) => write!(f, "{name}"),
            Type::Arrow(domain, codomain) => {
                // Arrows associate to the right; arrow-typed domains need
                // parentheses.
                if matches!(domain.as_ref(), Type::Arrow(_, _)) {
                    write!(f, "({domain}) -> {codomain}")
                } else {
                    write!(f, "{domain} -> {codomain}")
                }
            }
            Type::List(element) => write!(f, "List({element})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Type declarations
// ---------------------------------------------------------------------------

/// A single type declaration: a variant (sum) type or a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    /// Ordered constructors, each with positional argument types.
    Variant(Vec<(String, Vec<Type>)>),
    /// Ordered named fields.
    Record(Vec<(Label, Type)>),
}

/// The declared types visible to one check session.
///
/// Maps type names to their declarations and keeps a reverse index from
/// variant constructor names to the owning type. Record names are *not*
/// indexed as constructors: record construction names the type directly, and
/// records are not matchable in patterns.
#[derive(Debug, Clone, Default)]
pub struct Decls {
    types: BTreeMap<String, TypeDecl>,
    constructors: BTreeMap<String, String>,
}

impl Decls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variant type. Rejects duplicate type names and constructor
    /// names already owned by another type.
    pub fn insert_variant(
        &mut self,
        name: impl Into<String>,
        constructors: Vec<(String, Vec<Type>)>,
    ) -> Result<(), String> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(format!("duplicate type declaration: {name}"));
        }
        for (ctor, _) in &constructors {
            if let Some(owner) = self.constructors.get(ctor) {
                return Err(format!(
                    "constructor {ctor} already declared by type {owner}"
                ));
            }
        }
        for (ctor, _) in &constructors {
            self.constructors.insert(ctor.clone(), name.clone());
        }
        self.types.insert(name, TypeDecl::Variant(constructors));
        Ok(())
    }

    /// Declare a record type. Rejects duplicate type names and duplicate
    /// field labels.
    pub fn insert_record(
        &mut self,
        name: impl Into<String>,
        fields: Vec<(Label, Type)>,
    ) -> Result<(), String> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(format!("duplicate type declaration: {name}"));
        }
        let mut seen = BTreeMap::new();
        for (label, _) in &fields {
            if seen.insert(label.clone(), ()).is_some() {
                return Err(format!("duplicate field {label} in record {name}"));
            }
        }
        self.types.insert(name, TypeDecl::Record(fields));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    /// Reverse lookup for variant constructors: owning type name plus the
    /// declared argument types.
    pub fn constructor(&self, ctor: &str) -> Option<(&str, &[Type])> {
        let owner = self.constructors.get(ctor)?;
        match self.types.get(owner)? {
            TypeDecl::Variant(constructors) => constructors
                .iter()
                .find(|(name, _)| name == ctor)
                .map(|(_, args)| (owner.as_str(), args.as_slice())),
            TypeDecl::Record(_) => None,
        }
    }

    /// The declared fields of a record type, if `name` names one.
    pub fn record_fields(&self, name: &str) -> Option<&[(Label, Type)]> {
        match self.types.get(name)? {
            TypeDecl::Record(fields) => Some(fields.as_slice()),
            TypeDecl::Variant(_) => None,
        }
    }

    /// Declared type names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// The outer shape of a resolved inference type.
///
/// Mirrors the surface [`Type`] constructors, applied to inference types so
/// that unresolved variables can sit anywhere inside.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<A> {
    Lit(LitKind),
    Named(String),
    Arrow(Box<InferType<A>>, Box<InferType<A>>),
    List(Box<InferType<A>>),
}

/// A type during inference, annotated with the source annotation `A` of the
/// expression that introduced it.
///
/// Both variants carry a list of deferred field constraints: "whatever this
/// type turns out to be, it must have these fields of these types". Field
/// constraints accumulate on variables while they are unresolved and are
/// checked against record declarations once the variable resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum InferType<A> {
    /// Unresolved unification variable.
    Var {
        ann: A,
        id: TypeVarId,
        fields: Vec<(Label, InferType<A>)>,
    },
    /// Known outer shape (which may still contain variables inside).
    Known {
        ann: A,
        shape: Shape<A>,
        fields: Vec<(Label, InferType<A>)>,
    },
}

impl<A> InferType<A> {
    pub fn ann(&self) -> &A {
        match self {
            InferType::Var { ann, .. } | InferType::Known { ann, .. } => ann,
        }
    }

    pub fn fields(&self) -> &[(Label, InferType<A>)] {
        match self {
            InferType::Var { fields, .. } | InferType::Known { fields, .. } => fields,
        }
    }

    pub fn set_fields(&mut self, new_fields: Vec<(Label, InferType<A>)>) {
        match self {
            InferType::Var { fields, .. } | InferType::Known { fields, .. } => {
                *fields = new_fields;
            }
        }
    }

    /// The variable id, for unresolved variables.
    pub fn var_id(&self) -> Option<TypeVarId> {
        match self {
            InferType::Var { id, .. } => Some(*id),
            InferType::Known { .. } => None,
        }
    }

    /// Lift a surface type into an inference type, tagging every node with
    /// `ann`.
    pub fn from_type(ann: A, ty: &Type) -> Self
    where
        A: Clone,
    {
        let shape = match ty {
            Type::Lit(kind) => Shape::Lit(*kind),
            Type::Named(name) => Shape::Named(name.clone()),
            Type::Arrow(domain, codomain) => Shape::Arrow(
                Box::new(Self::from_type(ann.clone(), domain)),
                Box::new(Self::from_type(ann.clone(), codomain)),
            ),
            Type::List(element) => Shape::List(Box::new(Self::from_type(ann.clone(), element))),
        };
        InferType::Known {
            ann,
            shape,
            fields: Vec::new(),
        }
    }

    /// Render as a surface type for diagnostics.
    ///
    /// Unresolved variables are displayed through `namer` so that no raw
    /// variable id ever reaches user-facing output. Field constraints are
    /// not part of the rendered type; diagnostics that need them carry them
    /// separately.
    pub fn to_display_type(&self, namer: &mut VarNamer) -> Type {
        match self {
            InferType::Var { id, .. } => Type::Named(namer.name(*id)),
            InferType::Known { shape, .. } => match shape {
                Shape::Lit(kind) => Type::Lit(*kind),
                Shape::Named(name) => Type::Named(name.clone()),
                Shape::Arrow(domain, codomain) => Type::arrow(
                    domain.to_display_type(namer),
                    codomain.to_display_type(namer),
                ),
                Shape::List(element) => Type::list(element.to_display_type(namer)),
            },
        }
    }
}

impl<A> fmt::Display for InferType<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_fields<A>(
            f: &mut fmt::Formatter<'_>,
            fields: &[(Label, InferType<A>)],
        ) -> fmt::Result {
            if fields.is_empty() {
                return Ok(());
            }
            write!(f, "{{")?;
            for (i, (label, ty)) in fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{label}: {ty}")?;
            }
            write!(f, "}}")
        }

        match self {
            InferType::Var { id, fields, .. } => {
                write!(f, "t{}", id.0)?;
                write_fields(f, fields)
            }
            InferType::Known { shape, fields, .. } => {
                match shape {
                    Shape::Lit(kind) => write!(f, "{kind}")?,
                    Shape::Named(name) => write!(f, "{name}")?,
                    Shape::Arrow(domain, codomain) => {
                        if matches!(domain.as_ref(), InferType::Known { shape: Shape::Arrow(_, _), .. }) {
                            write!(f, "({domain}) -> {codomain}")?;
                        } else {
                            write!(f, "{domain} -> {codomain}")?;
                        }
                    }
                    Shape::List(element) => write!(f, "List({element})")?,
                }
                write_fields(f, fields)
            }
        }
    }
}

/// Assigns display names to unification variables in first-appearance order.
///
/// One namer is shared across every type of a single diagnostic so that the
/// same variable renders as the same letter on both sides (`a` vs `a`, not
/// `a` vs `b`).
#[derive(Debug, Default)]
pub struct VarNamer {
    names: BTreeMap<TypeVarId, usize>,
}

impl VarNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, id: TypeVarId) -> String {
        let next = self.names.len();
        let index = *self.names.entry(id).or_insert(next);
        if index < 26 {
            char::from(b'a' + index as u8).to_string()
        } else {
            format!("t{}", index - 26)
        }
    }
}

// ---------------------------------------------------------------------------
// Substitutions
// ---------------------------------------------------------------------------

/// Maps unification variables to their class representatives.
///
/// Built from the union-find store after solving; entries whose
/// representative is the variable itself (and carries nothing else) are
/// omitted.
#[derive(Debug, Clone, Default)]
pub struct Substitutions<A> {
    map: BTreeMap<TypeVarId, InferType<A>>,
}

impl<A> Substitutions<A> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, var: TypeVarId, ty: InferType<A>) {
        self.map.insert(var, ty);
    }

    pub fn lookup(&self, var: TypeVarId) -> Option<&InferType<A>> {
        self.map.get(&var)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bindings(&self) -> &BTreeMap<TypeVarId, InferType<A>> {
        &self.map
    }

    /// Apply this substitution to a type, replacing bound variables
    /// recursively.
    ///
    /// Field-constraint lists are carried over as-is, not substituted:
    /// after solving they are only inspected for their labels (lowering's
    /// subset and emptiness checks), never read as resolved types.
    pub fn apply(&self, ty: &InferType<A>) -> InferType<A>
    where
        A: Clone,
    {
        match ty {
            InferType::Var { id, .. } => match self.map.get(id) {
                None => ty.clone(),
                Some(resolved) => {
                    // A variable may be bound to itself-with-fields when its
                    // class never resolved but accumulated constraints; stop
                    // there rather than looping.
                    if let InferType::Var { id: rep_id, .. } = resolved
                        && rep_id == id
                    {
                        resolved.clone()
                    } else {
                        self.apply(resolved)
                    }
                }
            },
            InferType::Known { ann, shape, fields } => InferType::Known {
                ann: ann.clone(),
                shape: match shape {
                    Shape::Lit(kind) => Shape::Lit(*kind),
                    Shape::Named(name) => Shape::Named(name.clone()),
                    Shape::Arrow(domain, codomain) => Shape::Arrow(
                        Box::new(self.apply(domain)),
                        Box::new(self.apply(codomain)),
                    ),
                    Shape::List(element) => Shape::List(Box::new(self.apply(element))),
                },
                fields: fields.clone(),
            },
        }
    }
}
