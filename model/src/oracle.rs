use std::collections::{BTreeMap, BTreeSet};

use crate::{names::TypeName, types::TypeRef};

/// Host-supplied subtyping knowledge. The resolver only needs an
/// assignability check, interceptor classification and proxy eligibility;
/// structural equality, substitution and unification live on [`TypeRef`].
pub trait TypeOracle {
    /// Whether a value of `from` may be used where `to` is demanded, after
    /// substitution. The host reproduces its language's subtype relation.
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool;

    /// Whether the type is an interceptor (decorates other components
    /// instead of satisfying ordinary demands).
    fn is_interceptor(&self, ty: &TypeRef) -> bool;

    /// Whether the type admits a generated proxy: it must be a reference
    /// type, not a value/primitive.
    fn is_reference(&self, ty: &TypeRef) -> bool;
}

/// A purely nominal oracle for hosts without structural subtyping: a type is
/// assignable to itself and to its registered supertypes; everything not
/// registered as a primitive is a reference type.
#[derive(Clone, Debug, Default)]
pub struct NominalOracle {
    supertypes: BTreeMap<TypeName, BTreeSet<TypeName>>,
    primitives: BTreeSet<TypeName>,
}

impl NominalOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supertype(mut self, sub: TypeName, sup: TypeName) -> Self {
        self.supertypes.entry(sub).or_default().insert(sup);
        self
    }

    pub fn with_primitive(mut self, name: TypeName) -> Self {
        self.primitives.insert(name);
        self
    }

    fn is_supertype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue = vec![sub.clone()];
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(supers) = self.supertypes.get(&current) else {
                continue;
            };
            if supers.contains(sup) {
                return true;
            }
            queue.extend(supers.iter().cloned());
        }
        false
    }
}

impl TypeOracle for NominalOracle {
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }
        match (from.head_name(), to.as_named()) {
            // Widening to a registered supertype; erased on the target side.
            (Some(sub), Some(sup)) if sup.args.is_empty() => self.is_supertype(sub, &sup.name),
            _ => false,
        }
    }

    fn is_interceptor(&self, ty: &TypeRef) -> bool {
        ty.interceptor_target().is_some()
    }

    fn is_reference(&self, ty: &TypeRef) -> bool {
        match ty.head_name() {
            Some(name) => !self.primitives.contains(name),
            None => false,
        }
    }
}
