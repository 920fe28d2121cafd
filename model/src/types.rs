use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::names::{TypeName, TypeVarName};

/// Head name of the optional wrapper, `Optional<U>`.
pub const OPTIONAL_TYPE: &str = "Optional";
/// Head name of the interceptor marker, `Interceptor<T>`; the first type
/// argument is the interception target.
pub const INTERCEPTOR_TYPE: &str = "Interceptor";

/// A language-neutral reification of a type: a tree of type-constructor
/// nodes, type variables and wildcards. Two types are equal iff their trees
/// match structurally.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Named(NamedType),
    Variable(TypeVarName),
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedType {
    pub name: TypeName,
    pub args: Vec<TypeRef>,
    /// A generic constructor used without type arguments.
    pub raw: bool,
}

/// A mapping from type variables to concrete types, as produced by [`unify`].
pub type Substitution = BTreeMap<TypeVarName, TypeRef>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum UnifyError {
    #[error("`{pattern}` does not match `{concrete}`")]
    Mismatch { pattern: TypeRef, concrete: TypeRef },

    #[error("`{pattern}` and `{concrete}` take different numbers of type arguments")]
    Arity { pattern: TypeRef, concrete: TypeRef },

    #[error("type variable `{var}` bound to both `{first}` and `{second}`")]
    Conflict {
        var: TypeVarName,
        first: TypeRef,
        second: TypeRef,
    },
}

impl TypeRef {
    pub fn named(name: TypeName) -> Self {
        TypeRef::Named(NamedType {
            name,
            args: Vec::new(),
            raw: false,
        })
    }

    pub fn generic(name: TypeName, args: Vec<TypeRef>) -> Self {
        TypeRef::Named(NamedType {
            name,
            args,
            raw: false,
        })
    }

    pub fn raw(name: TypeName) -> Self {
        TypeRef::Named(NamedType {
            name,
            args: Vec::new(),
            raw: true,
        })
    }

    pub fn variable(name: TypeVarName) -> Self {
        TypeRef::Variable(name)
    }

    /// The erased nominal identity of the top-level constructor, if any.
    pub fn head_name(&self) -> Option<&TypeName> {
        match self {
            TypeRef::Named(n) => Some(&n.name),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            TypeRef::Named(n) => Some(n),
            _ => None,
        }
    }

    /// True iff any leaf of the tree is a type variable.
    pub fn has_type_parameter(&self) -> bool {
        match self {
            TypeRef::Variable(_) => true,
            TypeRef::Wildcard => false,
            TypeRef::Named(n) => n.args.iter().any(TypeRef::has_type_parameter),
        }
    }

    /// True iff any constructor in the tree carries the rawness flag.
    pub fn has_raw_types(&self) -> bool {
        match self {
            TypeRef::Named(n) => n.raw || n.args.iter().any(TypeRef::has_raw_types),
            _ => false,
        }
    }

    /// `Some(U)` when this type is the optional wrapper `Optional<U>`.
    pub fn optional_inner(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Named(n) if n.name.as_str() == OPTIONAL_TYPE && n.args.len() == 1 => {
                Some(&n.args[0])
            }
            _ => None,
        }
    }

    /// `Some(T)` when this type is `Interceptor<T, ...>`.
    pub fn interceptor_target(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Named(n) if n.name.as_str() == INTERCEPTOR_TYPE && !n.args.is_empty() => {
                Some(&n.args[0])
            }
            _ => None,
        }
    }

    /// Capture-free replacement of type variables; unbound variables are left
    /// in place.
    pub fn subst(&self, map: &Substitution) -> TypeRef {
        match self {
            TypeRef::Variable(v) => map.get(v).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Wildcard => TypeRef::Wildcard,
            TypeRef::Named(n) => TypeRef::Named(NamedType {
                name: n.name.clone(),
                args: n.args.iter().map(|a| a.subst(map)).collect(),
                raw: n.raw,
            }),
        }
    }
}

/// Compute the minimal substitution `σ` such that `subst(pattern, σ)` equals
/// `concrete`. Variables occur only in `pattern`; a wildcard in the pattern
/// matches anything and binds nothing.
pub fn unify(pattern: &TypeRef, concrete: &TypeRef) -> Result<Substitution, UnifyError> {
    let mut map = Substitution::new();
    unify_into(pattern, concrete, &mut map)?;
    Ok(map)
}

fn unify_into(
    pattern: &TypeRef,
    concrete: &TypeRef,
    map: &mut Substitution,
) -> Result<(), UnifyError> {
    match (pattern, concrete) {
        (TypeRef::Wildcard, _) => Ok(()),
        (TypeRef::Variable(v), _) => {
            if let Some(bound) = map.get(v) {
                if bound != concrete {
                    return Err(UnifyError::Conflict {
                        var: v.clone(),
                        first: bound.clone(),
                        second: concrete.clone(),
                    });
                }
                return Ok(());
            }
            map.insert(v.clone(), concrete.clone());
            Ok(())
        }
        (TypeRef::Named(p), TypeRef::Named(c)) => {
            if p.name != c.name || p.raw != c.raw {
                return Err(UnifyError::Mismatch {
                    pattern: pattern.clone(),
                    concrete: concrete.clone(),
                });
            }
            if p.args.len() != c.args.len() {
                return Err(UnifyError::Arity {
                    pattern: pattern.clone(),
                    concrete: concrete.clone(),
                });
            }
            for (pa, ca) in p.args.iter().zip(&c.args) {
                unify_into(pa, ca, map)?;
            }
            Ok(())
        }
        _ => Err(UnifyError::Mismatch {
            pattern: pattern.clone(),
            concrete: concrete.clone(),
        }),
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Wildcard => f.write_str("?"),
            TypeRef::Variable(v) => write!(f, "{v}"),
            TypeRef::Named(n) => {
                f.write_str(n.name.as_str())?;
                if n.args.is_empty() {
                    return Ok(());
                }
                f.write_str("<")?;
                for (i, arg) in n.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}
