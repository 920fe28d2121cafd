use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid {kind} name `{name}`")]
    #[diagnostic(code(model::invalid_name))]
    InvalidName { kind: &'static str, name: String },

    #[error(
        "components with raw types can break dependency resolution in unpredictable ways, so \
         they are forbidden: {element}"
    )]
    #[diagnostic(code(model::raw_type))]
    RawType { element: String },

    #[error(
        "component `{element}` must have exactly one public constructor, found {found}"
    )]
    #[diagnostic(code(model::constructor_arity))]
    ConstructorArity { element: String, found: usize },

    #[error(
        "class `{element}` discovered as a dependency must not declare type parameters"
    )]
    #[diagnostic(code(model::template_dependency))]
    TemplateDependency { element: String },

    #[error("component `{element}` produces a bare type variable, which cannot be resolved")]
    #[diagnostic(
        code(model::unresolvable_produced_type),
        help("Return a nominal type; type variables may only appear as type arguments.")
    )]
    UnresolvableProducedType { element: String },
}

impl Error {
    /// The offending source element, when the error is attached to one.
    pub fn element(&self) -> Option<&str> {
        match self {
            Error::RawType { element }
            | Error::ConstructorArity { element, .. }
            | Error::TemplateDependency { element }
            | Error::UnresolvableProducedType { element } => Some(element),
            Error::InvalidName { .. } => None,
        }
    }
}
