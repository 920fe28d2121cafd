use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Intake(#[from] armature_model::Error),

    #[error("more than one component matches dependency {demand}: {candidates}")]
    #[diagnostic(
        code(resolver::ambiguous_binding),
        help("Tag one of the providers, or mark all but one as a default component.")
    )]
    AmbiguousBinding { demand: String, candidates: String },

    #[error("more than one default component matches dependency {demand}: {candidates}")]
    #[diagnostic(code(resolver::ambiguous_default))]
    AmbiguousDefault { demand: String, candidates: String },

    #[error("no component found for dependency {demand} required by {requested_by}")]
    #[diagnostic(code(resolver::unresolved_dependency))]
    UnresolvedDependency {
        demand: String,
        requested_by: String,
    },

    #[error("dependency cycle with no proxyable edge: {path}")]
    #[diagnostic(
        code(resolver::unbreakable_cycle),
        help(
            "At least one dependency in the cycle must be a plain reference type so a promised \
             proxy can stand in for it."
        )
    )]
    UnbreakableCycle { path: String },

    #[error("template {template} does not specialize to requested type {demand}: {reason}")]
    #[diagnostic(code(resolver::template_unification_failed))]
    TemplateUnificationFailed {
        demand: String,
        template: String,
        reason: String,
    },

    #[error(
        "extension {element} generated a component of type {generated}, which does not match \
         the demanded {demand}"
    )]
    #[diagnostic(code(resolver::extension_mismatch))]
    ExtensionMismatch {
        demand: String,
        generated: String,
        element: String,
    },

    #[error("extension dispatch for {demand} exceeded the round limit of {limit}")]
    #[diagnostic(code(resolver::extension_round_limit))]
    ExtensionRoundLimit { demand: String, limit: usize },

    #[error("internal resolver invariant violated at {element}: {message}")]
    #[diagnostic(code(resolver::internal))]
    Internal { element: String, message: String },
}

impl Error {
    /// Stable diagnostic kind recorded by the sink.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Intake(armature_model::Error::RawType { .. }) => "RawType",
            Error::Intake(armature_model::Error::ConstructorArity { .. }) => "ConstructorArity",
            Error::Intake(armature_model::Error::TemplateDependency { .. }) => {
                "TemplateDependency"
            }
            Error::Intake(_) => "Intake",
            Error::AmbiguousBinding { .. } => "AmbiguousBinding",
            Error::AmbiguousDefault { .. } => "AmbiguousDefault",
            Error::UnresolvedDependency { .. } => "UnresolvedDependency",
            Error::UnbreakableCycle { .. } => "UnbreakableCycle",
            Error::TemplateUnificationFailed { .. } => "TemplateUnificationFailed",
            Error::ExtensionMismatch { .. } => "ExtensionMismatch",
            Error::ExtensionRoundLimit { .. } => "ExtensionRoundLimit",
            Error::Internal { .. } => "InternalError",
        }
    }
}
