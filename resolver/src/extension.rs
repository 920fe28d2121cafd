use armature_model::{ComponentDeclaration, Parameter, SourceElement, TagSet, TypeRef};

/// A pluggable generator that can synthesize a declaration for an otherwise
/// unresolved demand. Extensions are consulted in registry order; they are
/// invoked synchronously and must be pure functions of the demand.
pub trait Extension {
    fn can_handle(&self, ty: &TypeRef, tags: &TagSet) -> bool;

    fn generate(&self, ty: &TypeRef, tags: &TagSet) -> ExtensionResult;
}

#[derive(Clone, Debug)]
pub enum ExtensionResult {
    Generated(GeneratedResult),
    /// "Retry in the next round": another extension's output may unblock
    /// this demand.
    Deferred,
}

/// What an extension produced: either a constructor, whose enclosing class
/// type is the produced type, or a factory method with a declared return
/// type.
#[derive(Clone, Debug)]
pub enum GeneratedResult {
    Constructor {
        element: SourceElement,
        class_type: TypeRef,
        params: Vec<Parameter>,
    },
    Factory {
        element: SourceElement,
        return_type: TypeRef,
        params: Vec<Parameter>,
    },
}

impl GeneratedResult {
    pub(crate) fn element(&self) -> &SourceElement {
        match self {
            GeneratedResult::Constructor { element, .. } => element,
            GeneratedResult::Factory { element, .. } => element,
        }
    }

    pub(crate) fn into_declaration(self) -> Result<ComponentDeclaration, armature_model::Error> {
        match self {
            GeneratedResult::Constructor {
                element,
                class_type,
                params,
            } => ComponentDeclaration::from_extension(element, class_type, params),
            GeneratedResult::Factory {
                element,
                return_type,
                params,
            } => ComponentDeclaration::from_extension(element, return_type, params),
        }
    }
}
