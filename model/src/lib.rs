//! Language-neutral data model for the armature dependency-injection graph
//! resolver: reified types with substitution and unification, the tag
//! algebra, host element metadata, and the component-declaration hierarchy.

mod declaration;
mod element;
mod error;
mod names;
mod oracle;
mod tags;
mod types;

pub use declaration::{
    AnnotatedComponent, ComponentDeclaration, DiscoveredComponent, ExtensionComponent,
    FromModuleComponent, OptionalComponent, PromisedProxyComponent,
};
pub use element::{
    Annotation, AnnotationValue, Constructor, DEFAULT_COMPONENT_ANNOTATION, ModuleDeclaration,
    ModuleMethod, Parameter, SourceElement, TAG_ANNOTATION, TypeElement, find_annotation,
    parse_tag_value,
};
pub use error::Error;
pub use names::{MethodName, TypeName, TypeVarName};
pub use oracle::{NominalOracle, TypeOracle};
pub use tags::{ANY_TAG, PROMISED_PROXY_TAG, TagSet};
pub use types::{
    INTERCEPTOR_TYPE, NamedType, OPTIONAL_TYPE, Substitution, TypeRef, UnifyError, unify,
};
