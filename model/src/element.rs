use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    names::{MethodName, TypeName, TypeVarName},
    tags::TagSet,
    types::TypeRef,
};

/// Annotation carrying tag strings.
pub const TAG_ANNOTATION: &str = "Tag";
/// Marker annotation for default components.
pub const DEFAULT_COMPONENT_ANNOTATION: &str = "DefaultComponent";

/// Stable display identity of an originating source element, e.g.
/// `app.SomeModule.someMethod`. Synthetic declarations use `<synthetic>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SourceElement(Arc<str>);

impl SourceElement {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn synthetic() -> Self {
        Self::new("<synthetic>")
    }

    pub fn member(&self, name: impl fmt::Display) -> Self {
        Self::new(format!("{}.{name}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SourceElement {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<SourceElement> for String {
    fn from(value: SourceElement) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationValue {
    Str(String),
    StrList(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub value: Option<AnnotationValue>,
}

impl Annotation {
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn tags<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: TAG_ANNOTATION.to_string(),
            value: Some(AnnotationValue::StrList(
                values.into_iter().map(Into::into).collect(),
            )),
        }
    }
}

pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

/// Parse the tag set of an element from its `Tag` annotation. Parsed once per
/// declaration at intake; ordering is irrelevant.
pub fn parse_tag_value(annotations: &[Annotation]) -> TagSet {
    match find_annotation(annotations, TAG_ANNOTATION).map(|a| &a.value) {
        Some(Some(AnnotationValue::Str(s))) => TagSet::from_iter([s.as_str()]),
        Some(Some(AnnotationValue::StrList(list))) => {
            list.iter().map(String::as_str).collect()
        }
        _ => TagSet::empty(),
    }
}

/// A demand site declared by a factory parameter: its static type plus the
/// tags required of the provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub tags: TagSet,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: TagSet::empty(),
        }
    }

    pub fn tagged(name: impl Into<String>, ty: TypeRef, tags: TagSet) -> Self {
        Self {
            name: name.into(),
            ty,
            tags,
        }
    }
}

/// A factory method exposed by a module.
#[derive(Clone, Debug)]
pub struct ModuleMethod {
    pub name: MethodName,
    pub return_type: TypeRef,
    pub params: Vec<Parameter>,
    pub type_vars: Vec<TypeVarName>,
    pub annotations: Vec<Annotation>,
}

/// A module as enumerated by the host: a named bag of factory methods.
#[derive(Clone, Debug)]
pub struct ModuleDeclaration {
    pub name: TypeName,
    pub methods: Vec<ModuleMethod>,
}

impl ModuleDeclaration {
    pub fn element(&self) -> SourceElement {
        SourceElement::new(self.name.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Constructor {
    pub params: Vec<Parameter>,
}

/// An annotated (or discoverable) class as enumerated by the host.
#[derive(Clone, Debug)]
pub struct TypeElement {
    pub name: TypeName,
    /// The declared type of the class, including its own type parameters as
    /// arguments, e.g. `Repo<T>`.
    pub ty: TypeRef,
    pub type_vars: Vec<TypeVarName>,
    /// Public constructors only.
    pub constructors: Vec<Constructor>,
    pub annotations: Vec<Annotation>,
    /// Whether any member of the class uses raw generics; drives the
    /// non-fatal intake warning for annotated components.
    pub has_raw_members: bool,
}

impl TypeElement {
    pub fn element(&self) -> SourceElement {
        SourceElement::new(self.name.as_str())
    }
}
