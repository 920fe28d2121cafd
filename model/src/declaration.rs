use serde::{Deserialize, Serialize};

use crate::{
    element::{
        DEFAULT_COMPONENT_ANNOTATION, ModuleDeclaration, ModuleMethod, Parameter, SourceElement,
        TypeElement, find_annotation, parse_tag_value,
    },
    error::Error,
    names::{MethodName, TypeName, TypeVarName},
    oracle::TypeOracle,
    tags::TagSet,
    types::{Substitution, TypeRef},
};

/// A registered potential provider of a value for a type. The first four
/// variants are created once during intake and are immutable; promised
/// proxies and optional placeholders are synthesized on demand by the
/// resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentDeclaration {
    FromModule(FromModuleComponent),
    Annotated(AnnotatedComponent),
    DiscoveredAsDependency(DiscoveredComponent),
    FromExtension(ExtensionComponent),
    PromisedProxy(PromisedProxyComponent),
    Optional(OptionalComponent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromModuleComponent {
    pub ty: TypeRef,
    pub module: TypeName,
    pub method: MethodName,
    pub tags: TagSet,
    pub params: Vec<Parameter>,
    pub type_vars: Vec<TypeVarName>,
    pub is_interceptor: bool,
    pub is_default: bool,
    pub element: SourceElement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedComponent {
    pub ty: TypeRef,
    pub type_name: TypeName,
    pub tags: TagSet,
    pub params: Vec<Parameter>,
    pub type_vars: Vec<TypeVarName>,
    pub is_interceptor: bool,
    pub element: SourceElement,
}

/// Invariant: the class has no type parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredComponent {
    pub ty: TypeRef,
    pub type_name: TypeName,
    pub tags: TagSet,
    pub params: Vec<Parameter>,
    pub element: SourceElement,
}

/// Always untagged, never an interceptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionComponent {
    pub ty: TypeRef,
    pub tags: TagSet,
    pub params: Vec<Parameter>,
    pub element: SourceElement,
}

/// Synthesized by the cycle breaker; carries the reserved promised-proxy tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromisedProxyComponent {
    pub ty: TypeRef,
    pub tags: TagSet,
    /// Generated class name, unique per target type.
    pub class_name: String,
    pub element: SourceElement,
}

/// Placeholder meaning "absence is legal"; has no source element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalComponent {
    pub ty: TypeRef,
    pub tags: TagSet,
}

impl ComponentDeclaration {
    pub fn from_module(
        oracle: &dyn TypeOracle,
        module: &ModuleDeclaration,
        method: &ModuleMethod,
    ) -> Result<Self, Error> {
        let element = module.element().member(&method.name);
        check_produced_type(&method.return_type, &element)?;
        let tags = parse_tag_value(&method.annotations);
        let is_default =
            find_annotation(&method.annotations, DEFAULT_COMPONENT_ANNOTATION).is_some();
        let is_interceptor = oracle.is_interceptor(&method.return_type);
        Ok(Self::FromModule(FromModuleComponent {
            ty: method.return_type.clone(),
            module: module.name.clone(),
            method: method.name.clone(),
            tags,
            params: method.params.clone(),
            type_vars: method.type_vars.clone(),
            is_interceptor,
            is_default,
            element,
        }))
    }

    pub fn from_annotated(oracle: &dyn TypeOracle, elem: &TypeElement) -> Result<Self, Error> {
        let element = elem.element();
        let constructor = single_public_constructor(elem)?;
        check_produced_type(&elem.ty, &element)?;
        let tags = parse_tag_value(&elem.annotations);
        let is_interceptor = oracle.is_interceptor(&elem.ty);
        Ok(Self::Annotated(AnnotatedComponent {
            ty: elem.ty.clone(),
            type_name: elem.name.clone(),
            tags,
            params: constructor.params.clone(),
            type_vars: elem.type_vars.clone(),
            is_interceptor,
            element,
        }))
    }

    pub fn from_dependency(elem: &TypeElement) -> Result<Self, Error> {
        let element = elem.element();
        let constructor = single_public_constructor(elem)?;
        if !elem.type_vars.is_empty() {
            return Err(Error::TemplateDependency {
                element: element.to_string(),
            });
        }
        check_produced_type(&elem.ty, &element)?;
        let tags = parse_tag_value(&elem.annotations);
        Ok(Self::DiscoveredAsDependency(DiscoveredComponent {
            ty: elem.ty.clone(),
            type_name: elem.name.clone(),
            tags,
            params: constructor.params.clone(),
            element,
        }))
    }

    pub fn from_extension(
        element: SourceElement,
        produced: TypeRef,
        params: Vec<Parameter>,
    ) -> Result<Self, Error> {
        check_produced_type(&produced, &element)?;
        Ok(Self::FromExtension(ExtensionComponent {
            ty: produced,
            tags: TagSet::empty(),
            params,
            element,
        }))
    }

    pub fn promised_proxy(element: SourceElement, ty: TypeRef, class_name: String) -> Self {
        Self::PromisedProxy(PromisedProxyComponent {
            ty,
            tags: TagSet::promised_proxy(),
            class_name,
            element,
        })
    }

    pub fn optional(ty: TypeRef, tags: TagSet) -> Self {
        Self::Optional(OptionalComponent { ty, tags })
    }

    pub fn produced_type(&self) -> &TypeRef {
        match self {
            Self::FromModule(c) => &c.ty,
            Self::Annotated(c) => &c.ty,
            Self::DiscoveredAsDependency(c) => &c.ty,
            Self::FromExtension(c) => &c.ty,
            Self::PromisedProxy(c) => &c.ty,
            Self::Optional(c) => &c.ty,
        }
    }

    /// The originating source element; `None` only for optional placeholders.
    pub fn source(&self) -> Option<&SourceElement> {
        match self {
            Self::FromModule(c) => Some(&c.element),
            Self::Annotated(c) => Some(&c.element),
            Self::DiscoveredAsDependency(c) => Some(&c.element),
            Self::FromExtension(c) => Some(&c.element),
            Self::PromisedProxy(c) => Some(&c.element),
            Self::Optional(_) => None,
        }
    }

    pub fn tags(&self) -> &TagSet {
        match self {
            Self::FromModule(c) => &c.tags,
            Self::Annotated(c) => &c.tags,
            Self::DiscoveredAsDependency(c) => &c.tags,
            Self::FromExtension(c) => &c.tags,
            Self::PromisedProxy(c) => &c.tags,
            Self::Optional(c) => &c.tags,
        }
    }

    /// Demand sites of the chosen factory, in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        match self {
            Self::FromModule(c) => &c.params,
            Self::Annotated(c) => &c.params,
            Self::DiscoveredAsDependency(c) => &c.params,
            Self::FromExtension(c) => &c.params,
            Self::PromisedProxy(_) | Self::Optional(_) => &[],
        }
    }

    pub fn type_vars(&self) -> &[TypeVarName] {
        match self {
            Self::FromModule(c) => &c.type_vars,
            Self::Annotated(c) => &c.type_vars,
            _ => &[],
        }
    }

    pub fn is_template(&self) -> bool {
        match self {
            Self::DiscoveredAsDependency(_) => false,
            _ => self.produced_type().has_type_parameter(),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::FromModule(c) if c.is_default)
    }

    pub fn is_interceptor(&self) -> bool {
        match self {
            Self::FromModule(c) => c.is_interceptor,
            Self::Annotated(c) => c.is_interceptor,
            _ => false,
        }
    }

    /// Apply a unification substitution to the produced type and every
    /// parameter site, producing the specialized declaration a resolved node
    /// records instead of the template.
    pub fn specialize(&self, map: &Substitution) -> Self {
        let mut specialized = self.clone();
        match &mut specialized {
            Self::FromModule(c) => {
                c.ty = c.ty.subst(map);
                for p in &mut c.params {
                    p.ty = p.ty.subst(map);
                }
                c.type_vars.retain(|v| !map.contains_key(v));
            }
            Self::Annotated(c) => {
                c.ty = c.ty.subst(map);
                for p in &mut c.params {
                    p.ty = p.ty.subst(map);
                }
                c.type_vars.retain(|v| !map.contains_key(v));
            }
            _ => {}
        }
        specialized
    }

    /// Human-readable identity used in diagnostics.
    pub fn declaration_string(&self) -> String {
        match self {
            Self::FromModule(c) => format!("{}.{}", c.module, c.method),
            Self::Annotated(c) => c.type_name.to_string(),
            Self::DiscoveredAsDependency(c) => c.type_name.to_string(),
            Self::FromExtension(c) => c.element.to_string(),
            Self::PromisedProxy(_) => "<Proxy>".to_string(),
            Self::Optional(_) => "<EmptyOptional>".to_string(),
        }
    }
}

fn check_produced_type(ty: &TypeRef, element: &SourceElement) -> Result<(), Error> {
    if ty.has_raw_types() {
        return Err(Error::RawType {
            element: element.to_string(),
        });
    }
    if !matches!(ty, TypeRef::Named(_)) {
        return Err(Error::UnresolvableProducedType {
            element: element.to_string(),
        });
    }
    Ok(())
}

fn single_public_constructor(elem: &TypeElement) -> Result<&crate::element::Constructor, Error> {
    match elem.constructors.as_slice() {
        [single] => Ok(single),
        other => Err(Error::ConstructorArity {
            element: elem.element().to_string(),
            found: other.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        element::{Annotation, Constructor},
        oracle::NominalOracle,
        types::INTERCEPTOR_TYPE,
    };

    fn name(s: &str) -> TypeName {
        TypeName::try_from(s).unwrap()
    }

    fn var(s: &str) -> TypeVarName {
        TypeVarName::try_from(s).unwrap()
    }

    fn module_with(method: ModuleMethod) -> ModuleDeclaration {
        ModuleDeclaration {
            name: name("app.MainModule"),
            methods: vec![method],
        }
    }

    fn method(name_str: &str, return_type: TypeRef) -> ModuleMethod {
        ModuleMethod {
            name: MethodName::try_from(name_str).unwrap(),
            return_type,
            params: Vec::new(),
            type_vars: Vec::new(),
            annotations: Vec::new(),
        }
    }

    fn class(name_str: &str, constructors: usize) -> TypeElement {
        TypeElement {
            name: name(name_str),
            ty: TypeRef::named(name(name_str)),
            type_vars: Vec::new(),
            constructors: (0..constructors)
                .map(|_| Constructor { params: Vec::new() })
                .collect(),
            annotations: Vec::new(),
            has_raw_members: false,
        }
    }

    #[test]
    fn from_module_rejects_raw_return_types() {
        let oracle = NominalOracle::new();
        let m = method("lists", TypeRef::raw(name("List")));
        let err = ComponentDeclaration::from_module(&oracle, &module_with(m.clone()), &m)
            .unwrap_err();
        assert!(matches!(err, Error::RawType { .. }));
    }

    #[test]
    fn from_module_captures_tags_default_marker_and_template_vars() {
        let oracle = NominalOracle::new();
        let mut m = method(
            "container",
            TypeRef::generic(name("Container"), vec![TypeRef::variable(var("T"))]),
        );
        m.type_vars = vec![var("T")];
        m.annotations = vec![
            Annotation::tags(["db"]),
            Annotation::marker(DEFAULT_COMPONENT_ANNOTATION),
        ];
        let decl = ComponentDeclaration::from_module(&oracle, &module_with(m.clone()), &m).unwrap();
        assert!(decl.is_template());
        assert!(decl.is_default());
        assert!(decl.tags().contains("db"));
        assert_eq!(decl.declaration_string(), "app.MainModule.container");
    }

    #[test]
    fn from_annotated_requires_exactly_one_public_constructor() {
        let oracle = NominalOracle::new();
        let err = ComponentDeclaration::from_annotated(&oracle, &class("app.Service", 2))
            .unwrap_err();
        assert!(matches!(err, Error::ConstructorArity { found: 2, .. }));
    }

    #[test]
    fn from_dependency_rejects_type_parameters() {
        let mut elem = class("app.Repo", 1);
        elem.type_vars = vec![var("T")];
        let err = ComponentDeclaration::from_dependency(&elem).unwrap_err();
        assert!(matches!(err, Error::TemplateDependency { .. }));
    }

    #[test]
    fn interceptors_are_classified_by_the_oracle() {
        let oracle = NominalOracle::new();
        let m = method(
            "audit",
            TypeRef::generic(
                name(INTERCEPTOR_TYPE),
                vec![TypeRef::named(name("app.Service"))],
            ),
        );
        let decl = ComponentDeclaration::from_module(&oracle, &module_with(m.clone()), &m).unwrap();
        assert!(decl.is_interceptor());
    }

    #[test]
    fn template_flag_follows_the_produced_type() {
        let oracle = NominalOracle::new();
        let m = method("value", TypeRef::named(name("Int")));
        let decl = ComponentDeclaration::from_module(&oracle, &module_with(m.clone()), &m).unwrap();
        assert!(!decl.is_template());
    }

    #[test]
    fn specialize_substitutes_produced_type_and_parameters() {
        let oracle = NominalOracle::new();
        let mut m = method(
            "container",
            TypeRef::generic(name("Container"), vec![TypeRef::variable(var("T"))]),
        );
        m.type_vars = vec![var("T")];
        m.params = vec![Parameter::new("item", TypeRef::variable(var("T")))];
        let decl = ComponentDeclaration::from_module(&oracle, &module_with(m.clone()), &m).unwrap();

        let mut map = Substitution::new();
        map.insert(var("T"), TypeRef::named(name("Int")));
        let specialized = decl.specialize(&map);
        assert_eq!(
            *specialized.produced_type(),
            TypeRef::generic(name("Container"), vec![TypeRef::named(name("Int"))])
        );
        assert_eq!(
            specialized.parameters()[0].ty,
            TypeRef::named(name("Int"))
        );
        assert!(!specialized.is_template());
        assert!(specialized.type_vars().is_empty());
    }

    #[test]
    fn synthesized_variants_expose_expected_defaults() {
        let proxy = ComponentDeclaration::promised_proxy(
            SourceElement::new("app.Service"),
            TypeRef::named(name("app.Service")),
            "$Proxy_Service".to_string(),
        );
        assert!(proxy.tags().contains(crate::tags::PROMISED_PROXY_TAG));
        assert!(!proxy.is_interceptor());
        assert_eq!(proxy.declaration_string(), "<Proxy>");

        let optional =
            ComponentDeclaration::optional(TypeRef::named(name("app.Service")), TagSet::empty());
        assert!(optional.source().is_none());
        assert_eq!(optional.declaration_string(), "<EmptyOptional>");
    }
}
