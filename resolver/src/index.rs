use std::collections::BTreeMap;

use armature_model::{ComponentDeclaration, TagSet, TypeName, TypeRef};

/// Identity of a declaration in the provider index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub usize);

/// Bulk index of declarations keyed by the erased head constructor of the
/// produced type. Read-only after intake except for declarations appended by
/// extension dispatch and dependency discovery.
#[derive(Debug, Default)]
pub struct ProviderIndex {
    decls: Vec<ComponentDeclaration>,
    concrete: BTreeMap<TypeName, Vec<DeclId>>,
    defaults: BTreeMap<TypeName, Vec<DeclId>>,
    templates: BTreeMap<TypeName, Vec<DeclId>>,
    interceptors: Vec<DeclId>,
}

/// Result of a lookup for one demand: concrete matches, templates whose head
/// matched (arguments unify at resolve time), and default providers to
/// consult only when nothing else matches.
#[derive(Debug, Default)]
pub struct Candidates {
    pub concrete: Vec<DeclId>,
    pub templates: Vec<DeclId>,
    pub defaults: Vec<DeclId>,
}

impl ProviderIndex {
    pub fn build(decls: Vec<ComponentDeclaration>) -> Self {
        let mut index = Self::default();
        for decl in decls {
            index.insert(decl);
        }
        index
    }

    /// Index a provider declaration. Interceptors go into their own bucket
    /// and never satisfy ordinary demands.
    pub fn insert(&mut self, decl: ComponentDeclaration) -> DeclId {
        let id = DeclId(self.decls.len());
        let head = decl
            .produced_type()
            .head_name()
            .expect("intake guarantees a nominal produced type")
            .clone();
        if decl.is_interceptor() {
            self.interceptors.push(id);
        } else if decl.is_template() {
            self.templates.entry(head).or_default().push(id);
        } else if decl.is_default() {
            self.defaults.entry(head).or_default().push(id);
        } else {
            self.concrete.entry(head).or_default().push(id);
        }
        self.decls.push(decl);
        id
    }

    /// Store a synthesized declaration (promised proxy, optional placeholder)
    /// without making it a provider candidate.
    pub fn insert_unindexed(&mut self, decl: ComponentDeclaration) -> DeclId {
        let id = DeclId(self.decls.len());
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> &ComponentDeclaration {
        &self.decls[id.0]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn interceptors(&self) -> &[DeclId] {
        &self.interceptors
    }

    pub fn lookup(&self, ty: &TypeRef, tags: &TagSet) -> Candidates {
        let Some(head) = ty.head_name() else {
            return Candidates::default();
        };

        let tag_matched = |ids: Option<&Vec<DeclId>>, exact_type: bool| -> Vec<DeclId> {
            ids.map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&id| {
                        let decl = self.get(id);
                        (!exact_type || decl.produced_type() == ty)
                            && tags.matches_provider(decl.tags())
                    })
                    .collect()
            })
            .unwrap_or_default()
        };

        Candidates {
            concrete: tag_matched(self.concrete.get(head), true),
            templates: tag_matched(self.templates.get(head), false),
            defaults: tag_matched(self.defaults.get(head), true),
        }
    }
}
