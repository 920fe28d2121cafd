use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use armature_graph::{Dependency, DependencyKind, NodeId, ProxyLink, ResolvedNode};
use armature_model::{
    ComponentDeclaration, SourceElement, Substitution, TagSet, TypeElement, TypeName, TypeOracle,
    TypeRef, UnifyError, unify,
};

use crate::{
    Options,
    diagnostics::DiagnosticSink,
    error::Error,
    extension::{Extension, ExtensionResult},
    index::{DeclId, ProviderIndex},
};

/// A (type, tags) pair requested by the resolver or declared as a root.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Demand {
    pub ty: TypeRef,
    pub tags: TagSet,
}

impl Demand {
    pub fn new(ty: TypeRef, tags: TagSet) -> Self {
        Self { ty, tags }
    }

    pub fn untagged(ty: TypeRef) -> Self {
        Self {
            ty,
            tags: TagSet::empty(),
        }
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} with tags {}", self.ty, self.tags)
        }
    }
}

/// An in-progress resolution frame: the demand being satisfied, the chosen
/// declaration, and the parameter site currently recursed into.
pub(crate) struct Frame {
    pub(crate) demand: Demand,
    pub(crate) decl: DeclId,
    pub(crate) declaration_string: String,
    pub(crate) site: Option<Demand>,
}

/// Outcome of resolving one demand. `Break` unwinds to the stack frame that
/// must replace its current parameter site with a promised proxy; `Missing`
/// is only produced for optimistic (optional) demands.
pub(crate) enum Resolution {
    Node(NodeId),
    Break { frame: usize },
    Missing,
}

/// Explicit context record threaded through every resolver entry point; owns
/// the graph under construction and the provider index, borrows everything
/// supplied by the host for the duration of one resolution pass.
pub(crate) struct ResolutionCtx<'a> {
    pub(crate) index: ProviderIndex,
    pub(crate) oracle: &'a dyn TypeOracle,
    pub(crate) extensions: &'a [Box<dyn Extension>],
    pub(crate) discoverable: BTreeMap<TypeName, TypeElement>,
    pub(crate) discovered: BTreeSet<TypeName>,
    pub(crate) opts: &'a Options,
    pub(crate) sink: &'a mut DiagnosticSink,
    pub(crate) nodes: Vec<ResolvedNode>,
    pub(crate) memo: BTreeMap<Demand, NodeId>,
    pub(crate) proxy_memo: BTreeMap<Demand, NodeId>,
    pub(crate) pending_proxies: Vec<(NodeId, Demand)>,
    pub(crate) stack: Vec<Frame>,
}

impl<'a> ResolutionCtx<'a> {
    pub(crate) fn new(
        index: ProviderIndex,
        oracle: &'a dyn TypeOracle,
        extensions: &'a [Box<dyn Extension>],
        discoverable: BTreeMap<TypeName, TypeElement>,
        opts: &'a Options,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        Self {
            index,
            oracle,
            extensions,
            discoverable,
            discovered: BTreeSet::new(),
            opts,
            sink,
            nodes: Vec::new(),
            memo: BTreeMap::new(),
            proxy_memo: BTreeMap::new(),
            pending_proxies: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub(crate) fn into_nodes(self) -> Vec<ResolvedNode> {
        self.nodes
    }

    /// Record a fatal diagnostic and hand the error back for propagation.
    pub(crate) fn fail(
        &mut self,
        element: SourceElement,
        frames: Vec<String>,
        err: Error,
    ) -> Error {
        self.sink.fatal(element, frames, &err);
        err
    }

    /// Resolve one demand to exactly one node. `required = false` is the
    /// optimistic mode used inside optional wrappers, where absence is legal.
    pub(crate) fn resolve(&mut self, demand: &Demand, required: bool) -> Result<Resolution, Error> {
        if let Some(&id) = self.memo.get(demand) {
            return Ok(Resolution::Node(id));
        }

        if let Some(pos) = self.stack.iter().position(|f| f.demand == *demand) {
            return self.break_cycle(demand, pos);
        }

        if let Some(inner) = demand.ty.optional_inner() {
            let inner_demand = Demand::new(inner.clone(), demand.tags.clone());
            return match self.resolve(&inner_demand, false)? {
                Resolution::Node(id) => {
                    let declaration =
                        ComponentDeclaration::optional(demand.ty.clone(), demand.tags.clone());
                    let deps = vec![Dependency {
                        node: id,
                        kind: DependencyKind::Direct,
                    }];
                    Ok(Resolution::Node(self.build_node(demand, declaration, deps)))
                }
                Resolution::Missing => {
                    tracing::debug!(demand = %demand, "optional dependency is absent");
                    let declaration =
                        ComponentDeclaration::optional(demand.ty.clone(), demand.tags.clone());
                    Ok(Resolution::Node(self.build_node(
                        demand,
                        declaration,
                        Vec::new(),
                    )))
                }
                brk @ Resolution::Break { .. } => Ok(brk),
            };
        }

        let Some((decl_id, declaration)) = self.select(demand, required)? else {
            return Ok(Resolution::Missing);
        };
        self.instantiate(decl_id, declaration, demand)
    }

    /// Pick exactly one provider for the demand, running extension rounds and
    /// dependency discovery when nothing is declared. Returns the (possibly
    /// specialized) declaration the node will record.
    fn select(
        &mut self,
        demand: &Demand,
        required: bool,
    ) -> Result<Option<(DeclId, ComponentDeclaration)>, Error> {
        let mut rounds = 0usize;
        loop {
            let candidates = self.index.lookup(&demand.ty, &demand.tags);

            match candidates.concrete.as_slice() {
                [] => {}
                [single] => {
                    let declaration = self.index.get(*single).clone();
                    return Ok(Some((*single, declaration)));
                }
                many => return Err(self.ambiguous(demand, many, false)),
            }

            let mut unified: Vec<(DeclId, Substitution)> = Vec::new();
            let mut failures: Vec<(DeclId, UnifyError)> = Vec::new();
            for &id in &candidates.templates {
                match unify(self.index.get(id).produced_type(), &demand.ty) {
                    Ok(map) => unified.push((id, map)),
                    Err(err) => failures.push((id, err)),
                }
            }
            match unified.as_slice() {
                [] => {}
                [(id, map)] => {
                    let specialized = self.index.get(*id).specialize(map);
                    return Ok(Some((*id, specialized)));
                }
                many => {
                    let ids: Vec<DeclId> = many.iter().map(|(id, _)| *id).collect();
                    return Err(self.ambiguous(demand, &ids, false));
                }
            }

            // A sole template candidate that fails to unify is a dedicated
            // error rather than a bare miss.
            if candidates.defaults.is_empty()
                && candidates.templates.len() == 1
                && failures.len() == 1
            {
                let (id, reason) = &failures[0];
                let decl = self.index.get(*id);
                let element = decl
                    .source()
                    .cloned()
                    .unwrap_or_else(SourceElement::synthetic);
                let err = Error::TemplateUnificationFailed {
                    demand: demand.to_string(),
                    template: decl.declaration_string(),
                    reason: reason.to_string(),
                };
                return Err(self.fail(element, Vec::new(), err));
            }

            match candidates.defaults.as_slice() {
                [] => {}
                [single] => {
                    let declaration = self.index.get(*single).clone();
                    return Ok(Some((*single, declaration)));
                }
                many => return Err(self.ambiguous(demand, many, true)),
            }

            // Nothing declared: extensions, then discovery.
            rounds += 1;
            if rounds > self.opts.extension_round_limit {
                let err = Error::ExtensionRoundLimit {
                    demand: demand.to_string(),
                    limit: self.opts.extension_round_limit,
                };
                return Err(self.fail(SourceElement::synthetic(), Vec::new(), err));
            }
            if self.run_extension_round(demand)? {
                continue;
            }
            if self.try_discover(demand)? {
                continue;
            }

            if !required {
                return Ok(None);
            }
            let element = self.requested_by_element();
            let err = Error::UnresolvedDependency {
                demand: demand.to_string(),
                requested_by: self.requested_by(),
            };
            return Err(self.fail(element, Vec::new(), err));
        }
    }

    /// One extension round: consult every handling extension in registry
    /// order, ingest whatever they generate. Returns whether any declaration
    /// was produced; a round with only deferrals makes no progress and the
    /// caller turns the open demand into `UnresolvedDependency`.
    fn run_extension_round(&mut self, demand: &Demand) -> Result<bool, Error> {
        let mut generated = false;
        let mut deferred = 0usize;
        for ext in self.extensions {
            if !ext.can_handle(&demand.ty, &demand.tags) {
                continue;
            }
            match ext.generate(&demand.ty, &demand.tags) {
                ExtensionResult::Deferred => deferred += 1,
                ExtensionResult::Generated(result) => {
                    let element = result.element().clone();
                    let declaration = result.into_declaration().map_err(|e| {
                        let err = Error::from(e);
                        self.fail(element.clone(), Vec::new(), err)
                    })?;
                    // The index selects by exact produced type, so an
                    // assignable-but-unequal result could never be chosen.
                    let produced = declaration.produced_type();
                    let matches =
                        produced == &demand.ty || unify(produced, &demand.ty).is_ok();
                    if !matches {
                        let err = Error::ExtensionMismatch {
                            demand: demand.to_string(),
                            generated: produced.to_string(),
                            element: element.to_string(),
                        };
                        return Err(self.fail(element, Vec::new(), err));
                    }
                    tracing::debug!(demand = %demand, element = %element, "extension generated a declaration");
                    self.index.insert(declaration);
                    generated = true;
                }
            }
        }
        if !generated && deferred > 0 {
            tracing::debug!(demand = %demand, deferred, "extension round deferred without progress");
        }
        Ok(generated)
    }

    /// Last-resort intake: a host-supplied discoverable class whose type
    /// matches the demand is ingested as a discovered-as-dependency
    /// component.
    fn try_discover(&mut self, demand: &Demand) -> Result<bool, Error> {
        let Some(head) = demand.ty.head_name() else {
            return Ok(false);
        };
        if self.discovered.contains(head) {
            return Ok(false);
        }
        let Some(elem) = self.discoverable.get(head).cloned() else {
            return Ok(false);
        };
        if elem.ty != demand.ty {
            return Ok(false);
        }
        let element = elem.element();
        let declaration = ComponentDeclaration::from_dependency(&elem).map_err(|e| {
            let err = Error::from(e);
            self.fail(element, Vec::new(), err)
        })?;
        if !demand.tags.matches_provider(declaration.tags()) {
            return Ok(false);
        }
        self.discovered.insert(head.clone());
        tracing::debug!(demand = %demand, class = %elem.name, "discovered class as dependency");
        self.index.insert(declaration);
        Ok(true)
    }

    /// Steps 5–6: push a frame, resolve every parameter site in declaration
    /// order, then fix the node's dependency list.
    pub(crate) fn instantiate(
        &mut self,
        decl_id: DeclId,
        declaration: ComponentDeclaration,
        demand: &Demand,
    ) -> Result<Resolution, Error> {
        let frame_index = self.stack.len();
        self.stack.push(Frame {
            demand: demand.clone(),
            decl: decl_id,
            declaration_string: declaration.declaration_string(),
            site: None,
        });

        let params = declaration.parameters().to_vec();
        let mut deps = Vec::with_capacity(params.len());
        let mut i = 0;
        while i < params.len() {
            let site = Demand::new(params[i].ty.clone(), params[i].tags.clone());
            self.stack[frame_index].site = Some(site.clone());
            match self.resolve(&site, true)? {
                Resolution::Node(id) => {
                    let kind = if matches!(
                        self.nodes[id.0].declaration,
                        ComponentDeclaration::PromisedProxy(_)
                    ) {
                        DependencyKind::Promised
                    } else {
                        DependencyKind::Direct
                    };
                    deps.push(Dependency { node: id, kind });
                    i += 1;
                }
                Resolution::Break { frame } if frame == frame_index => {
                    let proxy = self.proxy_node(&site)?;
                    deps.push(Dependency {
                        node: proxy,
                        kind: DependencyKind::Promised,
                    });
                    i += 1;
                }
                Resolution::Break { frame } => {
                    self.stack.pop();
                    return Ok(Resolution::Break { frame });
                }
                Resolution::Missing => {
                    self.stack.pop();
                    let element = declaration
                        .source()
                        .cloned()
                        .unwrap_or_else(SourceElement::synthetic);
                    let err = Error::Internal {
                        element: element.to_string(),
                        message: "required dependency reported as missing".to_string(),
                    };
                    return Err(self.fail(element, Vec::new(), err));
                }
            }
        }

        self.stack.pop();
        Ok(Resolution::Node(self.build_node(demand, declaration, deps)))
    }

    fn build_node(
        &mut self,
        demand: &Demand,
        declaration: ComponentDeclaration,
        deps: Vec<Dependency>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ResolvedNode {
            id,
            ty: demand.ty.clone(),
            tags: demand.tags.clone(),
            declaration,
            deps,
            interceptors: Vec::new(),
            is_root: false,
        });
        self.memo.insert(demand.clone(), id);
        id
    }

    /// Resolve the concrete target of every promised proxy. Targets may have
    /// been abandoned during cycle unwinding, so this re-enters resolution
    /// rather than expecting a memo hit.
    pub(crate) fn link_proxies(&mut self) -> Result<Vec<ProxyLink>, Error> {
        let mut links = Vec::new();
        while !self.pending_proxies.is_empty() {
            let pending = std::mem::take(&mut self.pending_proxies);
            for (proxy, demand) in pending {
                match self.resolve(&demand, true)? {
                    Resolution::Node(target) => links.push(ProxyLink { proxy, target }),
                    _ => {
                        let err = Error::Internal {
                            element: SourceElement::synthetic().to_string(),
                            message: format!("proxy target {demand} did not resolve to a node"),
                        };
                        return Err(self.fail(SourceElement::synthetic(), Vec::new(), err));
                    }
                }
            }
        }
        Ok(links)
    }

    /// Attach interceptors as ordered decorators after the main graph is
    /// resolved. Declaration order (already stabilized at intake) defines
    /// application order.
    pub(crate) fn attach_interceptors(&mut self) -> Result<(), Error> {
        let interceptor_ids = self.index.interceptors().to_vec();
        if interceptor_ids.is_empty() {
            return Ok(());
        }

        let main_count = self.nodes.len();
        let mut resolved: BTreeMap<DeclId, NodeId> = BTreeMap::new();

        for node_idx in 0..main_count {
            let (node_ty, node_tags, eligible) = {
                let n = &self.nodes[node_idx];
                let eligible = matches!(
                    n.declaration,
                    ComponentDeclaration::FromModule(_)
                        | ComponentDeclaration::Annotated(_)
                        | ComponentDeclaration::DiscoveredAsDependency(_)
                        | ComponentDeclaration::FromExtension(_)
                );
                (n.ty.clone(), n.tags.clone(), eligible)
            };
            if !eligible {
                continue;
            }

            let mut chain = Vec::new();
            for &iid in &interceptor_ids {
                let idecl = self.index.get(iid);
                let Some(target) = idecl.produced_type().interceptor_target().cloned() else {
                    let element = idecl
                        .source()
                        .cloned()
                        .unwrap_or_else(SourceElement::synthetic);
                    let err = Error::Internal {
                        element: element.to_string(),
                        message: "interceptor declaration without a target type".to_string(),
                    };
                    return Err(self.fail(element, Vec::new(), err));
                };
                if !self.oracle.is_assignable(&node_ty, &target) {
                    continue;
                }
                if !node_tags.matches_provider(idecl.tags()) {
                    continue;
                }

                let node_id = match resolved.get(&iid) {
                    Some(&node_id) => node_id,
                    None => {
                        let declaration = idecl.clone();
                        let demand = Demand::new(
                            declaration.produced_type().clone(),
                            declaration.tags().clone(),
                        );
                        let node_id = match self.instantiate(iid, declaration, &demand)? {
                            Resolution::Node(node_id) => node_id,
                            _ => {
                                let err = Error::Internal {
                                    element: SourceElement::synthetic().to_string(),
                                    message: format!(
                                        "interceptor {demand} did not resolve to a node"
                                    ),
                                };
                                return Err(self.fail(
                                    SourceElement::synthetic(),
                                    Vec::new(),
                                    err,
                                ));
                            }
                        };
                        resolved.insert(iid, node_id);
                        node_id
                    }
                };
                chain.push(node_id);
            }
            self.nodes[node_idx].interceptors = chain;
        }
        Ok(())
    }

    fn ambiguous(&mut self, demand: &Demand, ids: &[DeclId], default: bool) -> Error {
        let candidates = ids
            .iter()
            .map(|&id| self.index.get(id).declaration_string())
            .collect::<Vec<_>>()
            .join(", ");
        let element = ids
            .first()
            .and_then(|&id| self.index.get(id).source().cloned())
            .unwrap_or_else(SourceElement::synthetic);
        let err = if default {
            Error::AmbiguousDefault {
                demand: demand.to_string(),
                candidates,
            }
        } else {
            Error::AmbiguousBinding {
                demand: demand.to_string(),
                candidates,
            }
        };
        self.fail(element, Vec::new(), err)
    }

    fn requested_by(&self) -> String {
        self.stack
            .last()
            .map(|f| f.declaration_string.clone())
            .unwrap_or_else(|| "<root>".to_string())
    }

    fn requested_by_element(&self) -> SourceElement {
        self.stack
            .last()
            .and_then(|f| self.index.get(f.decl).source().cloned())
            .unwrap_or_else(SourceElement::synthetic)
    }
}
