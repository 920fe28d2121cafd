use armature_graph::{NodeId, ResolvedNode};
use armature_model::{ComponentDeclaration, SourceElement, TypeOracle};

use crate::{
    error::Error,
    resolve::{Demand, Resolution, ResolutionCtx},
};

impl ResolutionCtx<'_> {
    /// A demand already on the stack has been revisited. Walk the cycle's
    /// frames from the top down for a parameter site that can legally be
    /// served by a promised proxy; if the top frame's own site qualifies the
    /// proxy is inserted right here, otherwise resolution unwinds to the
    /// chosen frame.
    pub(crate) fn break_cycle(
        &mut self,
        demand: &Demand,
        pos: usize,
    ) -> Result<Resolution, Error> {
        let top = self.stack.len() - 1;
        for i in (pos..=top).rev() {
            let Some(site) = self.stack[i].site.clone() else {
                continue;
            };
            // The proxy stands in for whatever declaration serves this site:
            // for the top frame that is the in-progress declaration of the
            // revisited demand, otherwise the declaration one frame up.
            let target_id = if i == top {
                self.stack[pos].decl
            } else {
                self.stack[i + 1].decl
            };
            let ok = proxyable(self.oracle, &site, self.index.get(target_id));
            if !ok {
                continue;
            }
            if i == top {
                let proxy = self.proxy_node(&site)?;
                return Ok(Resolution::Node(proxy));
            }
            tracing::debug!(frame = i, site = %site, "breaking cycle below the revisiting frame");
            return Ok(Resolution::Break { frame: i });
        }

        let frames: Vec<String> = self.stack[pos..]
            .iter()
            .map(|f| f.declaration_string.clone())
            .collect();
        let mut path = frames.clone();
        path.push(demand.ty.to_string());
        let element = self
            .index
            .get(self.stack[pos].decl)
            .source()
            .cloned()
            .unwrap_or_else(SourceElement::synthetic);
        let err = Error::UnbreakableCycle {
            path: path.join(" -> "),
        };
        Err(self.fail(element, frames, err))
    }

    /// Synthesize (or reuse) the promised-proxy node for a parameter site.
    /// Memoized per (type, tags): the same cycle never generates two proxies
    /// for one site, and insertion is idempotent if resolution restarts.
    pub(crate) fn proxy_node(&mut self, site: &Demand) -> Result<NodeId, Error> {
        if let Some(&id) = self.proxy_memo.get(site) {
            return Ok(id);
        }
        let class_name = proxy_class_name(&self.opts.proxy_naming_prefix, site);
        let declaration = ComponentDeclaration::promised_proxy(
            SourceElement::synthetic(),
            site.ty.clone(),
            class_name,
        );
        self.index.insert_unindexed(declaration.clone());
        let id = NodeId(self.nodes.len());
        self.nodes.push(ResolvedNode {
            id,
            ty: site.ty.clone(),
            tags: site.tags.clone(),
            declaration,
            deps: Vec::new(),
            interceptors: Vec::new(),
            is_root: false,
        });
        self.proxy_memo.insert(site.clone(), id);
        self.pending_proxies.push((id, site.clone()));
        tracing::debug!(site = %site, "inserted promised proxy");
        Ok(id)
    }
}

/// A site admits a proxy when its static type is a plain reference type and
/// the declaration it defers to is not one of the forbidden kinds:
/// interceptors, extension-synthesized components, optional wrappers.
fn proxyable(oracle: &dyn TypeOracle, site: &Demand, target: &ComponentDeclaration) -> bool {
    site.ty.optional_inner().is_none()
        && oracle.is_reference(&site.ty)
        && !target.is_interceptor()
        && !matches!(
            target,
            ComponentDeclaration::FromExtension(_) | ComponentDeclaration::Optional(_)
        )
}

/// Generated proxy class name, unique per target (type, tags).
fn proxy_class_name(prefix: &str, site: &Demand) -> String {
    let mut name = String::from(prefix);
    push_mangled(&mut name, &site.ty.to_string());
    if !site.tags.is_empty() {
        name.push('_');
        push_mangled(&mut name, &site.tags.to_string());
    }
    name
}

fn push_mangled(out: &mut String, text: &str) {
    for ch in text.chars() {
        out.push(if ch.is_alphanumeric() { ch } else { '_' });
    }
}
