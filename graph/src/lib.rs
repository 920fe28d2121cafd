//! Output model of the armature resolver: the fully wired application graph
//! handed to the code emitter, plus the graph operations the emitter needs
//! (proxy-aware topological order, cycle reporting, serializable IR).

use armature_model::{ComponentDeclaration, TagSet, TypeRef};
use serde::{Deserialize, Serialize};

pub mod graph;
pub mod ir;

pub use ir::{GRAPH_IR_SCHEMA, GRAPH_IR_VERSION, GraphIr, GraphIrError};

/// Stable identity of a resolved node; the emitter derives topological names
/// from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// How a dependency edge constrains instantiation order. Promised edges are
/// produced by the cycle breaker and carry no topological constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyKind {
    Direct,
    Promised,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub node: NodeId,
    pub kind: DependencyKind,
}

/// Links a promised-proxy node to the concrete node it defers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyLink {
    pub proxy: NodeId,
    pub target: NodeId,
}

/// One resolved (type, tags) pair: the chosen declaration and its resolved
/// dependencies, one per parameter, in declaration order. Never mutated after
/// the dependency list is fixed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNode {
    pub id: NodeId,
    pub ty: TypeRef,
    pub tags: TagSet,
    pub declaration: ComponentDeclaration,
    pub deps: Vec<Dependency>,
    /// Decorators applied to this node's product, in application order.
    pub interceptors: Vec<NodeId>,
    pub is_root: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedGraph {
    pub nodes: Vec<ResolvedNode>,
    pub roots: Vec<NodeId>,
    pub proxies: Vec<ProxyLink>,
}

impl ResolvedGraph {
    pub fn node(&self, id: NodeId) -> &ResolvedNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = (NodeId, &ResolvedNode)> {
        self.nodes.iter().map(|n| (n.id, n))
    }
}
