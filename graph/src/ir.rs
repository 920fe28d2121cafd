use armature_model::{ComponentDeclaration, TagSet, TypeRef};
use serde::{Deserialize, Serialize};

use crate::{Dependency, DependencyKind, NodeId, ProxyLink, ResolvedGraph, ResolvedNode};

pub const GRAPH_IR_SCHEMA: &str = "armature.graph.ir";
pub const GRAPH_IR_VERSION: u32 = 1;

/// Serializable form of a resolved graph, consumed by the external code
/// emitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphIr {
    pub schema: String,
    pub version: u32,
    pub nodes: Vec<NodeIr>,
    pub roots: Vec<usize>,
    pub proxies: Vec<ProxyIr>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeIr {
    pub id: usize,
    pub ty: TypeRef,
    pub tags: TagSet,
    pub declaration: ComponentDeclaration,
    pub deps: Vec<DepIr>,
    pub interceptors: Vec<usize>,
    pub is_root: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DepIr {
    pub node: usize,
    pub kind: DependencyKind,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProxyIr {
    pub proxy: usize,
    pub target: usize,
}

#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GraphIrError {
    #[error("unexpected graph IR schema `{actual}` (expected `{expected}`)")]
    SchemaMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("unsupported graph IR version {actual} (expected {expected})")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("node at index {index} carries id {id}; ids must be dense and in order")]
    NodeIdMismatch { index: usize, id: usize },

    #[error("{context} references missing node {id}")]
    DanglingNode { context: String, id: usize },
}

impl From<&ResolvedGraph> for GraphIr {
    fn from(g: &ResolvedGraph) -> Self {
        Self {
            schema: GRAPH_IR_SCHEMA.to_string(),
            version: GRAPH_IR_VERSION,
            nodes: g.nodes.iter().map(NodeIr::from).collect(),
            roots: g.roots.iter().map(|r| r.0).collect(),
            proxies: g
                .proxies
                .iter()
                .map(|p| ProxyIr {
                    proxy: p.proxy.0,
                    target: p.target.0,
                })
                .collect(),
        }
    }
}

impl From<&ResolvedNode> for NodeIr {
    fn from(n: &ResolvedNode) -> Self {
        Self {
            id: n.id.0,
            ty: n.ty.clone(),
            tags: n.tags.clone(),
            declaration: n.declaration.clone(),
            deps: n
                .deps
                .iter()
                .map(|d| DepIr {
                    node: d.node.0,
                    kind: d.kind,
                })
                .collect(),
            interceptors: n.interceptors.iter().map(|i| i.0).collect(),
            is_root: n.is_root,
        }
    }
}

impl TryFrom<GraphIr> for ResolvedGraph {
    type Error = GraphIrError;

    fn try_from(ir: GraphIr) -> Result<Self, Self::Error> {
        if ir.schema != GRAPH_IR_SCHEMA {
            return Err(GraphIrError::SchemaMismatch {
                expected: GRAPH_IR_SCHEMA,
                actual: ir.schema,
            });
        }
        if ir.version != GRAPH_IR_VERSION {
            return Err(GraphIrError::VersionMismatch {
                expected: GRAPH_IR_VERSION,
                actual: ir.version,
            });
        }

        let count = ir.nodes.len();
        let ensure = |context: &str, id: usize| -> Result<NodeId, GraphIrError> {
            if id >= count {
                return Err(GraphIrError::DanglingNode {
                    context: context.to_string(),
                    id,
                });
            }
            Ok(NodeId(id))
        };

        let mut nodes = Vec::with_capacity(count);
        for (index, node) in ir.nodes.into_iter().enumerate() {
            if node.id != index {
                return Err(GraphIrError::NodeIdMismatch { index, id: node.id });
            }
            let deps = node
                .deps
                .into_iter()
                .map(|d| {
                    Ok(Dependency {
                        node: ensure(&format!("dependency of node {index}"), d.node)?,
                        kind: d.kind,
                    })
                })
                .collect::<Result<Vec<_>, GraphIrError>>()?;
            let interceptors = node
                .interceptors
                .into_iter()
                .map(|i| ensure(&format!("interceptor of node {index}"), i))
                .collect::<Result<Vec<_>, GraphIrError>>()?;
            nodes.push(ResolvedNode {
                id: NodeId(index),
                ty: node.ty,
                tags: node.tags,
                declaration: node.declaration,
                deps,
                interceptors,
                is_root: node.is_root,
            });
        }

        let roots = ir
            .roots
            .into_iter()
            .map(|r| ensure("root", r))
            .collect::<Result<Vec<_>, GraphIrError>>()?;
        let proxies = ir
            .proxies
            .into_iter()
            .map(|p| {
                Ok(ProxyLink {
                    proxy: ensure("proxy link", p.proxy)?,
                    target: ensure("proxy link", p.target)?,
                })
            })
            .collect::<Result<Vec<_>, GraphIrError>>()?;

        Ok(ResolvedGraph {
            nodes,
            roots,
            proxies,
        })
    }
}

#[cfg(test)]
mod tests {
    use armature_model::{TypeName, TypeRef};

    use super::*;

    fn sample_graph() -> ResolvedGraph {
        let a = TypeRef::named(TypeName::try_from("A").unwrap());
        let b = TypeRef::named(TypeName::try_from("B").unwrap());
        ResolvedGraph {
            nodes: vec![
                ResolvedNode {
                    id: NodeId(0),
                    ty: a.clone(),
                    tags: TagSet::empty(),
                    declaration: ComponentDeclaration::optional(a, TagSet::empty()),
                    deps: Vec::new(),
                    interceptors: Vec::new(),
                    is_root: false,
                },
                ResolvedNode {
                    id: NodeId(1),
                    ty: b.clone(),
                    tags: TagSet::empty(),
                    declaration: ComponentDeclaration::optional(b, TagSet::empty()),
                    deps: vec![Dependency {
                        node: NodeId(0),
                        kind: DependencyKind::Direct,
                    }],
                    interceptors: Vec::new(),
                    is_root: true,
                },
            ],
            roots: vec![NodeId(1)],
            proxies: Vec::new(),
        }
    }

    #[test]
    fn graph_survives_an_ir_round_trip() {
        let graph = sample_graph();
        let json = serde_json::to_string(&GraphIr::from(&graph)).unwrap();
        let parsed: GraphIr = serde_json::from_str(&json).unwrap();
        let restored = ResolvedGraph::try_from(parsed).unwrap();
        assert_eq!(restored, graph);
    }

    #[test]
    fn schema_and_version_are_checked_on_load() {
        let mut ir = GraphIr::from(&sample_graph());
        ir.schema = "other".to_string();
        assert!(matches!(
            ResolvedGraph::try_from(ir),
            Err(GraphIrError::SchemaMismatch { .. })
        ));

        let mut ir = GraphIr::from(&sample_graph());
        ir.version = 99;
        assert!(matches!(
            ResolvedGraph::try_from(ir),
            Err(GraphIrError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut ir = GraphIr::from(&sample_graph());
        ir.roots = vec![7];
        assert!(matches!(
            ResolvedGraph::try_from(ir),
            Err(GraphIrError::DanglingNode { .. })
        ));
    }
}
