//! Compile-time dependency-injection graph resolver: turns declared
//! components (module factory methods, annotated classes, extension-generated
//! factories) into a fully wired application graph, with template
//! specialization, promised-proxy cycle breaking, extension dispatch and
//! structured diagnostics. The annotation-processor host feeds metadata in
//! and hands the resolved graph to its code emitter; the resolver itself is a
//! pure in-process transformation.

use armature_graph::ResolvedGraph;
use armature_model::{ModuleDeclaration, SourceElement, TypeElement, TypeOracle};

mod cycles;
mod diagnostics;
mod error;
mod extension;
mod index;
mod intake;
mod resolve;

pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::Error;
pub use extension::{Extension, ExtensionResult, GeneratedResult};
pub use index::{Candidates, DeclId, ProviderIndex};
pub use resolve::Demand;

/// Options affecting resolution.
#[derive(Clone, Debug)]
pub struct Options {
    /// Emit (rather than suppress) the non-fatal warning for annotated
    /// classes whose members use raw generics.
    pub allow_raw_type_warning: bool,
    /// Prefix of generated promised-proxy class names.
    pub proxy_naming_prefix: String,
    /// Upper bound on extension dispatch rounds per demand.
    pub extension_round_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_raw_type_warning: true,
            proxy_naming_prefix: "$Proxy_".to_string(),
            extension_round_limit: 16,
        }
    }
}

/// Everything the host supplies for one application graph.
#[derive(Debug, Default)]
pub struct ProcessingInput {
    pub modules: Vec<ModuleDeclaration>,
    pub annotated: Vec<TypeElement>,
    /// Classes eligible for discovery as dependencies when a demand has no
    /// declared provider and no extension produces one.
    pub discoverable: Vec<TypeElement>,
    /// Host-marked roots; every root appears in the resolved graph.
    pub roots: Vec<Demand>,
}

/// Resolve one application graph. Warnings accumulate in the sink; a fatal
/// error aborts emission for this application only and is recorded in the
/// sink as well.
pub fn process(
    input: &ProcessingInput,
    oracle: &dyn TypeOracle,
    extensions: &[Box<dyn Extension>],
    opts: Options,
    sink: &mut DiagnosticSink,
) -> Result<ResolvedGraph, Error> {
    let decls = intake::ingest(input, oracle, &opts, sink)?;
    let index = ProviderIndex::build(decls);
    let discoverable = input
        .discoverable
        .iter()
        .map(|e| (e.name.clone(), e.clone()))
        .collect();

    let mut ctx = resolve::ResolutionCtx::new(index, oracle, extensions, discoverable, &opts, sink);

    let mut roots = Vec::new();
    for demand in &input.roots {
        match ctx.resolve(demand, true)? {
            resolve::Resolution::Node(id) => roots.push(id),
            _ => {
                let err = Error::Internal {
                    element: SourceElement::synthetic().to_string(),
                    message: format!("root {demand} did not resolve to a node"),
                };
                return Err(ctx.fail(SourceElement::synthetic(), Vec::new(), err));
            }
        }
    }

    let proxies = ctx.link_proxies()?;
    ctx.attach_interceptors()?;

    let mut nodes = ctx.into_nodes();
    for &root in &roots {
        nodes[root.0].is_root = true;
    }

    tracing::debug!(
        nodes = nodes.len(),
        roots = roots.len(),
        proxies = proxies.len(),
        "graph resolution complete"
    );

    Ok(ResolvedGraph {
        nodes,
        roots,
        proxies,
    })
}
