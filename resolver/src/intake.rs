use armature_model::{ComponentDeclaration, SourceElement, TypeOracle};

use crate::{
    Options, ProcessingInput,
    diagnostics::{DiagnosticSink, RAW_TYPE_ON_ANNOTATED_MEMBERS},
    error::Error,
};

/// Ingest host metadata into component declarations, applying the
/// per-variant preconditions. The result is sorted by lexicographic
/// source-element identity so resolution is deterministic regardless of the
/// host's enumeration order.
pub(crate) fn ingest(
    input: &ProcessingInput,
    oracle: &dyn TypeOracle,
    opts: &Options,
    sink: &mut DiagnosticSink,
) -> Result<Vec<ComponentDeclaration>, Error> {
    let mut decls = Vec::new();

    for module in &input.modules {
        for method in &module.methods {
            let decl = ComponentDeclaration::from_module(oracle, module, method)
                .map_err(|e| fatal(sink, e))?;
            decls.push(decl);
        }
    }

    for elem in &input.annotated {
        let decl =
            ComponentDeclaration::from_annotated(oracle, elem).map_err(|e| fatal(sink, e))?;
        if elem.has_raw_members && opts.allow_raw_type_warning {
            sink.warn(
                RAW_TYPE_ON_ANNOTATED_MEMBERS,
                elem.element(),
                format!(
                    "members of `{}` use raw types, which can break dependency resolution in \
                     unpredictable ways",
                    elem.name
                ),
            );
        }
        decls.push(decl);
    }

    decls.sort_by(|a, b| {
        let ka = a.source().map(SourceElement::as_str).unwrap_or_default();
        let kb = b.source().map(SourceElement::as_str).unwrap_or_default();
        ka.cmp(kb)
    });

    tracing::debug!(declarations = decls.len(), "declaration intake complete");
    Ok(decls)
}

fn fatal(sink: &mut DiagnosticSink, e: armature_model::Error) -> Error {
    let element = e
        .element()
        .map(SourceElement::new)
        .unwrap_or_else(SourceElement::synthetic);
    let err = Error::from(e);
    sink.fatal(element, Vec::new(), &err);
    err
}
