use armature_model::SourceElement;

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One structured diagnostic: kind, primary source element, rendered message
/// and, for cycles, the ordered frame list.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: &'static str,
    pub element: SourceElement,
    pub message: String,
    pub frames: Vec<String>,
}

/// Collects diagnostics during one resolution pass. Warnings accumulate and
/// never halt resolution; fatal errors are recorded here and also propagated
/// as `Err` by the resolver.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
}

pub(crate) const RAW_TYPE_ON_ANNOTATED_MEMBERS: &str = "RawTypeOnAnnotatedMembers";

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: &'static str, element: SourceElement, message: String) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            element,
            message,
            frames: Vec::new(),
        });
    }

    pub(crate) fn fatal(
        &mut self,
        element: SourceElement,
        frames: Vec<String>,
        err: &Error,
    ) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            kind: err.kind(),
            element,
            message: err.to_string(),
            frames,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }
}
