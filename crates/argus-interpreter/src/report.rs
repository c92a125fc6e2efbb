use std::fmt;

use argus_ir::{Block, Exp, Inst, Term};

use crate::domain::Domain;

/// Sink for analyzer findings. Reporting is fire-and-forget: the engine
/// never looks at what was reported, it only moves on to other paths.
pub trait Reporter<D: Domain> {
    /// An instruction the domain rejected as an invalid access.
    fn invalid_access_inst(&mut self, state: &D::State, inst: &Inst, block: Block);

    /// A terminator (an intrinsic call) the domain rejected.
    fn invalid_access_term(&mut self, state: &D::State, term: &Term, block: Block);

    /// A call to a callee with no known body; the engine havocs the return
    /// register and continues at the return site.
    fn unknown_call(&mut self, callee: &Exp, term: &Term, block: Block);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    InvalidAccessInst,
    InvalidAccessTerm,
    UnknownCall,
}

/// One recorded finding.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub block: Block,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::InvalidAccessInst => "invalid access",
            DiagnosticKind::InvalidAccessTerm => "invalid access",
            DiagnosticKind::UnknownCall => "unknown call",
        };
        write!(f, "{kind} in b{}: {}", self.block.id(), self.detail)
    }
}

/// A [`Reporter`] that collects findings for later inspection.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl<D: Domain> Reporter<D> for Diagnostics {
    fn invalid_access_inst(&mut self, state: &D::State, inst: &Inst, block: Block) {
        self.reports.push(Diagnostic {
            kind: DiagnosticKind::InvalidAccessInst,
            block,
            detail: format!("{inst} in {state}"),
        });
    }

    fn invalid_access_term(&mut self, state: &D::State, term: &Term, block: Block) {
        self.reports.push(Diagnostic {
            kind: DiagnosticKind::InvalidAccessTerm,
            block,
            detail: format!("{term} in {state}"),
        });
    }

    fn unknown_call(&mut self, callee: &Exp, term: &Term, block: Block) {
        self.reports.push(Diagnostic {
            kind: DiagnosticKind::UnknownCall,
            block,
            detail: format!("{callee} in {term}"),
        });
    }
}
