//! argus: a static analyzer for a low-level, function-structured IR.
//!
//! This umbrella crate re-exports the workspace members:
//!
//! - [`ir`]: the IR (programs, functions, blocks, expressions) and its
//!   builder.
//! - [`interp`]: the bounded breadth-first interprocedural exploration
//!   engine, generic over an abstract domain.
//! - [`domain`]: domain implementations (unit, intervals, used-globals).

pub use argus_domain as domain;
pub use argus_interpreter as interp;
pub use argus_ir as ir;

/// The names most programs need.
pub mod prelude {
    pub use argus_domain::{compute_used_globals, IntvDomain, UnitDomain, UsedGlobalsDomain};
    pub use argus_interpreter::{
        Analyzer, BoundPolicy, Config, DiagnosticKind, Diagnostics, Domain, ExecError, ExecOpts,
        Reporter, UsedGlobals,
    };
    pub use argus_ir::{
        Block, Exp, Func, Global, Inst, Jump, Program, ProgramBuilder, Term, Var,
    };
}
