/// Fatal structural failures.
///
/// These indicate malformed input (IR invariant violations, bad
/// configuration), not analyzer findings; path-local findings go through
/// [`crate::Reporter`] instead and never abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// No configured entry point names a defined, parameterless function.
    #[error("no applicable harness among entry points {0:?}")]
    NoHarness(Vec<String>),
    /// Per-function globals mode is missing an entry for a reachable
    /// function, which the globals pre-analysis is supposed to rule out.
    #[error("no used-globals entry for function {func}")]
    UnknownGlobals { func: String },
    /// A `Return` terminator whose operand disagrees with the function's
    /// formal return register.
    #[error("return/freturn mismatch in {func}: freturn {has_freturn}, operand {has_exp}")]
    MalformedReturn {
        func: String,
        has_freturn: bool,
        has_exp: bool,
    },
    /// A throw frame without an enclosing call frame.
    #[error("malformed stack: throw frame without enclosing call frame")]
    MalformedStack,
    /// `compute_summaries` requires `function_summaries` mode.
    #[error("function summaries are disabled")]
    SummariesDisabled,
}
