use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use argus_interpreter::{
    Analyzer, Config, Diagnostics, Domain, ExecError, ExecOpts, UsedGlobals,
};
use argus_ir::{Exp, Func, Global, Inst, Program, Var};

/// Accumulated set of globals referenced so far along the path.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct UsedGlobalsState(pub BTreeSet<Var>);

impl fmt::Display for UsedGlobalsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "used{:?}", self.0)
    }
}

/// Domain collecting, per function, the globals its body can touch.
///
/// States only ever grow, so the analysis is a plain reachability walk;
/// its summaries are the per-function used sets that
/// [`compute_used_globals`] assembles into the driver's
/// [`UsedGlobals::PerFunction`] map.
#[derive(Clone, Debug)]
pub struct UsedGlobalsDomain {
    globals: BTreeSet<Var>,
}

impl UsedGlobalsDomain {
    pub fn for_program(pgm: &Program) -> Self {
        Self {
            globals: pgm.global_vars().clone(),
        }
    }

    fn collect(&self, state: &UsedGlobalsState, exp: &Exp) -> UsedGlobalsState {
        let mut next = state.clone();
        for var in exp.vars() {
            if self.globals.contains(&var) {
                next.0.insert(var);
            }
        }
        next
    }
}

impl Domain for UsedGlobalsDomain {
    type State = UsedGlobalsState;
    type Summary = BTreeSet<Var>;
    type FromCall = ();

    fn init(&self, _globals: &[Global]) -> UsedGlobalsState {
        UsedGlobalsState::default()
    }

    fn join(&self, lhs: &UsedGlobalsState, rhs: &UsedGlobalsState) -> UsedGlobalsState {
        UsedGlobalsState(lhs.0.union(&rhs.0).copied().collect())
    }

    fn is_false(&self, _state: &UsedGlobalsState) -> bool {
        false
    }

    fn exec_inst(&self, state: &UsedGlobalsState, inst: &Inst) -> Result<UsedGlobalsState, ()> {
        let mut next = state.clone();
        for exp in inst.exps() {
            next = self.collect(&next, exp);
        }
        if let Some(reg) = inst.defines() {
            if self.globals.contains(&reg) {
                next.0.insert(reg);
            }
        }
        Ok(next)
    }

    fn exec_move(&self, state: &UsedGlobalsState, var: Var, exp: &Exp) -> UsedGlobalsState {
        let mut next = self.collect(state, exp);
        if self.globals.contains(&var) {
            next.0.insert(var);
        }
        next
    }

    fn exec_kill(&self, state: &UsedGlobalsState, _var: Var) -> UsedGlobalsState {
        state.clone()
    }

    fn exec_assume(&self, state: &UsedGlobalsState, cond: &Exp) -> Option<UsedGlobalsState> {
        Some(self.collect(state, cond))
    }

    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        state: &UsedGlobalsState,
    ) -> (Vec<&'p Func>, UsedGlobalsState) {
        let funcs = match callee {
            Exp::Func(name) | Exp::Var(name) => pgm.function(*name).into_iter().collect(),
            _ => Vec::new(),
        };
        (funcs, self.collect(state, callee))
    }

    fn call(
        &self,
        args: &[Exp],
        _areturn: Option<Var>,
        _params: &[Var],
        _locals: &BTreeSet<Var>,
        _globals: &BTreeSet<Var>,
        _summaries: bool,
        state: &UsedGlobalsState,
    ) -> (UsedGlobalsState, ()) {
        let mut entry = state.clone();
        for arg in args {
            entry = self.collect(&entry, arg);
        }
        (entry, ())
    }

    fn post(
        &self,
        _locals: &BTreeSet<Var>,
        _from_call: &(),
        state: &UsedGlobalsState,
    ) -> UsedGlobalsState {
        state.clone()
    }

    fn retn(
        &self,
        _params: &[Var],
        _freturn: Option<Var>,
        _from_call: &(),
        state: &UsedGlobalsState,
    ) -> UsedGlobalsState {
        state.clone()
    }

    fn apply_summary(
        &self,
        state: &UsedGlobalsState,
        summary: &BTreeSet<Var>,
    ) -> Option<UsedGlobalsState> {
        Some(UsedGlobalsState(
            state.0.union(summary).copied().collect(),
        ))
    }

    fn create_summary(
        &self,
        _locals: &BTreeSet<Var>,
        _formals: &BTreeSet<Var>,
        state: &UsedGlobalsState,
    ) -> (BTreeSet<Var>, UsedGlobalsState) {
        (state.0.clone(), state.clone())
    }
}

/// The used-globals pre-analysis: run the engine in summaries mode with
/// [`UsedGlobalsDomain`] and assemble the per-function map the driver's
/// `PerFunction` globals mode consumes.
///
/// A function appears in the map once some exploration of it returned;
/// anything absent was not seen to complete within `bound`, which also
/// means the main analysis cannot reach a return of it within the same
/// bound.
pub fn compute_used_globals(
    pgm: &Program,
    config: &Config,
    bound: u32,
) -> Result<FxHashMap<Var, BTreeSet<Var>>, ExecError> {
    let opts = ExecOpts {
        bound,
        skip_throw: false,
        function_summaries: true,
        globals: UsedGlobals::Declared(pgm.global_vars().clone()),
    };
    let dom = UsedGlobalsDomain::for_program(pgm);
    let mut analyzer = Analyzer::new(pgm, opts, dom, Diagnostics::new());
    let summaries = analyzer.compute_summaries(config)?;

    let mut map: FxHashMap<Var, BTreeSet<Var>> = FxHashMap::default();
    for (name, sets) in summaries {
        let merged: BTreeSet<Var> = sets.into_iter().flatten().collect();
        debug!(func = %pgm.name(name), used = merged.len(), "used-globals summary");
        map.insert(name, merged);
    }
    Ok(map)
}
