//! Minimal domain used by the engine's own unit tests.

use std::collections::BTreeSet;
use std::fmt;

use argus_ir::{Exp, Func, Global, Inst, Program, Var};

use crate::domain::Domain;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MiniState;

impl fmt::Display for MiniState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mini")
    }
}

pub(crate) struct MiniDomain;

impl Domain for MiniDomain {
    type State = MiniState;
    type Summary = MiniState;
    type FromCall = ();

    fn init(&self, _globals: &[Global]) -> MiniState {
        MiniState
    }

    fn join(&self, _lhs: &MiniState, _rhs: &MiniState) -> MiniState {
        MiniState
    }

    fn is_false(&self, _state: &MiniState) -> bool {
        false
    }

    fn exec_inst(&self, _state: &MiniState, _inst: &Inst) -> Result<MiniState, ()> {
        Ok(MiniState)
    }

    fn exec_move(&self, _state: &MiniState, _var: Var, _exp: &Exp) -> MiniState {
        MiniState
    }

    fn exec_kill(&self, _state: &MiniState, _var: Var) -> MiniState {
        MiniState
    }

    fn exec_assume(&self, _state: &MiniState, _cond: &Exp) -> Option<MiniState> {
        Some(MiniState)
    }

    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        _state: &MiniState,
    ) -> (Vec<&'p Func>, MiniState) {
        let funcs = match callee {
            Exp::Func(name) => pgm.function(*name).into_iter().collect(),
            _ => Vec::new(),
        };
        (funcs, MiniState)
    }

    fn call(
        &self,
        _args: &[Exp],
        _areturn: Option<Var>,
        _params: &[Var],
        _locals: &BTreeSet<Var>,
        _globals: &BTreeSet<Var>,
        _summaries: bool,
        _state: &MiniState,
    ) -> (MiniState, ()) {
        (MiniState, ())
    }

    fn post(&self, _locals: &BTreeSet<Var>, _from_call: &(), _state: &MiniState) -> MiniState {
        MiniState
    }

    fn retn(
        &self,
        _params: &[Var],
        _freturn: Option<Var>,
        _from_call: &(),
        _state: &MiniState,
    ) -> MiniState {
        MiniState
    }

    fn apply_summary(&self, _state: &MiniState, _summary: &MiniState) -> Option<MiniState> {
        None
    }

    fn create_summary(
        &self,
        _locals: &BTreeSet<Var>,
        _formals: &BTreeSet<Var>,
        state: &MiniState,
    ) -> (MiniState, MiniState) {
        (MiniState, state.clone())
    }
}
