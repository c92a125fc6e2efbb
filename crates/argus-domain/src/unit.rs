use std::collections::BTreeSet;
use std::fmt;

use argus_interpreter::Domain;
use argus_ir::{Exp, Func, Global, Inst, Program, Var};

/// State of the trivial domain: nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitState;

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "()")
    }
}

/// The trivial domain: tracks reachability and nothing else. Every
/// operation is the identity and no access is ever invalid.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitDomain;

impl Domain for UnitDomain {
    type State = UnitState;
    type Summary = UnitState;
    type FromCall = ();

    fn init(&self, _globals: &[Global]) -> UnitState {
        UnitState
    }

    fn join(&self, _lhs: &UnitState, _rhs: &UnitState) -> UnitState {
        UnitState
    }

    fn is_false(&self, _state: &UnitState) -> bool {
        false
    }

    fn exec_inst(&self, _state: &UnitState, _inst: &Inst) -> Result<UnitState, ()> {
        Ok(UnitState)
    }

    fn exec_move(&self, _state: &UnitState, _var: Var, _exp: &Exp) -> UnitState {
        UnitState
    }

    fn exec_kill(&self, _state: &UnitState, _var: Var) -> UnitState {
        UnitState
    }

    fn exec_assume(&self, _state: &UnitState, _cond: &Exp) -> Option<UnitState> {
        Some(UnitState)
    }

    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        _state: &UnitState,
    ) -> (Vec<&'p Func>, UnitState) {
        let funcs = match callee {
            Exp::Func(name) | Exp::Var(name) => pgm.function(*name).into_iter().collect(),
            _ => Vec::new(),
        };
        (funcs, UnitState)
    }

    fn call(
        &self,
        _args: &[Exp],
        _areturn: Option<Var>,
        _params: &[Var],
        _locals: &BTreeSet<Var>,
        _globals: &BTreeSet<Var>,
        _summaries: bool,
        _state: &UnitState,
    ) -> (UnitState, ()) {
        (UnitState, ())
    }

    fn post(&self, _locals: &BTreeSet<Var>, _from_call: &(), _state: &UnitState) -> UnitState {
        UnitState
    }

    fn retn(
        &self,
        _params: &[Var],
        _freturn: Option<Var>,
        _from_call: &(),
        _state: &UnitState,
    ) -> UnitState {
        UnitState
    }

    fn apply_summary(&self, _state: &UnitState, _summary: &UnitState) -> Option<UnitState> {
        Some(UnitState)
    }

    fn create_summary(
        &self,
        _locals: &BTreeSet<Var>,
        _formals: &BTreeSet<Var>,
        _state: &UnitState,
    ) -> (UnitState, UnitState) {
        (UnitState, UnitState)
    }
}
