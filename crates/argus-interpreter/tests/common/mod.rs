//! Oracle domain for engine tests: states are per-variable sets of possible
//! values, join is pointwise union, and every domain callback is logged so
//! tests can observe exactly what the engine drove.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use argus_interpreter::{BoundPolicy, Domain};
use argus_ir::{Exp, Func, Global, Inst, Program, Var};

/// One observed domain callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Inst(Inst),
    Move(Var),
    Kill(Var),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleState {
    /// Possible values per variable; an absent variable is unconstrained.
    env: BTreeMap<Var, BTreeSet<i64>>,
}

impl OracleState {
    fn eval(&self, exp: &Exp) -> Option<BTreeSet<i64>> {
        match exp {
            Exp::Int(n) => Some(BTreeSet::from([*n])),
            Exp::Bool(b) => Some(BTreeSet::from([i64::from(*b)])),
            Exp::Var(v) => self.env.get(v).cloned(),
            _ => None,
        }
    }

    fn assume(&self, cond: &Exp) -> Option<OracleState> {
        match cond {
            Exp::Bool(true) => Some(self.clone()),
            Exp::Bool(false) => None,
            Exp::And(lhs, rhs) => self.assume(lhs)?.assume(rhs),
            Exp::Eq(lhs, rhs) => match (&**lhs, &**rhs) {
                (Exp::Var(v), Exp::Int(n)) | (Exp::Int(n), Exp::Var(v)) => {
                    match self.env.get(v) {
                        Some(vals) if !vals.contains(n) => None,
                        _ => {
                            let mut refined = self.clone();
                            refined.env.insert(*v, BTreeSet::from([*n]));
                            Some(refined)
                        }
                    }
                }
                _ => Some(self.clone()),
            },
            Exp::Dq(lhs, rhs) => match (&**lhs, &**rhs) {
                (Exp::Var(v), Exp::Int(n)) | (Exp::Int(n), Exp::Var(v)) => {
                    match self.env.get(v) {
                        Some(vals) => {
                            let mut vals = vals.clone();
                            vals.remove(n);
                            if vals.is_empty() {
                                None
                            } else {
                                let mut refined = self.clone();
                                refined.env.insert(*v, vals);
                                Some(refined)
                            }
                        }
                        None => Some(self.clone()),
                    }
                }
                _ => Some(self.clone()),
            },
            _ => Some(self.clone()),
        }
    }
}

impl fmt::Display for OracleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, vals)) in self.env.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}:{vals:?}")?;
        }
        write!(f, "}}")
    }
}

pub struct OracleDomain {
    log: Rc<RefCell<Vec<Event>>>,
    seed: BTreeMap<Var, BTreeSet<i64>>,
    policy: BoundPolicy,
}

#[allow(dead_code)]
impl OracleDomain {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            seed: BTreeMap::new(),
            policy: BoundPolicy::Skip,
        }
    }

    /// Seed the initial state: `var` may be any of `vals`.
    pub fn with_env(mut self, var: Var, vals: &[i64]) -> Self {
        self.seed.insert(var, vals.iter().copied().collect());
        self
    }

    pub fn with_policy(mut self, policy: BoundPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shared handle onto the event log; stays live after the domain moves
    /// into the analyzer.
    pub fn log(&self) -> Rc<RefCell<Vec<Event>>> {
        Rc::clone(&self.log)
    }
}

/// Number of `Move` events (instruction or transfer) writing `var`.
#[allow(dead_code)]
pub fn moves_of(log: &Rc<RefCell<Vec<Event>>>, var: Var) -> usize {
    log.borrow()
        .iter()
        .filter(|event| match event {
            Event::Inst(Inst::Move { reg, .. }) => *reg == var,
            Event::Move(reg) => *reg == var,
            _ => false,
        })
        .count()
}

#[allow(dead_code)]
pub fn kills_of(log: &Rc<RefCell<Vec<Event>>>, var: Var) -> usize {
    log.borrow()
        .iter()
        .filter(|event| matches!(event, Event::Kill(reg) if *reg == var))
        .count()
}

impl Domain for OracleDomain {
    type State = OracleState;
    type Summary = OracleState;
    type FromCall = ();

    fn init(&self, _globals: &[Global]) -> OracleState {
        OracleState {
            env: self.seed.clone(),
        }
    }

    fn join(&self, lhs: &OracleState, rhs: &OracleState) -> OracleState {
        let mut env = BTreeMap::new();
        for (var, vals) in &lhs.env {
            if let Some(other) = rhs.env.get(var) {
                env.insert(*var, vals.union(other).copied().collect());
            }
        }
        OracleState { env }
    }

    fn is_false(&self, _state: &OracleState) -> bool {
        false
    }

    fn exec_inst(&self, state: &OracleState, inst: &Inst) -> Result<OracleState, ()> {
        self.log.borrow_mut().push(Event::Inst(inst.clone()));
        // `free` stands in for an instruction the domain rejects.
        if matches!(inst, Inst::Free { .. }) {
            return Err(());
        }
        let mut next = state.clone();
        match inst {
            Inst::Move { reg, exp } => match state.eval(exp) {
                Some(vals) => {
                    next.env.insert(*reg, vals);
                }
                None => {
                    next.env.remove(reg);
                }
            },
            _ => {
                if let Some(reg) = inst.defines() {
                    next.env.remove(&reg);
                }
            }
        }
        Ok(next)
    }

    fn exec_move(&self, state: &OracleState, var: Var, exp: &Exp) -> OracleState {
        self.log.borrow_mut().push(Event::Move(var));
        let mut next = state.clone();
        match state.eval(exp) {
            Some(vals) => {
                next.env.insert(var, vals);
            }
            None => {
                next.env.remove(&var);
            }
        }
        next
    }

    fn exec_kill(&self, state: &OracleState, var: Var) -> OracleState {
        self.log.borrow_mut().push(Event::Kill(var));
        let mut next = state.clone();
        next.env.remove(&var);
        next
    }

    fn exec_assume(&self, state: &OracleState, cond: &Exp) -> Option<OracleState> {
        state.assume(cond)
    }

    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        state: &OracleState,
    ) -> (Vec<&'p Func>, OracleState) {
        let funcs = match callee {
            // A function's address is the global named after it, so a
            // variable callee resolves by name as well.
            Exp::Func(name) | Exp::Var(name) => pgm.function(*name).into_iter().collect(),
            _ => Vec::new(),
        };
        (funcs, state.clone())
    }

    fn call(
        &self,
        _args: &[Exp],
        _areturn: Option<Var>,
        _params: &[Var],
        _locals: &BTreeSet<Var>,
        _globals: &BTreeSet<Var>,
        _summaries: bool,
        state: &OracleState,
    ) -> (OracleState, ()) {
        (state.clone(), ())
    }

    fn post(&self, _locals: &BTreeSet<Var>, _from_call: &(), state: &OracleState) -> OracleState {
        state.clone()
    }

    fn retn(
        &self,
        _params: &[Var],
        _freturn: Option<Var>,
        _from_call: &(),
        state: &OracleState,
    ) -> OracleState {
        state.clone()
    }

    fn apply_summary(&self, _state: &OracleState, summary: &OracleState) -> Option<OracleState> {
        Some(summary.clone())
    }

    fn create_summary(
        &self,
        _locals: &BTreeSet<Var>,
        _formals: &BTreeSet<Var>,
        state: &OracleState,
    ) -> (OracleState, OracleState) {
        (state.clone(), state.clone())
    }

    fn recursion_beyond_bound(&self) -> BoundPolicy {
        self.policy
    }
}
