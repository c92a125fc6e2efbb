use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use argus_interpreter::Domain;
use argus_ir::{Exp, Func, Global, Inst, Program, Var};

/// An inclusive integer interval; `i64::MIN`/`i64::MAX` stand in for the
/// infinities and all arithmetic saturates into them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Itv {
    pub lo: i64,
    pub hi: i64,
}

impl Itv {
    pub const TOP: Itv = Itv {
        lo: i64::MIN,
        hi: i64::MAX,
    };

    pub fn new(lo: i64, hi: i64) -> Itv {
        debug_assert!(lo <= hi);
        Itv { lo, hi }
    }

    pub fn constant(n: i64) -> Itv {
        Itv { lo: n, hi: n }
    }

    pub fn as_constant(&self) -> Option<i64> {
        (self.lo == self.hi).then_some(self.lo)
    }

    pub fn contains(&self, n: i64) -> bool {
        self.lo <= n && n <= self.hi
    }

    pub fn join(&self, other: &Itv) -> Itv {
        Itv {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// `None` when the intersection is empty.
    pub fn meet(&self, other: &Itv) -> Option<Itv> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo <= hi).then_some(Itv { lo, hi })
    }

    pub fn add(&self, other: &Itv) -> Itv {
        Itv {
            lo: self.lo.saturating_add(other.lo),
            hi: self.hi.saturating_add(other.hi),
        }
    }

    pub fn sub(&self, other: &Itv) -> Itv {
        Itv {
            lo: self.lo.saturating_sub(other.hi),
            hi: self.hi.saturating_sub(other.lo),
        }
    }
}

impl fmt::Display for Itv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lo, self.hi) {
            (i64::MIN, i64::MAX) => write!(f, "T"),
            (i64::MIN, hi) => write!(f, "[-inf, {hi}]"),
            (lo, i64::MAX) => write!(f, "[{lo}, +inf]"),
            (lo, hi) if lo == hi => write!(f, "[{lo}]"),
            (lo, hi) => write!(f, "[{lo}, {hi}]"),
        }
    }
}

/// Interval state: bounds per variable; an absent variable is unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ItvState {
    env: BTreeMap<Var, Itv>,
}

impl ItvState {
    pub fn get(&self, var: Var) -> Itv {
        self.env.get(&var).copied().unwrap_or(Itv::TOP)
    }

    fn eval(&self, exp: &Exp) -> Itv {
        match exp {
            Exp::Int(n) => Itv::constant(*n),
            Exp::Bool(b) => Itv::constant(i64::from(*b)),
            Exp::Var(v) => self.get(*v),
            Exp::Add(a, b) => self.eval(a).add(&self.eval(b)),
            Exp::Sub(a, b) => self.eval(a).sub(&self.eval(b)),
            Exp::Eq(a, b) => {
                let (a, b) = (self.eval(a), self.eval(b));
                match (a.as_constant(), b.as_constant()) {
                    (Some(x), Some(y)) => Itv::constant(i64::from(x == y)),
                    _ if a.meet(&b).is_none() => Itv::constant(0),
                    _ => Itv::new(0, 1),
                }
            }
            Exp::Dq(a, b) => {
                let (a, b) = (self.eval(a), self.eval(b));
                match (a.as_constant(), b.as_constant()) {
                    (Some(x), Some(y)) => Itv::constant(i64::from(x != y)),
                    _ if a.meet(&b).is_none() => Itv::constant(1),
                    _ => Itv::new(0, 1),
                }
            }
            Exp::And(a, b) => {
                let (a, b) = (self.eval(a), self.eval(b));
                if a.as_constant() == Some(0) || b.as_constant() == Some(0) {
                    Itv::constant(0)
                } else if !a.contains(0) && !b.contains(0) {
                    Itv::constant(1)
                } else {
                    Itv::new(0, 1)
                }
            }
            Exp::Func(_) | Exp::Label { .. } => Itv::TOP,
        }
    }

    fn bind(&self, var: Var, itv: Itv) -> ItvState {
        let mut next = self.clone();
        if itv == Itv::TOP {
            next.env.remove(&var);
        } else {
            next.env.insert(var, itv);
        }
        next
    }

    fn assume(&self, cond: &Exp) -> Option<ItvState> {
        match cond {
            Exp::Bool(true) => Some(self.clone()),
            Exp::Bool(false) => None,
            Exp::And(lhs, rhs) => self.assume(lhs)?.assume(rhs),
            Exp::Eq(lhs, rhs) => match (&**lhs, &**rhs) {
                (Exp::Var(v), other) | (other, Exp::Var(v)) => {
                    let refined = self.get(*v).meet(&self.eval(other))?;
                    Some(self.bind(*v, refined))
                }
                _ => match self.eval(cond).as_constant() {
                    Some(0) => None,
                    _ => Some(self.clone()),
                },
            },
            Exp::Dq(lhs, rhs) => match (&**lhs, &**rhs) {
                (Exp::Var(v), other) | (other, Exp::Var(v)) => {
                    let bound = self.get(*v);
                    match self.eval(other).as_constant() {
                        Some(n) if bound.as_constant() == Some(n) => None,
                        // Shrink only when the excluded point is an endpoint;
                        // interior holes are not representable.
                        Some(n) if bound.lo == n => Some(self.bind(*v, Itv::new(n + 1, bound.hi))),
                        Some(n) if bound.hi == n => Some(self.bind(*v, Itv::new(bound.lo, n - 1))),
                        _ => Some(self.clone()),
                    }
                }
                _ => match self.eval(cond).as_constant() {
                    Some(0) => None,
                    _ => Some(self.clone()),
                },
            },
            _ => match self.eval(cond).as_constant() {
                Some(0) => None,
                _ => Some(self.clone()),
            },
        }
    }
}

impl fmt::Display for ItvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, itv)) in self.env.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}: {itv}")?;
        }
        write!(f, "}}")
    }
}

/// Caller-side bookkeeping for one call: the caller's whole frame, the
/// return register, and the globals to thread back out.
#[derive(Clone, Debug)]
pub struct ItvFromCall {
    caller_env: BTreeMap<Var, Itv>,
    areturn: Option<Var>,
    globals: BTreeSet<Var>,
}

/// Formals-restricted exit bounds of one function.
#[derive(Clone, Debug)]
pub struct ItvSummary {
    pub post: BTreeMap<Var, Itv>,
}

/// Interval (box) domain.
///
/// Flags definite null dereferences (`load`/`store`/`free` through a
/// pointer that must be 0) and allocations whose length cannot be
/// positive. Summaries are recorded but never applied; re-analysis keeps
/// the domain sound without context sensitivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntvDomain;

impl Domain for IntvDomain {
    type State = ItvState;
    type Summary = ItvSummary;
    type FromCall = ItvFromCall;

    fn init(&self, globals: &[Global]) -> ItvState {
        let mut env = BTreeMap::new();
        for global in globals {
            if let Some(Exp::Int(n)) = &global.init {
                env.insert(global.name, Itv::constant(*n));
            }
        }
        ItvState { env }
    }

    fn join(&self, lhs: &ItvState, rhs: &ItvState) -> ItvState {
        let mut env = BTreeMap::new();
        for (var, itv) in &lhs.env {
            if let Some(other) = rhs.env.get(var) {
                let joined = itv.join(other);
                if joined != Itv::TOP {
                    env.insert(*var, joined);
                }
            }
        }
        ItvState { env }
    }

    fn is_false(&self, _state: &ItvState) -> bool {
        false
    }

    fn exec_inst(&self, state: &ItvState, inst: &Inst) -> Result<ItvState, ()> {
        match inst {
            Inst::Move { reg, exp } => Ok(state.bind(*reg, state.eval(exp))),
            Inst::Load { reg, ptr } => {
                if state.eval(ptr).as_constant() == Some(0) {
                    return Err(());
                }
                Ok(state.bind(*reg, Itv::TOP))
            }
            Inst::Store { ptr, .. } | Inst::Free { ptr } => {
                if state.eval(ptr).as_constant() == Some(0) {
                    return Err(());
                }
                Ok(state.clone())
            }
            Inst::Alloc { reg, len } => {
                if state.eval(len).hi <= 0 {
                    return Err(());
                }
                Ok(state.bind(*reg, Itv::new(1, i64::MAX)))
            }
            Inst::Nondet { reg } => Ok(state.bind(*reg, Itv::TOP)),
        }
    }

    fn exec_move(&self, state: &ItvState, var: Var, exp: &Exp) -> ItvState {
        state.bind(var, state.eval(exp))
    }

    fn exec_kill(&self, state: &ItvState, var: Var) -> ItvState {
        state.bind(var, Itv::TOP)
    }

    fn exec_assume(&self, state: &ItvState, cond: &Exp) -> Option<ItvState> {
        state.assume(cond)
    }

    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        state: &ItvState,
    ) -> (Vec<&'p Func>, ItvState) {
        let funcs = match callee {
            Exp::Func(name) | Exp::Var(name) => pgm.function(*name).into_iter().collect(),
            _ => Vec::new(),
        };
        (funcs, state.clone())
    }

    fn call(
        &self,
        args: &[Exp],
        areturn: Option<Var>,
        params: &[Var],
        _locals: &BTreeSet<Var>,
        globals: &BTreeSet<Var>,
        _summaries: bool,
        state: &ItvState,
    ) -> (ItvState, ItvFromCall) {
        let mut env = BTreeMap::new();
        for (param, arg) in params.iter().zip(args.iter()) {
            let bound = state.eval(arg);
            if bound != Itv::TOP {
                env.insert(*param, bound);
            }
        }
        for global in globals {
            if let Some(bound) = state.env.get(global) {
                env.insert(*global, *bound);
            }
        }
        let from_call = ItvFromCall {
            caller_env: state.env.clone(),
            areturn,
            globals: globals.clone(),
        };
        (ItvState { env }, from_call)
    }

    fn post(&self, locals: &BTreeSet<Var>, _from_call: &ItvFromCall, state: &ItvState) -> ItvState {
        let mut next = state.clone();
        for local in locals {
            next.env.remove(local);
        }
        next
    }

    fn retn(
        &self,
        _params: &[Var],
        freturn: Option<Var>,
        from_call: &ItvFromCall,
        state: &ItvState,
    ) -> ItvState {
        let mut env = from_call.caller_env.clone();
        for global in &from_call.globals {
            match state.env.get(global) {
                Some(bound) => env.insert(*global, *bound),
                None => env.remove(global),
            };
        }
        if let Some(areturn) = from_call.areturn {
            let returned = freturn.and_then(|fr| state.env.get(&fr)).copied();
            match returned {
                Some(bound) => env.insert(areturn, bound),
                None => env.remove(&areturn),
            };
        }
        ItvState { env }
    }

    fn apply_summary(&self, _state: &ItvState, _summary: &ItvSummary) -> Option<ItvState> {
        // Summaries are not context sensitive; decline and re-analyze.
        None
    }

    fn create_summary(
        &self,
        _locals: &BTreeSet<Var>,
        formals: &BTreeSet<Var>,
        state: &ItvState,
    ) -> (ItvSummary, ItvState) {
        let post = state
            .env
            .iter()
            .filter(|(var, _)| formals.contains(var))
            .map(|(var, itv)| (*var, *itv))
            .collect();
        (ItvSummary { post }, state.clone())
    }
}
