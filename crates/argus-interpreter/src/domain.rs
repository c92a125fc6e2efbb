use std::collections::BTreeSet;
use std::fmt;

use argus_ir::{Exp, Func, Global, Inst, Program, Var};

/// What to do with a call once its recursion bound is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundPolicy {
    /// Ignore the call entirely: the path ends here.
    Skip,
    /// Prune the callee body and fall through to the return site with the
    /// pre-call state.
    Prune,
}

/// The abstract-domain contract the engine is generic over.
///
/// A domain is an instance (it may carry configuration), and states are
/// values: every transfer borrows its input and returns a fresh state. The
/// engine never inspects states beyond [`join`](Domain::join),
/// [`is_false`](Domain::is_false), and the `Display` impl used for
/// diagnostics.
///
/// Soundness of reported findings is entirely the domain's responsibility;
/// the engine only drives exploration.
pub trait Domain {
    /// Abstract state at a program point.
    type State: Clone + fmt::Debug + fmt::Display;
    /// Relational abstraction of a function's behavior, usable in lieu of
    /// re-exploring its body.
    type Summary: Clone + fmt::Debug;
    /// Caller-side bookkeeping needed to reconcile a later return with its
    /// call: parameter binding, scoping of locals, and the like.
    type FromCall: Clone;

    /// The initial state at the harness entry, given the program globals.
    fn init(&self, globals: &[Global]) -> Self::State;

    /// Least upper bound of two states arriving at the same block.
    fn join(&self, lhs: &Self::State, rhs: &Self::State) -> Self::State;

    /// Split a state into disjuncts to be explored independently. Only used
    /// in function-summaries mode.
    fn dnf(&self, state: &Self::State) -> Vec<Self::State> {
        vec![state.clone()]
    }

    /// Whether the state is unsatisfiable, i.e. the path is infeasible.
    fn is_false(&self, state: &Self::State) -> bool;

    /// Execute one instruction. `Err(())` signals an invalid access; the
    /// engine reports it and abandons the path.
    fn exec_inst(&self, state: &Self::State, inst: &Inst) -> Result<Self::State, ()>;

    /// `var := exp`.
    fn exec_move(&self, state: &Self::State, var: Var, exp: &Exp) -> Self::State;

    /// Forget everything known about `var`.
    fn exec_kill(&self, state: &Self::State, var: Var) -> Self::State;

    /// Constrain the state by `cond`; `None` means the refined state is
    /// unsatisfiable and the branch is dead.
    fn exec_assume(&self, state: &Self::State, cond: &Exp) -> Option<Self::State>;

    /// Execute `callee` as an intrinsic, if the domain models it as one.
    /// `None` means "not an intrinsic"; `Some(Err(()))` is an invalid
    /// access.
    fn exec_intrinsic(
        &self,
        state: &Self::State,
        areturn: Option<Var>,
        callee: Var,
        args: &[Exp],
    ) -> Option<Result<Self::State, ()>> {
        let _ = (state, areturn, callee, args);
        None
    }

    /// Resolve a callee expression to candidate functions, possibly
    /// refining the state with the knowledge gained.
    fn resolve_callee<'p>(
        &self,
        pgm: &'p Program,
        callee: &Exp,
        state: &Self::State,
    ) -> (Vec<&'p Func>, Self::State);

    /// The call transition: bind `args` to `params`, scope `locals`, and
    /// produce the callee entry state plus the token needed to undo all of
    /// it at the matching return.
    #[allow(clippy::too_many_arguments)]
    fn call(
        &self,
        args: &[Exp],
        areturn: Option<Var>,
        params: &[Var],
        locals: &BTreeSet<Var>,
        globals: &BTreeSet<Var>,
        summaries: bool,
        state: &Self::State,
    ) -> (Self::State, Self::FromCall);

    /// Leave the callee scope: existentially quantify `locals` out of the
    /// exit state.
    fn post(&self, locals: &BTreeSet<Var>, from_call: &Self::FromCall, state: &Self::State)
        -> Self::State;

    /// Re-enter the caller scope: unbind `params`, map `freturn` to the
    /// call's return register, restore shadowed bindings.
    fn retn(
        &self,
        params: &[Var],
        freturn: Option<Var>,
        from_call: &Self::FromCall,
        state: &Self::State,
    ) -> Self::State;

    /// Apply a cached summary to a call state. `Some(post)` short-circuits
    /// the callee body; `None` forces re-analysis.
    fn apply_summary(&self, state: &Self::State, summary: &Self::Summary) -> Option<Self::State>;

    /// Summarize a function exit state over its `formals` (params, used
    /// globals, and formal return), scoping out `locals`. May rewrite the
    /// state it returns alongside the summary.
    fn create_summary(
        &self,
        locals: &BTreeSet<Var>,
        formals: &BTreeSet<Var>,
        state: &Self::State,
    ) -> (Self::Summary, Self::State);

    /// Policy for calls refused by the recursion bound.
    fn recursion_beyond_bound(&self) -> BoundPolicy {
        BoundPolicy::Skip
    }
}
