//! Per-instruction and per-terminator transfer.
//!
//! Each transfer consumes one `(stack, state, block)` item popped from the
//! worklist and enqueues zero or more successor edges. Path-local domain
//! failures report and end the path; only IR invariant violations abort the
//! run.

use tracing::{debug, trace};

use argus_ir::{Block, Call, Exp, Func, Jump, Term};

use crate::domain::{BoundPolicy, Domain};
use crate::driver::Analyzer;
use crate::error::ExecError;
use crate::report::Reporter;
use crate::stack::CallStack;
use crate::work::{Depths, Worklist};

impl<'ir, D: Domain, R: Reporter<D>> Analyzer<'ir, D, R> {
    /// Run the block's instructions through the domain, then dispatch on
    /// its terminator.
    pub(crate) fn exec_block(
        &mut self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) -> Result<(), ExecError> {
        let pgm = self.pgm;
        let info = pgm.block(block);
        trace!(block = %pgm.block_name(block), stk = ?stk, "exec_block");

        let mut state = state;
        for inst in &info.cmnd {
            match self.dom.exec_inst(&state, inst) {
                Ok(next) => state = next,
                Err(()) => {
                    self.reporter.invalid_access_inst(&state, inst, block);
                    return Ok(());
                }
            }
        }
        self.exec_term(stk, state, block, depths, wl)
    }

    fn exec_term(
        &mut self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) -> Result<(), ExecError> {
        let pgm = self.pgm;
        let term = &pgm.block(block).term;
        match term {
            Term::Switch { key, tbl, els } => {
                for (case, jump) in tbl {
                    let guard = Exp::eq(key.clone(), case.clone());
                    if let Some(refined) = self.dom.exec_assume(&state, &guard) {
                        self.exec_jump(stk, refined, block, jump, depths, wl);
                    }
                }
                let mut guard = Exp::truth();
                for (case, _) in tbl {
                    guard = Exp::and(Exp::dq(key.clone(), case.clone()), guard);
                }
                if let Some(refined) = self.dom.exec_assume(&state, &guard) {
                    self.exec_jump(stk, refined, block, els, depths, wl);
                }
                Ok(())
            }

            Term::Iswitch { ptr, tbl } => {
                for jump in tbl {
                    let target = pgm.block(jump.dst);
                    let guard =
                        Exp::eq(ptr.clone(), Exp::label(target.parent, target.lbl));
                    if let Some(refined) = self.dom.exec_assume(&state, &guard) {
                        self.exec_jump(stk, refined, block, jump, depths, wl);
                    }
                }
                Ok(())
            }

            Term::Call(call) => {
                let (callees, state) = self.dom.resolve_callee(pgm, &call.callee, &state);
                if callees.is_empty() {
                    self.exec_skip_func(stk, state, block, call, term, depths, wl);
                    return Ok(());
                }
                // Each resolved callee is explored independently; a failure
                // in one never cancels its siblings.
                for callee in callees {
                    match self
                        .dom
                        .exec_intrinsic(&state, call.areturn, callee.name, &call.args)
                    {
                        Some(Err(())) => {
                            self.reporter.invalid_access_term(&state, term, block);
                        }
                        Some(Ok(next)) => {
                            if !self.dom.is_false(&next) {
                                self.exec_jump(stk, next, block, &call.retn, depths, wl);
                            }
                        }
                        None if callee.is_undefined() => {
                            self.exec_skip_func(stk, state.clone(), block, call, term, depths, wl);
                        }
                        None => self.exec_call(stk, &state, block, call, callee, depths, wl)?,
                    }
                }
                Ok(())
            }

            Term::Return { exp } => self.exec_return(stk, state, block, exp.as_ref(), depths, wl),

            Term::Throw { exc } => self.exec_throw(stk, state, block, exc, depths, wl),

            Term::Unreachable => Ok(()),
        }
    }

    fn exec_jump(
        &self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        jump: &Jump,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) {
        wl.add(
            Some(block),
            jump.retreating,
            stk.clone(),
            state,
            jump.dst,
            depths,
        );
    }

    /// Unknown or undefined callee: report, havoc the return register, and
    /// continue at the return site.
    #[allow(clippy::too_many_arguments)]
    fn exec_skip_func(
        &mut self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        call: &Call,
        term: &Term,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) {
        self.reporter.unknown_call(&call.callee, term, block);
        let state = match call.areturn {
            Some(areturn) => self.dom.exec_kill(&state, areturn),
            None => state,
        };
        self.exec_jump(stk, state, block, &call.retn, depths, wl);
    }

    /// The call transition proper: summaries, entry-state computation, and
    /// the recursion-bounded push.
    #[allow(clippy::too_many_arguments)]
    fn exec_call(
        &self,
        stk: &CallStack<'ir, D>,
        state: &D::State,
        block: Block,
        call: &Call,
        callee: &'ir Func,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) -> Result<(), ExecError> {
        let pgm = self.pgm;
        trace!(callee = %pgm.name(callee.name), recursive = call.recursive, "exec_call");
        let summaries_on = self.opts.function_summaries;
        let globals = self.used_globals(callee.name)?;
        let entry = callee
            .entry
            .expect("resolved callee has a body (checked by the caller)");

        let mut locals = callee.locals.clone();
        if let Some(freturn) = callee.freturn {
            locals.insert(freturn);
        }

        let dnf_states = if summaries_on {
            self.dom.dnf(state)
        } else {
            vec![state.clone()]
        };

        for disjunct in dnf_states {
            if summaries_on {
                let post = self
                    .summaries
                    .get(&callee.name)
                    .into_iter()
                    .flatten()
                    .find_map(|summary| self.dom.apply_summary(&disjunct, summary));
                if let Some(post) = post {
                    debug!(callee = %pgm.name(callee.name), "summary applied");
                    self.exec_jump(stk, post, block, &call.retn, depths, wl);
                    continue;
                }
            }

            let (entry_state, from_call) = self.dom.call(
                &call.args,
                call.areturn,
                &callee.params,
                &locals,
                globals,
                summaries_on,
                &disjunct,
            );
            match stk.push_call(call, callee, self.opts.bound, from_call) {
                Some(pushed) => {
                    wl.add(
                        Some(block),
                        call.recursive,
                        pushed,
                        entry_state,
                        entry,
                        depths,
                    );
                }
                None => {
                    trace!(callee = %pgm.name(callee.name), "recursion bound reached");
                    match self.dom.recursion_beyond_bound() {
                        BoundPolicy::Skip => {}
                        BoundPolicy::Prune => {
                            self.exec_jump(stk, disjunct, block, &call.retn, depths, wl);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn exec_return(
        &mut self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        exp: Option<&Exp>,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) -> Result<(), ExecError> {
        let pgm = self.pgm;
        let func = pgm.parent_func(block);

        let exit_state = match (func.freturn, exp) {
            (Some(freturn), Some(exp)) => self.dom.exec_move(&state, freturn, exp),
            (None, None) => state,
            (freturn, exp) => {
                return Err(ExecError::MalformedReturn {
                    func: pgm.name(func.name).to_owned(),
                    has_freturn: freturn.is_some(),
                    has_exp: exp.is_some(),
                })
            }
        };

        match stk.pop_return() {
            Some((from_call, retn_site, rest)) => {
                let post = self.dom.post(&func.locals, from_call, &exit_state);
                let post = self.summarize(func, post)?;
                let retn_state = self.dom.retn(&func.params, func.freturn, from_call, &post);
                self.exec_jump(&rest, retn_state, block, retn_site, depths, wl);
            }
            None => {
                // Top of the harness: the returning function is the entry
                // point, so summaries mode records it like any other exit.
                let _ = self.summarize(func, exit_state)?;
            }
        }
        Ok(())
    }

    /// In summaries mode, summarize a function exit state over its params,
    /// used globals, and formal return, and append the summary to the
    /// table. The summary computation may rewrite the state.
    fn summarize(&mut self, func: &'ir Func, state: D::State) -> Result<D::State, ExecError> {
        if !self.opts.function_summaries {
            return Ok(state);
        }
        let mut formals: std::collections::BTreeSet<_> = func.params.iter().copied().collect();
        formals.extend(self.used_globals(func.name)?.iter().copied());
        if let Some(freturn) = func.freturn {
            formals.insert(freturn);
        }
        let (summary, state) = self.dom.create_summary(&func.locals, &formals, &state);
        debug!(func = %self.pgm.name(func.name), summary = ?summary, "create_summary");
        self.summaries.entry(func.name).or_default().push(summary);
        Ok(state)
    }

    fn exec_throw(
        &mut self,
        stk: &CallStack<'ir, D>,
        state: D::State,
        block: Block,
        exc: &Exp,
        depths: &Depths<'ir, D>,
        wl: &mut Worklist<'ir, D>,
    ) -> Result<(), ExecError> {
        if self.opts.skip_throw {
            return Ok(());
        }
        let pgm = self.pgm;
        let func = pgm.parent_func(block);
        let fthrow = func.fthrow;
        let dom = &self.dom;

        let unwind = |frame_func: &'ir Func, from_call: &D::FromCall, st: D::State| {
            let post = dom.post(&frame_func.locals, from_call, &st);
            dom.retn(&frame_func.params, Some(fthrow), from_call, &post)
        };

        match stk.pop_throw(state, unwind)? {
            Some((from_call, handler, rest, unwound)) => {
                let exit_state = dom.exec_move(&unwound, fthrow, exc);
                let post = dom.post(&func.locals, from_call, &exit_state);
                let retn_state = dom.retn(&func.params, func.freturn, from_call, &post);
                self.exec_jump(&rest, retn_state, block, handler, depths, wl);
            }
            None => {
                // The exception escapes every frame.
                trace!(func = %pgm.name(func.name), "uncaught throw");
            }
        }
        Ok(())
    }
}
