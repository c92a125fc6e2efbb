use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use argus_ir::{Program, Var};

use crate::config::{Config, ExecOpts, UsedGlobals};
use crate::domain::Domain;
use crate::error::ExecError;
use crate::report::Reporter;
use crate::work::Worklist;

/// One analysis run: program, options, domain, reporter, and the
/// append-only summary table. Everything engine-owned lives exactly as long
/// as the run.
pub struct Analyzer<'ir, D: Domain, R: Reporter<D>> {
    pub(crate) pgm: &'ir Program,
    pub(crate) opts: ExecOpts,
    pub(crate) dom: D,
    pub(crate) reporter: R,
    pub(crate) summaries: FxHashMap<Var, Vec<D::Summary>>,
}

impl<'ir, D: Domain, R: Reporter<D>> Analyzer<'ir, D, R> {
    pub fn new(pgm: &'ir Program, opts: ExecOpts, dom: D, reporter: R) -> Self {
        Self {
            pgm,
            opts,
            dom,
            reporter,
            summaries: FxHashMap::default(),
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// The globals `name` may touch, per the configured [`UsedGlobals`]
    /// mode. In per-function mode a missing entry is fatal: the globals
    /// pre-analysis covers every reachable function.
    pub(crate) fn used_globals(&self, name: Var) -> Result<&BTreeSet<Var>, ExecError> {
        match &self.opts.globals {
            UsedGlobals::Declared(set) => Ok(set),
            UsedGlobals::PerFunction(map) => {
                map.get(&name).ok_or_else(|| ExecError::UnknownGlobals {
                    func: self.pgm.name(name).to_owned(),
                })
            }
        }
    }

    /// Find the first configured entry point that names a defined,
    /// parameterless function, and seed the worklist with its entry state.
    fn harness(&self, config: &Config) -> Result<Worklist<'ir, D>, ExecError> {
        let entry_points = config.find_list("entry-points");
        let pgm = self.pgm;
        let func = entry_points
            .iter()
            .find_map(|name| {
                let var = pgm.var(name)?;
                pgm.function(var)
                    .filter(|f| f.params.is_empty() && !f.is_undefined())
            })
            .ok_or(ExecError::NoHarness(entry_points.clone()))?;
        debug!(entry = %pgm.name(func.name), "harness");

        let mut locals = func.locals.clone();
        if let Some(freturn) = func.freturn {
            locals.insert(freturn);
        }
        let globals = self.used_globals(func.name)?;
        let init = self.dom.init(pgm.globals());
        let (state, _) = self.dom.call(
            &[],
            None,
            &[],
            &locals,
            globals,
            self.opts.function_summaries,
            &init,
        );
        let entry = func.entry.expect("harness function is defined");
        Ok(Worklist::init(state, entry, self.opts.bound))
    }

    /// Analyze the program from its harness until the frontier drains.
    pub fn exec_pgm(&mut self, config: &Config) -> Result<(), ExecError> {
        let mut wl = self.harness(config)?;
        while let Some((stk, state, block, depths)) = wl.pop(&self.dom) {
            self.exec_block(&stk, state, block, &depths, &mut wl)?;
        }
        trace!("worklist drained");
        Ok(())
    }

    /// Run in summaries mode and return the non-empty summary-table
    /// entries, keyed by function name.
    pub fn compute_summaries(
        &mut self,
        config: &Config,
    ) -> Result<BTreeMap<Var, Vec<D::Summary>>, ExecError> {
        if !self.opts.function_summaries {
            return Err(ExecError::SummariesDisabled);
        }
        self.exec_pgm(config)?;
        Ok(self
            .summaries
            .iter()
            .filter(|(_, summaries)| !summaries.is_empty())
            .map(|(name, summaries)| (*name, summaries.clone()))
            .collect())
    }
}
