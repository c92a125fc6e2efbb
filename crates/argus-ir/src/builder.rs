use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{Block, BlockInfo};
use crate::exp::{Exp, Var};
use crate::func::Func;
use crate::inst::Inst;
use crate::intern::SymbolTable;
use crate::program::{Global, Program};
use crate::term::Term;

/// Staged construction of a [`Program`].
///
/// Functions are built one at a time through [`ProgramBuilder::func`];
/// blocks may be reserved before they are filled, so forward and backward
/// references need no special handling. [`ProgramBuilder::finish`] runs the
/// whole-program pass that marks recursive calls.
pub struct ProgramBuilder {
    symbols: SymbolTable,
    blocks: Vec<BlockInfo>,
    functions: FxHashMap<Var, Func>,
    decl_order: Vec<Var>,
    globals: Vec<Global>,
    global_vars: BTreeSet<Var>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            blocks: Vec::new(),
            functions: FxHashMap::default(),
            decl_order: Vec::new(),
            globals: Vec::new(),
            global_vars: BTreeSet::new(),
        }
    }

    pub fn var(&mut self, name: &str) -> Var {
        Var(self.symbols.intern(name))
    }

    /// Declare a program-level global variable.
    pub fn global(&mut self, name: &str, init: Option<Exp>) -> Var {
        let var = self.var(name);
        self.globals.push(Global { name: var, init });
        self.global_vars.insert(var);
        var
    }

    /// Declare a function without a body. Calls to it are treated as
    /// unknown by the engine.
    pub fn declare(&mut self, name: &str, params: &[&str], freturn: Option<&str>) -> Var {
        let var = self.var(name);
        let params = params.iter().map(|p| self.var(p)).collect();
        let freturn = freturn.map(|r| self.var(r));
        let fthrow = self.var(&format!("{name}.throw"));
        self.global_vars.insert(var);
        self.functions.insert(
            var,
            Func {
                name: var,
                params,
                freturn,
                fthrow,
                locals: BTreeSet::new(),
                entry: None,
                blocks: Vec::new(),
            },
        );
        self.decl_order.push(var);
        var
    }

    /// Begin a function body. The first block created is its entry unless
    /// [`FuncBuilder::set_entry`] says otherwise.
    pub fn func(&mut self, name: &str) -> FuncBuilder<'_> {
        let var = self.var(name);
        let fthrow = self.var(&format!("{name}.throw"));
        self.global_vars.insert(var);
        FuncBuilder {
            pb: self,
            name: var,
            params: Vec::new(),
            freturn: None,
            fthrow,
            locals: BTreeSet::new(),
            blocks: Vec::new(),
            entry: None,
        }
    }

    /// Seal the program: resolve the direct-call graph, mark calls that may
    /// close a recursion cycle, and freeze everything.
    pub fn finish(mut self) -> Program {
        self.mark_recursive_calls();
        Program {
            globals: self.globals,
            global_vars: self.global_vars,
            functions: self.functions,
            blocks: self.blocks,
            symbols: self.symbols,
        }
    }

    /// A call is recursive iff caller and callee are in the same strongly
    /// connected component of the direct-call graph (a self-call included).
    fn mark_recursive_calls(&mut self) {
        let n = self.decl_order.len();
        let index_of: FxHashMap<Var, usize> = self
            .decl_order
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();

        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for info in &self.blocks {
            if let Term::Call(call) = &info.term {
                if let Exp::Func(callee) = &call.callee {
                    if let (Some(&i), Some(&j)) =
                        (index_of.get(&info.parent), index_of.get(callee))
                    {
                        adj[i].push(j);
                    }
                }
            }
        }

        let (comp, comp_sizes) = tarjan_scc(&adj);

        for info in &mut self.blocks {
            if let Term::Call(call) = &mut info.term {
                if let Exp::Func(callee) = &call.callee {
                    if let (Some(&i), Some(&j)) =
                        (index_of.get(&info.parent), index_of.get(callee))
                    {
                        if comp[i] == comp[j] && (comp_sizes[comp[i]] > 1 || i == j) {
                            call.recursive = true;
                        }
                    }
                }
            }
        }
    }
}

/// Builder for one function body; obtained from [`ProgramBuilder::func`].
pub struct FuncBuilder<'a> {
    pb: &'a mut ProgramBuilder,
    name: Var,
    params: Vec<Var>,
    freturn: Option<Var>,
    fthrow: Var,
    locals: BTreeSet<Var>,
    blocks: Vec<Block>,
    entry: Option<Block>,
}

impl FuncBuilder<'_> {
    pub fn name(&self) -> Var {
        self.name
    }

    pub fn param(&mut self, name: &str) -> Var {
        let var = self.pb.var(name);
        self.params.push(var);
        var
    }

    pub fn freturn(&mut self, name: &str) -> Var {
        let var = self.pb.var(name);
        self.freturn = Some(var);
        var
    }

    pub fn local(&mut self, name: &str) -> Var {
        let var = self.pb.var(name);
        self.locals.insert(var);
        var
    }

    pub fn fthrow(&self) -> Var {
        self.fthrow
    }

    /// Reserve a block handle to be filled later with [`FuncBuilder::set`].
    /// A reserved block that is never filled terminates in `Unreachable`.
    pub fn reserve(&mut self, lbl: &str) -> Block {
        let lbl = self.pb.symbols.intern(lbl);
        let block = Block(self.pb.blocks.len() as u32);
        self.pb.blocks.push(BlockInfo {
            parent: self.name,
            sort_index: 0,
            lbl,
            cmnd: Vec::new(),
            term: Term::Unreachable,
        });
        self.blocks.push(block);
        if self.entry.is_none() {
            self.entry = Some(block);
        }
        block
    }

    pub fn set(&mut self, block: Block, cmnd: Vec<Inst>, term: Term) {
        let info = &mut self.pb.blocks[block.id() as usize];
        info.cmnd = cmnd;
        info.term = term;
    }

    pub fn block(&mut self, lbl: &str, cmnd: Vec<Inst>, term: Term) -> Block {
        let block = self.reserve(lbl);
        self.set(block, cmnd, term);
        block
    }

    pub fn set_entry(&mut self, block: Block) {
        self.entry = Some(block);
    }

    /// Seal the function: compute reverse-postorder sort indices, mark
    /// retreating (loop-closing) jumps, and register the function.
    pub fn finish(self) -> Var {
        let FuncBuilder {
            pb,
            name,
            params,
            freturn,
            fthrow,
            locals,
            mut blocks,
            entry,
        } = self;

        let members: FxHashSet<Block> = blocks.iter().copied().collect();
        let succs: FxHashMap<Block, Vec<Block>> = blocks
            .iter()
            .map(|&b| {
                let dsts = pb.blocks[b.id() as usize]
                    .term
                    .jumps()
                    .iter()
                    .map(|j| j.dst)
                    .filter(|dst| members.contains(dst))
                    .collect();
                (b, dsts)
            })
            .collect();

        // Depth-first walk from the entry: an edge to a block still on the
        // walk stack closes a loop.
        const GREY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color: FxHashMap<Block, u8> = FxHashMap::default();
        let mut postorder: Vec<Block> = Vec::new();
        let mut retreating: FxHashSet<(Block, Block)> = FxHashSet::default();
        if let Some(entry) = entry {
            let mut stack: Vec<(Block, usize)> = vec![(entry, 0)];
            color.insert(entry, GREY);
            while let Some((b, i)) = stack.last_mut() {
                let b = *b;
                let bsuccs = &succs[&b];
                if *i < bsuccs.len() {
                    let s = bsuccs[*i];
                    *i += 1;
                    match color.get(&s) {
                        None => {
                            color.insert(s, GREY);
                            stack.push((s, 0));
                        }
                        Some(&GREY) => {
                            retreating.insert((b, s));
                        }
                        _ => {}
                    }
                } else {
                    color.insert(b, BLACK);
                    postorder.push(b);
                    stack.pop();
                }
            }
        }

        let mut order: Vec<Block> = postorder.into_iter().rev().collect();
        for &b in &blocks {
            if !color.contains_key(&b) {
                order.push(b);
            }
        }
        for (idx, &b) in order.iter().enumerate() {
            pb.blocks[b.id() as usize].sort_index = idx;
        }

        for &b in &blocks {
            pb.blocks[b.id() as usize].term.for_each_jump_mut(|j| {
                if retreating.contains(&(b, j.dst)) {
                    j.retreating = true;
                }
            });
        }

        blocks.sort_by_key(|b| pb.blocks[b.id() as usize].sort_index);
        pb.functions.insert(
            name,
            Func {
                name,
                params,
                freturn,
                fthrow,
                locals,
                entry,
                blocks,
            },
        );
        pb.decl_order.push(name);
        name
    }
}

/// Iterative Tarjan over an adjacency list. Returns the component id of
/// each node and the size of each component.
fn tarjan_scc(adj: &[Vec<usize>]) -> (Vec<usize>, Vec<usize>) {
    let n = adj.len();
    const UNVISITED: usize = usize::MAX;
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut comp = vec![UNVISITED; n];
    let mut comp_sizes: Vec<usize> = Vec::new();
    let mut next_index = 0usize;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        let mut call: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some((v, ci)) = call.last_mut() {
            let v = *v;
            if *ci < adj[v].len() {
                let w = adj[v][*ci];
                *ci += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    low[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
            } else {
                call.pop();
                if let Some(&(p, _)) = call.last() {
                    low[p] = low[p].min(low[v]);
                }
                if low[v] == index[v] {
                    let id = comp_sizes.len();
                    let mut size = 0;
                    loop {
                        let w = stack.pop().expect("component stack is non-empty");
                        on_stack[w] = false;
                        comp[w] = id;
                        size += 1;
                        if w == v {
                            break;
                        }
                    }
                    comp_sizes.push(size);
                }
            }
        }
    }

    (comp, comp_sizes)
}
