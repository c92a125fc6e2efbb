use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::block::{Block, BlockInfo};
use crate::exp::{Exp, Var};
use crate::func::Func;
use crate::intern::{Symbol, SymbolTable};

/// A program-level global variable.
#[derive(Clone, Debug)]
pub struct Global {
    pub name: Var,
    pub init: Option<Exp>,
}

/// An immutable program: globals, functions, and the block arena.
///
/// Built by [`crate::ProgramBuilder`]; no mutation after that.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) globals: Vec<Global>,
    pub(crate) global_vars: BTreeSet<Var>,
    pub(crate) functions: FxHashMap<Var, Func>,
    pub(crate) blocks: Vec<BlockInfo>,
    pub(crate) symbols: SymbolTable,
}

impl Program {
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// The set of all global variable names, function names included.
    pub fn global_vars(&self) -> &BTreeSet<Var> {
        &self.global_vars
    }

    pub fn function(&self, name: Var) -> Option<&Func> {
        self.functions.get(&name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Func> {
        self.functions.values()
    }

    pub fn block(&self, block: Block) -> &BlockInfo {
        &self.blocks[block.0 as usize]
    }

    /// The function owning `block`.
    ///
    /// # Panics
    ///
    /// Panics if the arena and function table disagree, which the builder
    /// rules out.
    pub fn parent_func(&self, block: Block) -> &Func {
        let parent = self.block(block).parent;
        self.functions
            .get(&parent)
            .expect("block parent is a registered function")
    }

    /// Resolve a name to its `Var` without interning new symbols.
    pub fn var(&self, name: &str) -> Option<Var> {
        self.symbols.find(name).map(Var)
    }

    pub fn name(&self, var: Var) -> &str {
        self.symbols.resolve(var.0)
    }

    pub fn symbol(&self, sym: Symbol) -> &str {
        self.symbols.resolve(sym)
    }

    /// Render a block reference as `function.label`.
    pub fn block_name(&self, block: Block) -> String {
        let info = self.block(block);
        format!("{}.{}", self.name(info.parent), self.symbol(info.lbl))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<Var> = self.functions.keys().copied().collect();
        names.sort();
        for name in names {
            let func = &self.functions[&name];
            write!(f, "fn {}(", self.name(name))?;
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.name(*param))?;
            }
            writeln!(f, ")")?;
            for &block in &func.blocks {
                let info = self.block(block);
                writeln!(f, "  {} (b{}):", self.symbol(info.lbl), block.id())?;
                for inst in &info.cmnd {
                    writeln!(f, "    {inst}")?;
                }
                writeln!(f, "    {}", info.term)?;
            }
        }
        Ok(())
    }
}
