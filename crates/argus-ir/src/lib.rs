//! Low-level, function-structured IR consumed by the argus analyzer.
//!
//! A [`Program`] owns every basic block in a flat arena; [`Block`] is an
//! index handle into it. Blocks carry an instruction sequence ([`Inst`]) and
//! a terminator ([`Term`]). Control-flow edges are [`Jump`]s, each knowing
//! whether it closes a loop (`retreating`). Programs are immutable once
//! [`ProgramBuilder::finish`] has run; the builder computes block sort
//! indices, retreating-edge flags, and recursive-call flags.

mod block;
mod builder;
mod exp;
mod func;
mod inst;
mod intern;
mod program;
mod term;

pub use block::{Block, BlockInfo};
pub use builder::{FuncBuilder, ProgramBuilder};
pub use exp::{Exp, Var};
pub use func::Func;
pub use inst::Inst;
pub use intern::{Symbol, SymbolTable};
pub use program::{Global, Program};
pub use term::{Call, Jump, Term};

pub use smallvec::{self, SmallVec};
