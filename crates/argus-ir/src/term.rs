use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::block::Block;
use crate::exp::{Exp, Var};

/// A control-flow edge to a destination block.
///
/// `retreating` marks a loop-closing back-edge; traversing one increments
/// the exploration depth of the edge. Identity (equality, ordering, hashing)
/// is the destination block alone — the flag is a traversal annotation, not
/// part of where the edge goes.
#[derive(Clone, Copy, Debug)]
pub struct Jump {
    pub dst: Block,
    pub retreating: bool,
}

impl Jump {
    pub fn to(dst: Block) -> Jump {
        Jump {
            dst,
            retreating: false,
        }
    }
}

impl PartialEq for Jump {
    fn eq(&self, other: &Self) -> bool {
        self.dst == other.dst
    }
}

impl Eq for Jump {}

impl PartialOrd for Jump {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Jump {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dst.cmp(&other.dst)
    }
}

impl Hash for Jump {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dst.hash(state);
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.dst.id())?;
        if self.retreating {
            write!(f, "^")?;
        }
        Ok(())
    }
}

/// A call terminator.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// Callee expression; a direct call is `Exp::Func`.
    pub callee: Exp,
    pub args: Vec<Exp>,
    /// Register receiving the return value at the return site.
    pub areturn: Option<Var>,
    /// Return site in the caller.
    pub retn: Jump,
    /// Exception landing pad in the caller, if the call is covered by one.
    pub throw: Option<Jump>,
    /// Whether this call may close a recursion cycle. Set by
    /// [`crate::ProgramBuilder::finish`].
    pub recursive: bool,
}

/// Block terminator.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// Multi-way branch on `key`. An unconditional branch is a switch with
    /// an empty table (see [`Term::goto`]).
    Switch {
        key: Exp,
        tbl: Vec<(Exp, Jump)>,
        els: Jump,
    },
    /// Indirect branch to one of the candidate labels.
    Iswitch { ptr: Exp, tbl: Vec<Jump> },
    Call(Call),
    Return { exp: Option<Exp> },
    Throw { exc: Exp },
    Unreachable,
}

#[bon::bon]
impl Term {
    /// Unconditional branch, encoded as a switch with an empty table.
    pub fn goto(dst: Jump) -> Term {
        Term::Switch {
            key: Exp::truth(),
            tbl: Vec::new(),
            els: dst,
        }
    }

    pub fn switch(key: Exp, tbl: Vec<(Exp, Jump)>, els: Jump) -> Term {
        Term::Switch { key, tbl, els }
    }

    pub fn iswitch(ptr: Exp, tbl: Vec<Jump>) -> Term {
        Term::Iswitch { ptr, tbl }
    }

    #[builder(finish_fn = new)]
    pub fn call(
        callee: Exp,
        #[builder(default)] args: Vec<Exp>,
        areturn: Option<Var>,
        retn: Jump,
        throw: Option<Jump>,
    ) -> Term {
        Term::Call(Call {
            callee,
            args,
            areturn,
            retn,
            throw,
            recursive: false,
        })
    }

    pub fn ret(exp: Option<Exp>) -> Term {
        Term::Return { exp }
    }

    pub fn throw(exc: Exp) -> Term {
        Term::Throw { exc }
    }

    /// Successor jumps in dispatch order.
    pub fn jumps(&self) -> SmallVec<[&Jump; 4]> {
        let mut acc: SmallVec<[&Jump; 4]> = SmallVec::new();
        match self {
            Term::Switch { tbl, els, .. } => {
                acc.extend(tbl.iter().map(|(_, j)| j));
                acc.push(els);
            }
            Term::Iswitch { tbl, .. } => acc.extend(tbl.iter()),
            Term::Call(call) => {
                acc.push(&call.retn);
                if let Some(throw) = &call.throw {
                    acc.push(throw);
                }
            }
            Term::Return { .. } | Term::Throw { .. } | Term::Unreachable => {}
        }
        acc
    }

    pub(crate) fn for_each_jump_mut(&mut self, mut f: impl FnMut(&mut Jump)) {
        match self {
            Term::Switch { tbl, els, .. } => {
                for (_, j) in tbl.iter_mut() {
                    f(j);
                }
                f(els);
            }
            Term::Iswitch { tbl, .. } => {
                for j in tbl.iter_mut() {
                    f(j);
                }
            }
            Term::Call(call) => {
                f(&mut call.retn);
                if let Some(throw) = &mut call.throw {
                    f(throw);
                }
            }
            Term::Return { .. } | Term::Throw { .. } | Term::Unreachable => {}
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Switch { key, tbl, els } => {
                if tbl.is_empty() {
                    write!(f, "goto {els}")
                } else {
                    write!(f, "switch {key} [")?;
                    for (i, (case, jump)) in tbl.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{case} => {jump}")?;
                    }
                    write!(f, "] else {els}")
                }
            }
            Term::Iswitch { ptr, tbl } => {
                write!(f, "iswitch {ptr} [")?;
                for (i, jump) in tbl.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{jump}")?;
                }
                write!(f, "]")
            }
            Term::Call(call) => {
                write!(f, "call {}", call.callee)?;
                if let Some(areturn) = call.areturn {
                    write!(f, " -> {areturn}")?;
                }
                write!(f, " to {}", call.retn)?;
                if let Some(throw) = &call.throw {
                    write!(f, " unwind {throw}")?;
                }
                Ok(())
            }
            Term::Return { exp: Some(exp) } => write!(f, "return {exp}"),
            Term::Return { exp: None } => write!(f, "return"),
            Term::Throw { exc } => write!(f, "throw {exc}"),
            Term::Unreachable => write!(f, "unreachable"),
        }
    }
}
