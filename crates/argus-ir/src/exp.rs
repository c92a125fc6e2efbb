use std::fmt;

use crate::intern::Symbol;

/// A register or global variable name.
///
/// Function names are `Var`s as well: a function's address is the global
/// named after it, which is how indirect calls resolve.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Var(pub Symbol);

impl Var {
    pub fn sym(&self) -> Symbol {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0.id())
    }
}

/// Expression tree.
///
/// Expressions are opaque to the exploration engine except for the guard
/// constructors ([`Exp::eq`], [`Exp::dq`], [`Exp::and`], [`Exp::truth`],
/// [`Exp::label`]) it uses to encode switch-case assumptions. Everything
/// else is interpreted by the abstract domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Exp {
    Var(Var),
    Int(i64),
    Bool(bool),
    /// Address of a function.
    Func(Var),
    /// Address of a block, used as an indirect-switch candidate.
    Label { func: Var, block: Symbol },
    Eq(Box<Exp>, Box<Exp>),
    Dq(Box<Exp>, Box<Exp>),
    And(Box<Exp>, Box<Exp>),
    Add(Box<Exp>, Box<Exp>),
    Sub(Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn var(v: Var) -> Exp {
        Exp::Var(v)
    }

    pub fn int(n: i64) -> Exp {
        Exp::Int(n)
    }

    pub fn func(name: Var) -> Exp {
        Exp::Func(name)
    }

    pub fn label(func: Var, block: Symbol) -> Exp {
        Exp::Label { func, block }
    }

    /// The always-true guard, the unit of [`Exp::and`].
    pub fn truth() -> Exp {
        Exp::Bool(true)
    }

    pub fn eq(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Eq(Box::new(lhs), Box::new(rhs))
    }

    /// Disequality.
    pub fn dq(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Dq(Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Exp, rhs: Exp) -> Exp {
        Exp::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn add(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Sub(Box::new(lhs), Box::new(rhs))
    }

    /// All variables mentioned by this expression, in syntactic order.
    pub fn vars(&self) -> Vec<Var> {
        let mut acc = Vec::new();
        self.fold_vars(&mut acc);
        acc
    }

    fn fold_vars(&self, acc: &mut Vec<Var>) {
        match self {
            Exp::Var(v) | Exp::Func(v) => acc.push(*v),
            Exp::Int(_) | Exp::Bool(_) | Exp::Label { .. } => {}
            Exp::Eq(a, b) | Exp::Dq(a, b) | Exp::And(a, b) | Exp::Add(a, b) | Exp::Sub(a, b) => {
                a.fold_vars(acc);
                b.fold_vars(acc);
            }
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Var(v) => write!(f, "{v}"),
            Exp::Int(n) => write!(f, "{n}"),
            Exp::Bool(b) => write!(f, "{b}"),
            Exp::Func(v) => write!(f, "@{}", v.0.id()),
            Exp::Label { func, block } => write!(f, "@{}.{}", func.0.id(), block.id()),
            Exp::Eq(a, b) => write!(f, "({a} = {b})"),
            Exp::Dq(a, b) => write!(f, "({a} != {b})"),
            Exp::And(a, b) => write!(f, "({a} && {b})"),
            Exp::Add(a, b) => write!(f, "({a} + {b})"),
            Exp::Sub(a, b) => write!(f, "({a} - {b})"),
        }
    }
}
