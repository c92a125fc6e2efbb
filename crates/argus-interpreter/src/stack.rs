use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHasher;

use argus_ir::{Call, Func, Jump};

use crate::domain::Domain;
use crate::error::ExecError;

/// Persistent model of an interprocedural call chain.
///
/// Stacks are immutable cons chains behind `Rc`, so pushing never copies
/// and every enqueued edge shares frames with its siblings. A `Call` frame
/// records how to resume the caller; a `Throw` frame records an exception
/// landing pad and always sits directly on top of the `Call` frame pushed
/// by the same [`push_call`](CallStack::push_call), never on the empty
/// stack.
///
/// Stack identity is the *inlined location*: recursive call frames are
/// elided, and the domain's `from_call` bookkeeping is ignored, so two
/// chains that differ only in where non-productive recursion was unrolled
/// are the same program point. Equality, ordering and hashing all follow
/// this notion, with a per-node rolling hash computed at push time.
pub struct CallStack<'ir, D: Domain>(Option<Rc<Frame<'ir, D>>>);

pub(crate) enum Frame<'ir, D: Domain> {
    Call(CallFrame<'ir, D>),
    Throw(ThrowFrame<'ir, D>),
}

pub(crate) struct CallFrame<'ir, D: Domain> {
    pub recursive: bool,
    /// Return site in the caller.
    pub dst: Jump,
    /// The callee this frame was pushed for; supplies the params and locals
    /// to unwind through on a throw.
    pub func: &'ir Func,
    pub from_call: D::FromCall,
    pub tail: CallStack<'ir, D>,
    inlined_hash: u64,
}

pub(crate) struct ThrowFrame<'ir, D: Domain> {
    pub handler: Jump,
    pub tail: CallStack<'ir, D>,
    inlined_hash: u64,
}

const EMPTY_HASH: u64 = 0x9e37_79b9_7f4a_7c15;

fn mix(tag: u64, block: u32, tail: u64) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(tag);
    hasher.write_u32(block);
    hasher.write_u64(tail);
    hasher.finish()
}

impl<'ir, D: Domain> CallStack<'ir, D> {
    pub fn empty() -> Self {
        CallStack(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Number of call frames (throw frames excluded).
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut cur = self;
        while let Some(frame) = cur.0.as_deref() {
            match frame {
                Frame::Call(f) => {
                    n += 1;
                    cur = &f.tail;
                }
                Frame::Throw(t) => cur = &t.tail,
            }
        }
        n
    }

    fn inlined_hash(&self) -> u64 {
        match self.0.as_deref() {
            None => EMPTY_HASH,
            Some(Frame::Call(f)) => f.inlined_hash,
            Some(Frame::Throw(t)) => t.inlined_hash,
        }
    }

    /// Push the frames for `call` resolved to `callee`.
    ///
    /// Counts the call frames already on the stack with the same return
    /// site; more than `bound` of them refuses the push — this is the
    /// recursion bound.
    pub fn push_call(
        &self,
        call: &Call,
        callee: &'ir Func,
        bound: u32,
        from_call: D::FromCall,
    ) -> Option<Self> {
        let mut same_site = 0usize;
        let mut cur = self;
        while let Some(frame) = cur.0.as_deref() {
            match frame {
                Frame::Call(f) => {
                    if f.dst == call.retn {
                        same_site += 1;
                    }
                    cur = &f.tail;
                }
                Frame::Throw(t) => cur = &t.tail,
            }
        }
        if same_site > bound as usize {
            return None;
        }

        let tail_hash = self.inlined_hash();
        let inlined_hash = if call.recursive {
            tail_hash
        } else {
            mix(1, call.retn.dst.id(), tail_hash)
        };
        let stk = CallStack(Some(Rc::new(Frame::Call(CallFrame {
            recursive: call.recursive,
            dst: call.retn,
            func: callee,
            from_call,
            tail: self.clone(),
            inlined_hash,
        }))));
        Some(match call.throw {
            Some(handler) => {
                let hash = mix(2, handler.dst.id(), stk.inlined_hash());
                CallStack(Some(Rc::new(Frame::Throw(ThrowFrame {
                    handler,
                    tail: stk,
                    inlined_hash: hash,
                }))))
            }
            None => stk,
        })
    }

    /// Pop for a normal return: discard now-dead throw frames at the top,
    /// then pop the first call frame.
    pub fn pop_return(&self) -> Option<(&D::FromCall, &Jump, CallStack<'ir, D>)> {
        let mut cur = self;
        loop {
            match cur.0.as_deref() {
                Some(Frame::Throw(t)) => cur = &t.tail,
                Some(Frame::Call(f)) => return Some((&f.from_call, &f.dst, f.tail.clone())),
                None => return None,
            }
        }
    }

    /// Pop for a throw: fold the pending call frames above the innermost
    /// throw frame through `unwind`, then pop the throw frame together with
    /// the call frame beneath it (the call that installed the handler).
    ///
    /// `None` means the exception escapes every frame. A throw frame with
    /// no call frame beneath it is a malformed stack.
    pub fn pop_throw<S>(
        &self,
        init: S,
        mut unwind: impl FnMut(&'ir Func, &D::FromCall, S) -> S,
    ) -> Result<Option<(&D::FromCall, &Jump, CallStack<'ir, D>, S)>, ExecError> {
        let mut acc = init;
        let mut cur = self;
        loop {
            match cur.0.as_deref() {
                Some(Frame::Call(f)) => {
                    acc = unwind(f.func, &f.from_call, acc);
                    cur = &f.tail;
                }
                Some(Frame::Throw(t)) => {
                    return match t.tail.0.as_deref() {
                        Some(Frame::Call(f)) => {
                            Ok(Some((&f.from_call, &t.handler, f.tail.clone(), acc)))
                        }
                        _ => Err(ExecError::MalformedStack),
                    };
                }
                None => return Ok(None),
            }
        }
    }

    /// Total order on inlined locations: recursive call frames are
    /// transparent, non-recursive call frames compare by return site then
    /// tail, throw frames by handler then tail, and the empty stack is
    /// minimal. `from_call` never participates.
    pub fn compare_inlined(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (&self.0, &other.0) {
            if Rc::ptr_eq(a, b) {
                return Ordering::Equal;
            }
        }
        match (self.0.as_deref(), other.0.as_deref()) {
            (Some(Frame::Call(f)), _) if f.recursive => f.tail.compare_inlined(other),
            (_, Some(Frame::Call(g))) if g.recursive => self.compare_inlined(&g.tail),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(Frame::Call(f)), Some(Frame::Call(g))) => f
                .dst
                .cmp(&g.dst)
                .then_with(|| f.tail.compare_inlined(&g.tail)),
            (Some(Frame::Call(_)), Some(Frame::Throw(_))) => Ordering::Less,
            (Some(Frame::Throw(_)), Some(Frame::Call(_))) => Ordering::Greater,
            (Some(Frame::Throw(t)), Some(Frame::Throw(u))) => t
                .handler
                .cmp(&u.handler)
                .then_with(|| t.tail.compare_inlined(&u.tail)),
        }
    }
}

impl<'ir, D: Domain> Clone for CallStack<'ir, D> {
    fn clone(&self) -> Self {
        CallStack(self.0.clone())
    }
}

impl<'ir, D: Domain> PartialEq for CallStack<'ir, D> {
    fn eq(&self, other: &Self) -> bool {
        self.compare_inlined(other) == Ordering::Equal
    }
}

impl<'ir, D: Domain> Eq for CallStack<'ir, D> {}

impl<'ir, D: Domain> PartialOrd for CallStack<'ir, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare_inlined(other))
    }
}

impl<'ir, D: Domain> Ord for CallStack<'ir, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_inlined(other)
    }
}

impl<'ir, D: Domain> Hash for CallStack<'ir, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inlined_hash());
    }
}

impl<'ir, D: Domain> fmt::Debug for CallStack<'ir, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut cur = self;
        let mut first = true;
        while let Some(frame) = cur.0.as_deref() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match frame {
                Frame::Call(c) => {
                    let rec = if c.recursive { "rec " } else { "" };
                    write!(f, "call({rec}b{})", c.dst.dst.id())?;
                    cur = &c.tail;
                }
                Frame::Throw(t) => {
                    write!(f, "throw(b{})", t.handler.dst.id())?;
                    cur = &t.tail;
                }
            }
        }
        write!(f, "]")
    }
}
