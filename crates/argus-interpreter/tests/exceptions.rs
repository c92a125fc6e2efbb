mod common;

use argus_interpreter::{Analyzer, Config, Diagnostics, ExecOpts};
use argus_ir::{Exp, Inst, Jump, Program, ProgramBuilder, Term, Var};
use common::{moves_of, OracleDomain};

fn run(pgm: &Program, opts: ExecOpts, dom: OracleDomain) -> Diagnostics {
    let mut analyzer = Analyzer::new(pgm, opts, dom, Diagnostics::new());
    analyzer
        .exec_pgm(&Config::with_entry_points(&["main"]))
        .expect("analysis completes");
    analyzer.into_reporter()
}

struct ThrowPgm {
    pgm: Program,
    thrower: Var,
    h_mark: Var,
    m_mark: Var,
}

/// `main { call thrower() -> mret, unwind handler }` where `thrower`
/// throws `42`. With `catch` off, the call has no landing pad.
fn throwing_pgm(catch: bool) -> ThrowPgm {
    let mut pb = ProgramBuilder::new();

    let mut thrower = pb.func("thrower");
    let t_entry = thrower.reserve("entry");
    thrower.set(t_entry, vec![], Term::throw(Exp::int(42)));
    let thrower_name = thrower.finish();

    let mut main = pb.func("main");
    let h_mark = main.local("h_mark");
    let m_mark = main.local("m_mark");
    let m_entry = main.reserve("entry");
    let m_ret = main.reserve("ret");
    let handler = main.reserve("handler");
    let call = Term::call()
        .callee(Exp::func(thrower_name))
        .retn(Jump::to(m_ret))
        .maybe_throw(catch.then(|| Jump::to(handler)))
        .new();
    main.set(m_entry, vec![], call);
    main.set(m_ret, vec![Inst::move_(m_mark, Exp::int(1))], Term::ret(None));
    main.set(
        handler,
        vec![Inst::move_(h_mark, Exp::int(1))],
        Term::ret(None),
    );
    main.finish();

    ThrowPgm {
        pgm: pb.finish(),
        thrower: thrower_name,
        h_mark,
        m_mark,
    }
}

// ---------------------------------------------------------------------------
// Test 1: Exception unwinding reaches the landing pad
// ---------------------------------------------------------------------------

#[test]
fn throw_unwinds_to_handler() {
    let t = throwing_pgm(true);
    let fthrow = t.pgm.function(t.thrower).unwrap().fthrow;

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(&t.pgm, ExecOpts::default(), dom);

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, t.h_mark), 1, "handler is reached");
    assert_eq!(moves_of(&log, t.m_mark), 0, "the normal return site is not");
    assert_eq!(
        moves_of(&log, fthrow),
        1,
        "the exception value is bound to fthrow"
    );
}

// ---------------------------------------------------------------------------
// Test 2: skip_throw turns throws into no-ops
// ---------------------------------------------------------------------------

#[test]
fn skip_throw_drops_the_exception() {
    let t = throwing_pgm(true);
    let fthrow = t.pgm.function(t.thrower).unwrap().fthrow;

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(
        &t.pgm,
        ExecOpts {
            skip_throw: true,
            ..Default::default()
        },
        dom,
    );

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, t.h_mark), 0);
    assert_eq!(moves_of(&log, t.m_mark), 0);
    assert_eq!(moves_of(&log, fthrow), 0);
}

// ---------------------------------------------------------------------------
// Test 3: An exception with no handler escapes silently
// ---------------------------------------------------------------------------

#[test]
fn uncaught_throw_escapes_all_frames() {
    let t = throwing_pgm(false);

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(&t.pgm, ExecOpts::default(), dom);

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, t.h_mark), 0);
    assert_eq!(moves_of(&log, t.m_mark), 0);
}

// ---------------------------------------------------------------------------
// Test 4: Unwinding folds through the frames between thrower and handler
// ---------------------------------------------------------------------------

/// `main` calls `mid` under a handler; `mid` calls `thrower` with no
/// handler of its own. The throw unwinds `thrower`'s pending frame and
/// lands in `main`'s handler, never at either normal return site.
#[test]
fn throw_unwinds_through_intermediate_frames() {
    let mut pb = ProgramBuilder::new();

    let mut thrower = pb.func("thrower");
    let t_entry = thrower.reserve("entry");
    thrower.set(t_entry, vec![], Term::throw(Exp::int(7)));
    let thrower_name = thrower.finish();

    let mut mid = pb.func("mid");
    let mid_mark = mid.local("mid_mark");
    let mid_entry = mid.reserve("entry");
    let mid_ret = mid.reserve("ret");
    mid.set(
        mid_entry,
        vec![],
        Term::call()
            .callee(Exp::func(thrower_name))
            .retn(Jump::to(mid_ret))
            .new(),
    );
    mid.set(
        mid_ret,
        vec![Inst::move_(mid_mark, Exp::int(1))],
        Term::ret(None),
    );
    let mid_name = mid.finish();

    let mut main = pb.func("main");
    let h_mark = main.local("h_mark");
    let m_mark = main.local("m_mark");
    let m_entry = main.reserve("entry");
    let m_ret = main.reserve("ret");
    let handler = main.reserve("handler");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::func(mid_name))
            .retn(Jump::to(m_ret))
            .throw(Jump::to(handler))
            .new(),
    );
    main.set(m_ret, vec![Inst::move_(m_mark, Exp::int(1))], Term::ret(None));
    main.set(
        handler,
        vec![Inst::move_(h_mark, Exp::int(1))],
        Term::ret(None),
    );
    main.finish();
    let pgm = pb.finish();

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(&pgm, ExecOpts::default(), dom);

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, h_mark), 1);
    assert_eq!(moves_of(&log, m_mark), 0);
    assert_eq!(moves_of(&log, mid_mark), 0);
}
