mod common;

use argus_interpreter::{
    Analyzer, BoundPolicy, Config, DiagnosticKind, Diagnostics, ExecOpts,
};
use argus_ir::{Exp, Inst, Jump, Program, ProgramBuilder, Term, Var};
use common::{kills_of, moves_of, OracleDomain};

fn run(pgm: &Program, opts: ExecOpts, dom: OracleDomain) -> Diagnostics {
    let mut analyzer = Analyzer::new(pgm, opts, dom, Diagnostics::new());
    analyzer
        .exec_pgm(&Config::with_entry_points(&["main"]))
        .expect("analysis completes");
    analyzer.into_reporter()
}

// ---------------------------------------------------------------------------
// Test 1: Mutual recursion is cut by the depth bound on retreating calls
// ---------------------------------------------------------------------------

/// `f() { g(); }`, `g() { f(); }`, both calls marked recursive. Recursive
/// frames are elided from edge identity, so the call edges retreat on the
/// same inlined location and the bound cuts the cycle after one unrolling.
#[test]
fn mutual_recursion_is_bounded() {
    let mut pb = ProgramBuilder::new();
    let g_name = pb.var("g");

    let mut f = pb.func("f");
    let f_mark = f.local("f_mark");
    let f_entry = f.reserve("entry");
    let f_ret = f.reserve("ret");
    f.set(
        f_entry,
        vec![Inst::move_(f_mark, Exp::int(1))],
        Term::call()
            .callee(Exp::func(g_name))
            .retn(Jump::to(f_ret))
            .new(),
    );
    f.set(f_ret, vec![], Term::ret(None));
    let f_name = f.finish();

    let mut g = pb.func("g");
    let g_mark = g.local("g_mark");
    let g_entry = g.reserve("entry");
    let g_ret = g.reserve("ret");
    g.set(
        g_entry,
        vec![Inst::move_(g_mark, Exp::int(1))],
        Term::call()
            .callee(Exp::func(f_name))
            .retn(Jump::to(g_ret))
            .new(),
    );
    g.set(g_ret, vec![], Term::ret(None));
    g.finish();

    let mut main = pb.func("main");
    let done = main.local("done");
    let m_entry = main.reserve("entry");
    let m_ret = main.reserve("ret");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::func(f_name))
            .retn(Jump::to(m_ret))
            .new(),
    );
    main.set(m_ret, vec![Inst::move_(done, Exp::int(1))], Term::ret(None));
    main.finish();
    let pgm = pb.finish();

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(
        &pgm,
        ExecOpts {
            bound: 1,
            ..Default::default()
        },
        dom,
    );

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, f_mark), 2);
    assert_eq!(moves_of(&log, g_mark), 1);
}

// ---------------------------------------------------------------------------
// Test 2: Recursion-site frame counting and the beyond-bound policy
// ---------------------------------------------------------------------------

/// `f` calls itself through its own name as a value, which the builder
/// cannot see, so the call edges never retreat and only the same-return-site
/// frame count cuts the recursion. With bound 1 the third push is refused.
fn self_recursive_pgm() -> (Program, Var, Var) {
    let mut pb = ProgramBuilder::new();

    let mut f = pb.func("f");
    let f_mark = f.local("f_mark");
    let f_name = f.name();
    let f_entry = f.reserve("entry");
    let f_ret = f.reserve("ret");
    f.set(
        f_entry,
        vec![Inst::move_(f_mark, Exp::int(1))],
        Term::call()
            .callee(Exp::var(f_name))
            .retn(Jump::to(f_ret))
            .new(),
    );
    f.set(f_ret, vec![], Term::ret(None));
    f.finish();

    let mut main = pb.func("main");
    let done = main.local("done");
    let m_entry = main.reserve("entry");
    let m_ret = main.reserve("ret");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::func(f_name))
            .retn(Jump::to(m_ret))
            .new(),
    );
    main.set(m_ret, vec![Inst::move_(done, Exp::int(1))], Term::ret(None));
    main.finish();
    (pb.finish(), f_mark, done)
}

#[test]
fn refused_push_with_skip_policy_ends_the_path() {
    let (pgm, f_mark, done) = self_recursive_pgm();
    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(
        &pgm,
        ExecOpts {
            bound: 1,
            ..Default::default()
        },
        dom,
    );

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, f_mark), 3, "two frames per return site, then refused");
    assert_eq!(moves_of(&log, done), 0, "skip never returns to the caller");
}

#[test]
fn refused_push_with_prune_policy_falls_through() {
    let (pgm, f_mark, done) = self_recursive_pgm();
    let dom = OracleDomain::new().with_policy(BoundPolicy::Prune);
    let log = dom.log();
    let diags = run(
        &pgm,
        ExecOpts {
            bound: 1,
            ..Default::default()
        },
        dom,
    );

    assert!(diags.is_empty());
    assert_eq!(moves_of(&log, f_mark), 3);
    assert_eq!(moves_of(&log, done), 1, "prune unwinds back to the caller");
}

// ---------------------------------------------------------------------------
// Test 3: Summary reuse
// ---------------------------------------------------------------------------

/// With summaries on, calling `f` twice with equal entry states explores
/// the body once; the second call resolves through `apply_summary`.
#[test]
fn second_call_resolves_through_summary() {
    let mut pb = ProgramBuilder::new();

    let mut f = pb.func("f");
    let f_mark = f.local("f_mark");
    let f_entry = f.reserve("entry");
    f.set(
        f_entry,
        vec![Inst::move_(f_mark, Exp::int(1))],
        Term::ret(None),
    );
    let f_name = f.finish();

    let mut main = pb.func("main");
    let done = main.local("done");
    let m_entry = main.reserve("entry");
    let r1 = main.reserve("r1");
    let r2 = main.reserve("r2");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::func(f_name))
            .retn(Jump::to(r1))
            .new(),
    );
    main.set(
        r1,
        vec![],
        Term::call()
            .callee(Exp::func(f_name))
            .retn(Jump::to(r2))
            .new(),
    );
    main.set(r2, vec![Inst::move_(done, Exp::int(1))], Term::ret(None));
    main.finish();
    let pgm = pb.finish();

    let dom = OracleDomain::new();
    let log = dom.log();
    let mut analyzer = Analyzer::new(
        &pgm,
        ExecOpts {
            function_summaries: true,
            ..Default::default()
        },
        dom,
        Diagnostics::new(),
    );
    let summaries = analyzer
        .compute_summaries(&Config::with_entry_points(&["main"]))
        .expect("analysis completes");

    assert!(analyzer.reporter().is_empty());
    assert_eq!(moves_of(&log, f_mark), 1, "body explored exactly once");
    assert_eq!(moves_of(&log, done), 1);
    assert_eq!(summaries.get(&f_name).map(Vec::len), Some(1));
    // The entry point records its own summary at the top-level return.
    let main_name = pgm.var("main").unwrap();
    assert_eq!(summaries.get(&main_name).map(Vec::len), Some(1));
}

// ---------------------------------------------------------------------------
// Test 4: Unknown and undefined callees havoc the return register
// ---------------------------------------------------------------------------

/// Calling a declared-but-undefined function reports one diagnostic, kills
/// `areturn`, and continues at the return site.
#[test]
fn undefined_callee_havocs_and_continues() {
    let mut pb = ProgramBuilder::new();
    let mystery = pb.declare("mystery", &[], Some("mystery.ret"));

    let mut main = pb.func("main");
    let r = main.local("r");
    let done = main.local("done");
    let m_entry = main.reserve("entry");
    let site = main.reserve("site");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::func(mystery))
            .areturn(r)
            .retn(Jump::to(site))
            .new(),
    );
    main.set(site, vec![Inst::move_(done, Exp::int(1))], Term::ret(None));
    main.finish();
    let pgm = pb.finish();

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(&pgm, ExecOpts::default(), dom);

    assert_eq!(diags.len(), 1);
    assert_eq!(diags.reports()[0].kind, DiagnosticKind::UnknownCall);
    assert_eq!(kills_of(&log, r), 1, "areturn is havocked");
    assert_eq!(moves_of(&log, done), 1, "control reaches the return site");
}

/// A callee expression that resolves to nothing at all takes the same
/// havoc path.
#[test]
fn unresolved_callee_havocs_and_continues() {
    let mut pb = ProgramBuilder::new();
    let mut main = pb.func("main");
    let r = main.local("r");
    let done = main.local("done");
    let m_entry = main.reserve("entry");
    let site = main.reserve("site");
    main.set(
        m_entry,
        vec![],
        Term::call()
            .callee(Exp::int(0))
            .areturn(r)
            .retn(Jump::to(site))
            .new(),
    );
    main.set(site, vec![Inst::move_(done, Exp::int(1))], Term::ret(None));
    main.finish();
    let pgm = pb.finish();

    let dom = OracleDomain::new();
    let log = dom.log();
    let diags = run(&pgm, ExecOpts::default(), dom);

    assert_eq!(diags.len(), 1);
    assert_eq!(diags.reports()[0].kind, DiagnosticKind::UnknownCall);
    assert_eq!(kills_of(&log, r), 1);
    assert_eq!(moves_of(&log, done), 1);
}
