//! Cut: committing to choices and the bindings that survive it.

use cairn_builtins::{CutTo, Or, Unify, goal};
use cairn_core::{Engine, IntoCont, Machine, Outcome, Term};

use crate::common::{Call, Facts, Rule};

/// `first(X) :- p(X), !.`
fn first_of(p: Facts) -> Rule {
    Rule::new(1, move |engine, args, cont| {
        let level = engine.b0();
        let commit = CutTo::new(level, cont);
        Call::new(p.entry(), vec![args[0].clone()], commit.into_cont()).into_cont()
    })
}

#[test]
fn cut_after_call_commits_to_first_answer() {
    let first = first_of(Facts::atoms(&["a", "b", "c"]));
    let mut machine = Machine::default();
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        Call::new(first.entry(), vec![var], done).into_cont()
    });
    let x = x.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&x), Term::atom("a"));
    assert_eq!(machine.engine().top(), 1);
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}

#[test]
fn cut_is_local_to_its_predicate() {
    // q(X) :- first(X) ; X = z.
    let first = first_of(Facts::atoms(&["a", "b"]));
    let q = Rule::new(1, move |_, args, cont| {
        let (left, right) = (args[0].clone(), args[0].clone());
        let first = first.clone();
        Or::new(
            goal(move |k| Call::new(first.entry(), vec![left.clone()], k).into_cont()),
            goal(move |k| Unify::new(right.clone(), Term::atom("z"), k).into_cont()),
            cont,
        )
        .into_cont()
    });

    let mut machine = Machine::default();
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        Call::new(q.entry(), vec![var], done).into_cont()
    });
    let x = x.unwrap();
    let found = machine.solutions(|engine| engine.deref(&x)).unwrap();
    assert_eq!(found, vec![Term::atom("a"), Term::atom("z")]);
}

#[test]
fn cut_to_captured_top_removes_exactly_newer_frames() {
    let p = Facts::atoms(&["a", "b"]);
    let q = Facts::atoms(&["c", "d"]);
    let mut machine = Machine::default();
    let mut seen = None;
    machine.start(|engine, done| {
        let (x, y) = (engine.new_var(), engine.new_var());
        seen = Some((x.clone(), y.clone()));
        let inner = Rule::new(0, move |engine: &mut Engine, _, cont| {
            let level = engine.top();
            let commit = CutTo::new(level, cont);
            Call::new(q.entry(), vec![y.clone()], commit.into_cont()).into_cont()
        });
        let then_inner = Call::new(inner.entry(), vec![], done);
        Call::new(p.entry(), vec![x], then_inner.into_cont()).into_cont()
    });
    let (x, y) = seen.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    // p's frame is still there; q's is gone.
    assert_eq!(machine.engine().top(), 2);
    assert_eq!(machine.engine().deref(&x), Term::atom("a"));
    assert_eq!(machine.engine().deref(&y), Term::atom("c"));

    // Backtracking skips q's other answer and goes straight to p.
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&x), Term::atom("b"));
    assert_eq!(machine.engine().deref(&y), Term::atom("c"));
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}

#[test]
fn bindings_made_before_a_cut_are_undone_by_older_frames() {
    // (p(Y), !, X = 1 ; X = 2), where the cut only removes p's frame.
    let p = Facts::atoms(&["a", "b"]);
    let mut machine = Machine::default();
    let mut seen = None;
    machine.start(|engine, done| {
        let (x, y) = (engine.new_var(), engine.new_var());
        seen = Some((x.clone(), y.clone()));
        let (x1, x2) = (x.clone(), x);
        Or::new(
            goal(move |k| {
                let p = p.clone();
                let (x1, y) = (x1.clone(), y.clone());
                let body = Rule::new(0, move |engine: &mut Engine, _, cont| {
                    let level = engine.top();
                    let bind = Unify::new(x1.clone(), Term::int(1), cont);
                    let commit = CutTo::new(level, bind.into_cont());
                    Call::new(p.entry(), vec![y.clone()], commit.into_cont()).into_cont()
                });
                Call::new(body.entry(), vec![], k).into_cont()
            }),
            goal(move |k| Unify::new(x2.clone(), Term::int(2), k).into_cont()),
            done,
        )
        .into_cont()
    });
    let (x, y) = seen.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&x), Term::int(1));
    assert_eq!(machine.engine().deref(&y), Term::atom("a"));
    assert_eq!(machine.engine().top(), 2);

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&x), Term::int(2));
    assert!(machine.engine().deref(&y).is_var());
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}

#[test]
fn cut_never_removes_the_sentinel() {
    let mut engine = Engine::default();
    engine.cut(0);
    assert_eq!(engine.top(), 1);
    let alt = engine.fail();
    let mut machine = Machine::default();
    machine.start(|_, _| alt);
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}
