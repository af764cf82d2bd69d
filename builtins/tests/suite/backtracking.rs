//! Choice points, the trail and backtracking.

use std::sync::Arc;

use cairn_builtins::{Or, Unify, goal};
use cairn_core::{Engine, IntoCont, Machine, Outcome, Term};

use crate::common::{Call, Facts, Rule};

#[test]
fn facts_enumerate_in_order() {
    let p = Facts::atoms(&["a", "b", "c"]);
    let mut machine = Machine::default();
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        Call::new(p.entry(), vec![var], done).into_cont()
    });
    let x = x.unwrap();
    let found = machine.solutions(|engine| engine.deref(&x)).unwrap();
    assert_eq!(found, vec![Term::atom("a"), Term::atom("b"), Term::atom("c")]);
}

#[test]
fn last_alternative_is_trusted_away() {
    let p = Facts::atoms(&["a", "b", "c"]);
    let mut machine = Machine::default();
    machine.start(|engine, done| {
        let var = engine.new_var();
        Call::new(p.entry(), vec![var], done).into_cont()
    });

    let mut depths = Vec::new();
    while machine.run().unwrap() == Outcome::Solution {
        depths.push(machine.engine().top());
    }
    // The predicate's frame survives the first two answers only.
    assert_eq!(depths, vec![2, 2, 1]);
}

#[test]
fn conjunction_joins_on_shared_variable() {
    let p = Facts::atoms(&["a", "b", "c"]);
    let q = Facts::atoms(&["b", "c", "d"]);
    let mut machine = Machine::default();
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        let second = Call::new(q.entry(), vec![var.clone()], done);
        Call::new(p.entry(), vec![var], second.into_cont()).into_cont()
    });
    let x = x.unwrap();
    let found = machine.solutions(|engine| engine.deref(&x)).unwrap();
    assert_eq!(found, vec![Term::atom("b"), Term::atom("c")]);
}

#[test]
fn rule_calls_body_goals_in_order() {
    // a(X) :- b(X), c.
    let b = Facts::new(1, vec![vec![Term::int(1)], vec![Term::int(2)]]);
    let c = Facts::new(0, vec![vec![]]);
    let a = Rule::new(1, move |_, args, cont| {
        let then_c = Call::new(c.entry(), vec![], cont);
        Call::new(b.entry(), vec![args[0].clone()], then_c.into_cont()).into_cont()
    });

    let mut machine = Machine::default();
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        Call::new(a.entry(), vec![var], done).into_cont()
    });
    let x = x.unwrap();
    let found = machine.solutions(|engine| engine.deref(&x)).unwrap();
    assert_eq!(found, vec![Term::int(1), Term::int(2)]);
}

#[test]
fn transitive_bindings_are_undone_on_backtrack() {
    let mut machine = Machine::default();
    let mut vars = None;
    machine.start(|engine, done| {
        let (x, y, z) = (engine.new_var(), engine.new_var(), engine.new_var());
        vars = Some((x.clone(), y.clone(), z.clone()));
        Or::new(
            goal(move |k| {
                let last = Unify::new(z.clone(), Term::atom("a"), k);
                let middle = Unify::new(y.clone(), z.clone(), last.into_cont());
                Unify::new(x.clone(), y.clone(), middle.into_cont()).into_cont()
            }),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    let (x, y, z) = vars.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    for var in [&x, &y, &z] {
        assert_eq!(machine.engine().deref(var), Term::atom("a"));
    }

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    for var in [&x, &y, &z] {
        assert!(machine.engine().deref(var).is_var());
    }
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}

#[test]
fn arguments_are_restored_for_each_alternative() {
    // Every clause sees the caller's original register contents, even though
    // the first clause bound the argument.
    let p = Facts::new(
        2,
        vec![
            vec![Term::atom("a"), Term::int(1)],
            vec![Term::atom("b"), Term::int(2)],
        ],
    );
    let mut machine = Machine::default();
    let mut out = None;
    machine.start(|engine, done| {
        let (k, v) = (engine.new_var(), engine.new_var());
        out = Some((k.clone(), v.clone()));
        Call::new(p.entry(), vec![k, v], done).into_cont()
    });
    let (k, v) = out.unwrap();
    let found = machine
        .solutions(|engine: &Engine| (engine.deref(&k), engine.deref(&v)))
        .unwrap();
    assert_eq!(
        found,
        vec![
            (Term::atom("a"), Term::int(1)),
            (Term::atom("b"), Term::int(2)),
        ]
    );
}

#[test]
fn copy_renames_variables_consistently() {
    let mut engine = Engine::default();
    let (x, y) = (engine.new_var(), engine.new_var());
    let original = Term::compound("f", vec![x.clone(), x.clone(), y.clone(), Term::atom("k")]);
    let copy = engine.copy(&original);

    let (Term::Compound(orig), Term::Compound(fresh)) = (&original, &copy) else {
        panic!("copy changed shape: {copy}");
    };
    let args = fresh.args();
    assert_eq!(args[0], args[1]);
    assert_ne!(args[0], x);
    assert_ne!(args[0], args[2]);
    assert_eq!(args[3], orig.args()[3]);

    assert!(engine.unify(&args[0], &Term::int(1)));
    assert_eq!(engine.deref(&args[1]), Term::int(1));
    assert!(engine.deref(&x).is_var());
}

#[test]
fn ground_copy_shares_structure() {
    let mut engine = Engine::default();
    let ground = Term::compound("point", vec![Term::int(1), Term::int(2)]);
    let copy = engine.copy(&ground);
    let (Term::Compound(a), Term::Compound(b)) = (&ground, &copy) else {
        panic!("copy changed shape");
    };
    assert!(Arc::ptr_eq(a, b));
}
