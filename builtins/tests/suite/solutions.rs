//! Driving the machine: solutions, resolution and stop checks.

use cairn_builtins::{HashGet, HashPut, NewHash};
use cairn_config::EngineConfig;
use cairn_core::{IntoCont, Machine, Outcome, StepBudget, Term};

use crate::common::{Call, Facts};

fn pairs() -> Facts {
    Facts::new(
        2,
        vec![
            vec![Term::atom("x"), Term::compound("f", vec![Term::int(1)])],
            vec![Term::atom("y"), Term::list([Term::int(2), Term::int(3)])],
        ],
    )
}

#[test]
fn resolve_substitutes_nested_bindings() {
    let p = pairs();
    let mut machine = Machine::default();
    let mut out = None;
    machine.start(|engine, done| {
        let (k, v) = (engine.new_var(), engine.new_var());
        let wrapped = Term::compound("pair", vec![k.clone(), v.clone()]);
        out = Some(wrapped);
        Call::new(p.entry(), vec![k, v], done).into_cont()
    });
    let wrapped = out.unwrap();
    let found = machine.solutions(|engine| engine.resolve(&wrapped)).unwrap();
    assert_eq!(
        found,
        vec![
            Term::compound(
                "pair",
                vec![Term::atom("x"), Term::compound("f", vec![Term::int(1)])]
            ),
            Term::compound(
                "pair",
                vec![Term::atom("y"), Term::list([Term::int(2), Term::int(3)])]
            ),
        ]
    );
}

#[test]
fn step_budget_stops_and_resumes() {
    let p = Facts::atoms(&["a", "b", "c", "d"]);
    let mut machine = Machine::default();
    machine.set_stop_check(Box::new(StepBudget::new(2)));
    let mut x = None;
    machine.start(|engine, done| {
        let var = engine.new_var();
        x = Some(var.clone());
        Call::new(p.entry(), vec![var], done).into_cont()
    });
    let x = x.unwrap();

    let mut outcomes = Vec::new();
    let mut answers = Vec::new();
    loop {
        match machine.run().unwrap() {
            Outcome::Solution => answers.push(machine.engine().deref(&x)),
            Outcome::Exhausted => break,
            other => outcomes.push(other),
        }
    }
    assert!(outcomes.iter().all(|o| *o == Outcome::Stopped));
    assert!(!outcomes.is_empty());
    assert_eq!(
        answers,
        vec![Term::atom("a"), Term::atom("b"), Term::atom("c"), Term::atom("d")]
    );
}

#[test]
fn configured_step_limit_installs_a_budget() {
    let config = EngineConfig::from_toml_str("[limits]\nmax_steps = 1\n").unwrap();
    let p = Facts::atoms(&["a"]);
    let mut machine = Machine::new(&config);
    machine.start(|engine, done| {
        let var = engine.new_var();
        Call::new(p.entry(), vec![var], done).into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Stopped);

    machine.clear_stop_check();
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
}

#[test]
fn registries_survive_restarts() {
    let mut machine = Machine::default();
    machine.start(|_, done| {
        let put = HashPut::new(Term::atom("memo"), Term::int(1), Term::atom("one"), done);
        NewHash::new(Term::atom("memo"), put.into_cont()).into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Solution);

    let mut out = None;
    machine.start(|engine, done| {
        let v = engine.new_var();
        out = Some(v.clone());
        HashGet::new(Term::atom("memo"), Term::int(1), v, done).into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&out.unwrap()), Term::atom("one"));
}
