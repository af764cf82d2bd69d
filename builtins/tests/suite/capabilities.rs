//! Capability switches, from configuration down to the builtins.

use cairn_builtins::{Catch, MakeDirectory, Open, StreamTable, goal};
use cairn_config::EngineConfig;
use cairn_core::{Capability, Engine, FaultKind, IntoCont, Machine, Outcome, Term};

fn config_without(section: &str) -> EngineConfig {
    EngineConfig::from_toml_str(&format!("[capabilities]\n{section} = false\n")).unwrap()
}

#[test]
fn disabled_filesystem_refuses_open_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("data.txt");
    let source = Term::atom(target.display().to_string());

    let mut machine = Machine::new(&config_without("filesystem"));
    assert!(!machine.engine().is_enabled(Capability::Filesystem));
    machine.start(|engine, done| {
        let stream = engine.new_var();
        Open::new(source, Term::atom("write"), stream, Term::nil(), done).into_cont()
    });
    let fault = machine.run().unwrap_err();

    assert_eq!(fault.kind(), FaultKind::Permission);
    assert_eq!(fault.capability(), Some(Capability::Filesystem));
    assert!(fault.to_string().contains("filesystem"));
    assert!(!target.exists());
    let table = StreamTable::of(machine.engine_mut()).unwrap();
    assert!(table.is_empty().unwrap());
}

#[test]
fn capability_fault_is_catchable() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sub");
    let source = Term::atom(target.display().to_string());

    let mut machine = Machine::new(&config_without("filesystem"));
    machine.start(|engine, done| {
        let culprit = engine.new_var();
        let catcher = Term::compound(
            "error",
            vec![
                Term::compound(
                    "permission_error",
                    vec![Term::atom("use"), Term::atom("filesystem"), culprit],
                ),
                engine.new_var(),
            ],
        );
        Catch::new(
            goal(move |k| MakeDirectory::new(source.clone(), k).into_cont()),
            catcher,
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert!(!target.exists());
}

#[test]
fn capability_fault_keeps_its_kind_through_a_non_matching_catch() {
    let dir = tempfile::tempdir().unwrap();
    let source = Term::atom(dir.path().join("data.txt").display().to_string());

    let mut machine = Machine::new(&config_without("filesystem"));
    machine.start(|engine, done| {
        let stream = engine.new_var();
        Catch::new(
            goal(move |k| {
                Open::new(
                    source.clone(),
                    Term::atom("write"),
                    stream.clone(),
                    Term::nil(),
                    k,
                )
                .into_cont()
            }),
            Term::atom("unrelated"),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    let fault = machine.run().unwrap_err();

    assert_eq!(fault.kind(), FaultKind::Permission);
    assert_eq!(fault.capability(), Some(Capability::Filesystem));
    assert_eq!(machine.engine().peek_catcher(), None);
}

#[test]
fn toggling_at_runtime_takes_effect_on_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("later");

    let mut machine = Machine::default();
    machine.engine_mut().set_enabled(Capability::Filesystem, false);
    let source = Term::atom(target.display().to_string());
    machine.start(|_, done| MakeDirectory::new(source, done).into_cont());
    assert!(machine.run().is_err());

    machine.engine_mut().set_enabled(Capability::Filesystem, true);
    let source = Term::atom(target.display().to_string());
    machine.start(|_, done| MakeDirectory::new(source, done).into_cont());
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert!(target.is_dir());
}

#[test]
fn statistics_capability_gates_runtime() {
    let mut engine = Engine::new(&config_without("statistics"));
    let fault = engine.runtime().unwrap_err();
    assert_eq!(fault.capability(), Some(Capability::Statistics));

    let mut engine = Engine::default();
    let (total, since_last) = engine.runtime().unwrap();
    assert!(since_last <= total);
    let (total_again, _) = engine.runtime().unwrap();
    assert!(total_again >= total);
}
