//! catch/throw, faults raised by builtins, and halt.

use cairn_builtins::{Catch, GetException, Halt, Throw, True, Unify, goal};
use cairn_core::{
    Engine, Fail, Fault, FaultKind, IntoCont, Machine, Next, Outcome, Signal, Term, Unit,
};

use crate::common::{Call, Facts};

#[derive(Debug)]
struct Broken;

impl Unit for Broken {
    fn execute(&self, _engine: &mut Engine) -> Result<Next, Signal> {
        Err(Fault::internal("corrupt state").into())
    }
}

#[test]
fn recovery_sees_state_from_before_the_catch() {
    // catch((p(X), throw(oops)), E, true) with p leaving choice points.
    let p = Facts::atoms(&["a", "b"]);
    let mut machine = Machine::default();
    let mut seen = None;
    machine.start(|engine, done| {
        let (x, e) = (engine.new_var(), engine.new_var());
        seen = Some((x.clone(), e.clone()));
        let entry_depth = engine.top();
        let body = goal(move |_| {
            Call::new(p.entry(), vec![x.clone()], Throw::new(Term::atom("oops")).into_cont())
                .into_cont()
        });
        let check = move |k| {
            let depth = entry_depth;
            DepthIs { depth, cont: k }.into_cont()
        };
        Catch::new(body, e, goal(check), done).into_cont()
    });
    let (x, e) = seen.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert!(machine.engine().deref(&x).is_var());
    assert_eq!(machine.engine().deref(&e), Term::atom("oops"));
    assert_eq!(machine.engine().peek_catcher(), None);
    assert!(machine.engine().exception().is_none());
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}

/// Succeeds only when the choice stack is back at `depth`.
#[derive(Debug)]
struct DepthIs {
    depth: usize,
    cont: cairn_core::Cont,
}

impl Unit for DepthIs {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        if engine.top() == self.depth {
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}

#[test]
fn builtin_faults_arrive_as_iso_error_terms() {
    let mut machine = Machine::default();
    let mut seen = None;
    machine.start(|engine, done| {
        let (kind, ctx, unbound) = (engine.new_var(), engine.new_var(), engine.new_var());
        seen = Some(kind.clone());
        let catcher = Term::compound("error", vec![kind, ctx]);
        Catch::new(
            goal(move |_| Throw::new(unbound.clone()).into_cont()),
            catcher,
            goal(|k| True::new(k).into_cont()),
            done,
        )
        .into_cont()
    });
    let kind = seen.unwrap();
    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert_eq!(machine.engine().deref(&kind), Term::atom("instantiation_error"));
}

#[test]
fn inner_catch_passes_on_balls_it_does_not_match() {
    let mut machine = Machine::default();
    let mut seen = None;
    machine.start(|engine, done| {
        let (inner, outer) = (engine.new_var(), engine.new_var());
        seen = Some((inner.clone(), outer.clone()));
        let inner_catch = goal(move |k| {
            let inner = inner.clone();
            Catch::new(
                goal(|_| Throw::new(Term::compound("deep", vec![Term::int(1)])).into_cont()),
                Term::atom("shallow"),
                goal(move |k| Unify::new(inner.clone(), Term::atom("inner"), k).into_cont()),
                k,
            )
            .into_cont()
        });
        Catch::new(
            inner_catch,
            Term::compound("deep", vec![engine.new_var()]),
            goal(move |k| Unify::new(outer.clone(), Term::atom("outer"), k).into_cont()),
            done,
        )
        .into_cont()
    });
    let (inner, outer) = seen.unwrap();

    assert_eq!(machine.run().unwrap(), Outcome::Solution);
    assert!(machine.engine().deref(&inner).is_var());
    assert_eq!(machine.engine().deref(&outer), Term::atom("outer"));
    assert_eq!(machine.engine().peek_catcher(), None);
}

#[test]
fn uncaught_ball_surfaces_with_its_term() {
    let mut machine = Machine::default();
    machine.start(|_, done| {
        Catch::new(
            goal(|_| Throw::new(Term::atom("loose")).into_cont()),
            Term::atom("other"),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    let fault = machine.run().unwrap_err();
    assert_eq!(fault.kind(), FaultKind::Thrown);
    assert_eq!(fault.to_term(), Term::atom("loose"));
}

#[test]
fn failing_goal_fails_the_catch() {
    let mut machine = Machine::default();
    machine.start(|_, done| {
        Catch::new(
            goal(|_| Fail.into_cont()),
            Term::atom("oops"),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
    assert_eq!(machine.engine().peek_catcher(), None);
}

#[test]
fn internal_faults_are_not_catchable() {
    let mut machine = Machine::default();
    machine.start(|engine, done| {
        Catch::new(
            goal(|_| Broken.into_cont()),
            engine.new_var(),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    let fault = machine.run().unwrap_err();
    assert_eq!(fault.kind(), FaultKind::Internal);
    assert!(!fault.is_catchable());
}

#[test]
fn halt_bypasses_every_catch() {
    let mut machine = Machine::default();
    machine.start(|engine, done| {
        Catch::new(
            goal(|_| Halt::new(Term::int(4)).into_cont()),
            engine.new_var(),
            goal(|k| k),
            done,
        )
        .into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Halted(4));
    assert_eq!(machine.engine().halt_code(), Some(4));
}

#[test]
fn exception_slot_is_consumed_by_recovery() {
    // After recovery the slot is empty, so reading it fails.
    let mut machine = Machine::default();
    machine.start(|engine, done| {
        let seen = engine.new_var();
        let read_slot = GetException::new(seen, done);
        Catch::new(
            goal(|_| Throw::new(Term::atom("ball")).into_cont()),
            Term::atom("ball"),
            goal(|k| k),
            read_slot.into_cont(),
        )
        .into_cont()
    });
    assert_eq!(machine.run().unwrap(), Outcome::Exhausted);
}
