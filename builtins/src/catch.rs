//! `catch(Goal, Catcher, Recovery)`.
//!
//! Entering a catch pushes a choice point whose alternate is the recovery
//! path, then pushes that frame's index as a catcher barrier. When a fault
//! reaches the reduction loop, the loop pops the barrier, records the ball in
//! the exception slot, cuts back to the catch frame and fails into it.
//!
//! The recovery path also runs when `Goal` simply fails; it tells the two
//! apart by whether the exception slot is set.

use std::fmt;

use cairn_core::{Cont, Engine, IntoCont, Next, Signal, Term, Unit};

use crate::Goal;

pub struct Catch {
    goal: Goal,
    catcher: Term,
    recovery: Goal,
    cont: Cont,
}

impl Catch {
    #[must_use]
    pub fn new(goal: Goal, catcher: Term, recovery: Goal, cont: Cont) -> Self {
        Self {
            goal,
            catcher,
            recovery,
            cont,
        }
    }
}

impl fmt::Debug for Catch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catch")
            .field("catcher", &self.catcher)
            .finish_non_exhaustive()
    }
}

impl Unit for Catch {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let barrier = engine.top() + 1;
        let caller_b0 = engine.b0();
        let recovery = Recovery {
            barrier,
            catcher: self.catcher.clone(),
            recovery: self.recovery.clone(),
            cont: self.cont.clone(),
        };
        let exit = ExitCatch {
            barrier,
            caller_b0,
            cont: self.cont.clone(),
        };
        let body = (self.goal)(exit.into_cont());
        let body = engine.try_alternative(0, body, recovery.into_cont())?;
        engine.push_catcher(barrier);
        // The goal is opaque to cut.
        engine.set_b0();
        Ok(body.into())
    }
}

/// Runs after `Goal` succeeds.
#[derive(Debug)]
struct ExitCatch {
    barrier: usize,
    caller_b0: usize,
    cont: Cont,
}

impl Unit for ExitCatch {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        if engine.peek_catcher() == Some(self.barrier) {
            engine.pop_catcher();
        }
        if engine.top() == self.barrier {
            // Deterministic exit: the recovery frame is no longer needed.
            engine.cut(self.barrier - 1);
            engine.restore_b0(self.caller_b0);
            return Ok(self.cont.clone().into());
        }
        engine.restore_b0(self.caller_b0);
        if engine.top() > self.barrier {
            // The goal left choice points; backtracking into them must see
            // the barrier again.
            let reinstall = Reinstall {
                barrier: self.barrier,
            };
            return Ok(engine
                .try_alternative(0, self.cont.clone(), reinstall.into_cont())?
                .into());
        }
        Ok(self.cont.clone().into())
    }
}

#[derive(Debug)]
struct Reinstall {
    barrier: usize,
}

impl Unit for Reinstall {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.trust_me()?;
        engine.push_catcher(self.barrier);
        Ok(engine.fail().into())
    }
}

/// Alternate of the catch frame.
struct Recovery {
    barrier: usize,
    catcher: Term,
    recovery: Goal,
    cont: Cont,
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("barrier", &self.barrier)
            .field("catcher", &self.catcher)
            .finish_non_exhaustive()
    }
}

impl Unit for Recovery {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.trust_me()?;
        let Some((ball, fault)) = engine.take_raised() else {
            // Plain failure of the goal.
            if engine.peek_catcher() == Some(self.barrier) {
                engine.pop_catcher();
            }
            return Ok(engine.fail().into());
        };
        let mark = engine.trail_mark();
        if engine.unify(&self.catcher, &ball) {
            tracing::debug!(ball = %engine.resolve(&ball), barrier = self.barrier, "recovering");
            return Ok((self.recovery)(self.cont.clone()).into());
        }
        engine.unwind_trail(mark);
        Err(fault.into())
    }
}
