//! The reduction loop.
//!
//! A trampoline: the loop asks the current unit to execute and runs whatever
//! it returns next, so long deterministic runs never deepen the native stack.
//! Faults raised by units are handled here, not by the units themselves.

use std::sync::Arc;

use cairn_config::EngineConfig;

use crate::engine::Engine;
use crate::fault::{Fault, Signal};
use crate::unit::{Cont, Next, Succeed};

/// How a call to [`Machine::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The goal succeeded. Run again for the next solution.
    Solution,
    /// No (more) solutions.
    Exhausted,
    /// A unit requested halt with this code.
    Halted(i32),
    /// The stop check tripped. Run again to continue where it stopped.
    Stopped,
}

/// Consulted by the loop between reductions.
pub trait StopCheck: Send {
    /// Called once at the start of every `run`.
    fn begin(&mut self) {}

    fn should_stop(&mut self, engine: &Engine) -> bool;
}

/// Stops after a fixed number of reductions per `run`.
#[derive(Debug, Clone)]
pub struct StepBudget {
    limit: u64,
    used: u64,
}

impl StepBudget {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }
}

impl StopCheck for StepBudget {
    fn begin(&mut self) {
        self.used = 0;
    }

    fn should_stop(&mut self, _engine: &Engine) -> bool {
        if self.used >= self.limit {
            return true;
        }
        self.used += 1;
        false
    }
}

#[derive(Debug)]
enum Resume {
    /// Nothing started yet, or the last run ended for good.
    Idle,
    At(Cont),
    /// The last run found a solution; the next one backtracks into it.
    Backtrack,
}

/// Drives an [`Engine`] through a goal.
pub struct Machine {
    engine: Engine,
    resume: Resume,
    stop: Option<Box<dyn StopCheck>>,
    /// Reductions executed by the latest `run`.
    steps: u64,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("engine", &self.engine)
            .field("resume", &self.resume)
            .field("stop_check", &self.stop.is_some())
            .field("steps", &self.steps)
            .finish()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Machine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let stop = config
            .limits
            .max_steps
            .map(|limit| Box::new(StepBudget::new(limit)) as Box<dyn StopCheck>);
        Self {
            engine: Engine::new(config),
            resume: Resume::Idle,
            stop,
            steps: 0,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    #[must_use]
    pub fn into_engine(self) -> Engine {
        self.engine
    }

    pub fn set_stop_check(&mut self, check: Box<dyn StopCheck>) {
        self.stop = Some(check);
    }

    pub fn clear_stop_check(&mut self) {
        self.stop = None;
    }

    /// Reset the engine and load a goal.
    ///
    /// `build` receives the freshly initialized engine and the terminal
    /// continuation, and returns the first unit to run. Variables the caller
    /// wants to inspect afterwards must be created inside `build`.
    pub fn start<F>(&mut self, build: F)
    where
        F: FnOnce(&mut Engine, Cont) -> Cont,
    {
        self.engine.init();
        let goal = build(&mut self.engine, Arc::new(Succeed));
        tracing::debug!(depth = self.engine.top(), "start");
        self.resume = Resume::At(goal);
    }

    /// Run until the next solution, exhaustion, halt or stop.
    ///
    /// Uncaught faults end the run with their kind intact; the machine must
    /// be restarted afterwards.
    pub fn run(&mut self) -> Result<Outcome, Fault> {
        let mut code = match std::mem::replace(&mut self.resume, Resume::Idle) {
            Resume::Idle => return Ok(Outcome::Exhausted),
            Resume::At(code) => code,
            Resume::Backtrack => self.engine.fail(),
        };
        if let Some(stop) = self.stop.as_mut() {
            stop.begin();
        }
        self.steps = 0;

        loop {
            if let Some(stop) = self.stop.as_mut()
                && stop.should_stop(&self.engine)
            {
                tracing::debug!(depth = self.engine.top(), "stopped");
                self.resume = Resume::At(code);
                return Ok(Outcome::Stopped);
            }

            self.steps += 1;
            match code.execute(&mut self.engine) {
                Ok(Next::Run(next)) => code = next,
                Ok(Next::Succeeded) => {
                    tracing::debug!(depth = self.engine.top(), "solution");
                    self.resume = Resume::Backtrack;
                    return Ok(Outcome::Solution);
                }
                Ok(Next::Exhausted) => {
                    tracing::debug!("exhausted");
                    return Ok(Outcome::Exhausted);
                }
                Err(Signal::Halt(exit)) => {
                    tracing::debug!(code = exit, "halt");
                    self.engine.set_halt_code(exit);
                    return Ok(Outcome::Halted(exit));
                }
                Err(Signal::Fault(fault)) => {
                    let barrier = if fault.is_catchable() {
                        self.engine.pop_catcher()
                    } else {
                        None
                    };
                    let Some(barrier) = barrier else {
                        tracing::debug!(kind = %fault.kind(), error = %fault, "uncaught fault");
                        return Err(fault);
                    };
                    tracing::debug!(kind = %fault.kind(), barrier, "caught fault");
                    self.engine.raise(fault);
                    self.engine.cut(barrier);
                    code = self.engine.fail();
                }
            }
        }
    }

    /// Reductions executed by the latest [`run`](Self::run).
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run to exhaustion, collecting `extract` after every solution.
    ///
    /// Stops are resumed transparently. A stop check that trips before any
    /// reduction would never let the goal advance, so it is an internal fault.
    pub fn solutions<T, F>(&mut self, mut extract: F) -> Result<Vec<T>, Fault>
    where
        F: FnMut(&Engine) -> T,
    {
        let mut found = Vec::new();
        loop {
            match self.run()? {
                Outcome::Solution => found.push(extract(&self.engine)),
                Outcome::Exhausted | Outcome::Halted(_) => return Ok(found),
                Outcome::Stopped if self.steps == 0 => {
                    return Err(Fault::internal("stop check tripped before any reduction"));
                }
                Outcome::Stopped => {}
            }
        }
    }
}
