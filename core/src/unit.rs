//! The execution contract.
//!
//! Compiled code is a graph of [`Unit`]s. Each unit closes over its operands
//! and the continuation to run on success; failure is not a separate return
//! path but the continuation handed back by [`Engine::fail`].

use std::fmt::Debug;
use std::sync::Arc;

use crate::engine::Engine;
use crate::fault::Signal;

pub trait Unit: Debug + Send + Sync {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal>;
}

/// A shared, immutable unit of work.
pub type Cont = Arc<dyn Unit>;

/// What the reduction loop does after a unit returns.
#[derive(Debug, Clone)]
pub enum Next {
    Run(Cont),
    /// The top-level goal has a solution.
    Succeeded,
    /// No alternatives remain.
    Exhausted,
}

/// Box any unit as a continuation.
pub trait IntoCont {
    fn into_cont(self) -> Cont;
}

impl<U: Unit + 'static> IntoCont for U {
    fn into_cont(self) -> Cont {
        Arc::new(self)
    }
}

impl From<Cont> for Next {
    fn from(cont: Cont) -> Self {
        Next::Run(cont)
    }
}

/// Terminal continuation of a top-level goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Succeed;

impl Unit for Succeed {
    fn execute(&self, _engine: &mut Engine) -> Result<Next, Signal> {
        Ok(Next::Succeeded)
    }
}

/// Alternate of the bottom sentinel frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exhausted;

impl Unit for Exhausted {
    fn execute(&self, _engine: &mut Engine) -> Result<Next, Signal> {
        Ok(Next::Exhausted)
    }
}

/// Backtrack into the newest choice point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fail;

impl Unit for Fail {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        Ok(engine.fail().into())
    }
}
