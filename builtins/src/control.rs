//! Control constructs: unification, cut, disjunction, halt, throw and the
//! exception slot.

use std::fmt;

use cairn_core::{Cont, Engine, Fault, IntoCont, Next, Signal, Term, Unit};

use crate::Goal;
use crate::args::Site;

const HALT: Site = Site::new("halt", 1);
const THROW: Site = Site::new("throw", 1);

/// `Left = Right`.
#[derive(Debug)]
pub struct Unify {
    left: Term,
    right: Term,
    cont: Cont,
}

impl Unify {
    #[must_use]
    pub fn new(left: Term, right: Term, cont: Cont) -> Self {
        Self { left, right, cont }
    }
}

impl Unit for Unify {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        if engine.unify(&self.left, &self.right) {
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}

/// `true`.
#[derive(Debug)]
pub struct True {
    cont: Cont,
}

impl True {
    #[must_use]
    pub fn new(cont: Cont) -> Self {
        Self { cont }
    }
}

impl Unit for True {
    fn execute(&self, _engine: &mut Engine) -> Result<Next, Signal> {
        Ok(self.cont.clone().into())
    }
}

/// Cut back to a level captured earlier with [`Engine::top`] or
/// [`Engine::b0`].
#[derive(Debug)]
pub struct CutTo {
    level: usize,
    cont: Cont,
}

impl CutTo {
    #[must_use]
    pub fn new(level: usize, cont: Cont) -> Self {
        Self { level, cont }
    }
}

impl Unit for CutTo {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.cut(self.level);
        Ok(self.cont.clone().into())
    }
}

/// Set B0 to the current top, as on entry to a predicate.
#[derive(Debug)]
pub struct SetB0 {
    cont: Cont,
}

impl SetB0 {
    #[must_use]
    pub fn new(cont: Cont) -> Self {
        Self { cont }
    }
}

impl Unit for SetB0 {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.set_b0();
        Ok(self.cont.clone().into())
    }
}

/// `!` in a clause body: cut back to B0.
#[derive(Debug)]
pub struct NeckCut {
    cont: Cont,
}

impl NeckCut {
    #[must_use]
    pub fn new(cont: Cont) -> Self {
        Self { cont }
    }
}

impl Unit for NeckCut {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.neck_cut();
        Ok(self.cont.clone().into())
    }
}

/// `(Left ; Right)`.
pub struct Or {
    left: Goal,
    right: Goal,
    cont: Cont,
}

impl Or {
    #[must_use]
    pub fn new(left: Goal, right: Goal, cont: Cont) -> Self {
        Self { left, right, cont }
    }
}

impl fmt::Debug for Or {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Or").finish_non_exhaustive()
    }
}

impl Unit for Or {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let first = (self.left)(self.cont.clone());
        let second = OrElse {
            right: (self.right)(self.cont.clone()),
        };
        Ok(engine.try_alternative(0, first, second.into_cont())?.into())
    }
}

#[derive(Debug)]
struct OrElse {
    right: Cont,
}

impl Unit for OrElse {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        Ok(engine.trust(self.right.clone())?.into())
    }
}

/// `halt(Code)`: record the code and stop the loop, bypassing every catch.
#[derive(Debug)]
pub struct Halt {
    code: Term,
}

impl Halt {
    #[must_use]
    pub fn new(code: Term) -> Self {
        Self { code }
    }
}

impl Unit for Halt {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let code = match HALT.bound(engine, &self.code, 1)? {
            Term::Int(code) => i32::try_from(code)
                .map_err(|_| HALT.at(1, Fault::domain("exit_code", Term::int(code))))?,
            other => return Err(HALT.at(1, Fault::type_error("integer", other)).into()),
        };
        engine.set_halt_code(code);
        Err(Signal::Halt(code))
    }
}

/// `throw(Ball)`.
#[derive(Debug)]
pub struct Throw {
    ball: Term,
}

impl Throw {
    #[must_use]
    pub fn new(ball: Term) -> Self {
        Self { ball }
    }
}

impl Unit for Throw {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        THROW.bound(engine, &self.ball, 1)?;
        Err(Fault::Thrown(engine.resolve(&self.ball)).into())
    }
}

/// Store a copy of `Ball` in the exception slot.
#[derive(Debug)]
pub struct SetException {
    ball: Term,
    cont: Cont,
}

impl SetException {
    #[must_use]
    pub fn new(ball: Term, cont: Cont) -> Self {
        Self { ball, cont }
    }
}

impl Unit for SetException {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let ball = engine.copy(&self.ball);
        engine.set_exception(Some(ball));
        Ok(self.cont.clone().into())
    }
}

/// Unify `Ball` with the pending exception; fails when there is none.
#[derive(Debug)]
pub struct GetException {
    ball: Term,
    cont: Cont,
}

impl GetException {
    #[must_use]
    pub fn new(ball: Term, cont: Cont) -> Self {
        Self { ball, cont }
    }
}

impl Unit for GetException {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let Some(pending) = engine.exception().cloned() else {
            return Ok(engine.fail().into());
        };
        if engine.unify(&self.ball, &pending) {
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}
