//! The engine: all mutable state of one reduction stream.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cairn_config::EngineConfig;
use cairn_types::{Capabilities, Capability, HostValue, Term, VarId};

use crate::choice::{ChoiceStack, Frame};
use crate::fault::Fault;
use crate::registers::Registers;
use crate::store::BindingStore;
use crate::trail::{Revert, Trail, TrailMark};
use crate::unify;
use crate::unit::{Cont, Exhausted};

#[derive(Debug, Clone, Copy)]
struct RuntimeClock {
    started: Instant,
    last: Instant,
}

/// Registers, bindings, trail and choice points for one reduction stream.
///
/// An engine is driven by exactly one [`Machine`](crate::Machine) at a time.
/// Independent engines share nothing unless they are handed the same host
/// values through [`Engine::set_external_data`].
pub struct Engine {
    registers: Registers,
    store: BindingStore,
    trail: Trail,
    choices: ChoiceStack,
    b0: usize,
    catchers: Vec<usize>,
    catcher_capacity: usize,
    exception: Option<Term>,
    /// The fault behind `exception`, when the loop raised it.
    raised: Option<Fault>,
    halt: Option<i32>,
    capabilities: Capabilities,
    external: HashMap<String, HostValue>,
    clock: Option<RuntimeClock>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("depth", &self.choices.top())
            .field("trail", &self.trail.len())
            .field("b0", &self.b0)
            .field("catchers", &self.catchers)
            .field("vars", &self.store.len())
            .field("exception", &self.exception)
            .field("raised", &self.raised.as_ref().map(Fault::kind))
            .field("halt", &self.halt)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let mut engine = Self {
            registers: Registers::new(config.engine.max_arity),
            store: BindingStore::default(),
            trail: Trail::new(config.engine.trail_elision),
            choices: ChoiceStack::default(),
            b0: 0,
            catchers: Vec::with_capacity(config.engine.catcher_capacity),
            catcher_capacity: config.engine.catcher_capacity,
            exception: None,
            raised: None,
            halt: None,
            capabilities: config.capabilities.enabled(),
            external: HashMap::new(),
            clock: None,
        };
        engine.init();
        engine
    }

    /// Reset to a fresh state: empty stacks, a single sentinel frame whose
    /// alternate reports exhaustion, no exception and no halt code.
    ///
    /// Capabilities and external data survive.
    pub fn init(&mut self) {
        self.registers.reset();
        self.store.clear();
        self.trail.clear();
        self.choices.clear();
        self.catchers.clear();
        self.catchers.shrink_to(self.catcher_capacity);
        self.exception = None;
        self.raised = None;
        self.halt = None;

        let stamp = self.choices.tick();
        self.trail.set_stamp(stamp);
        self.choices.push(Frame {
            regs: smallvec::SmallVec::new(),
            cont: Arc::clone(self.registers.cont()),
            alt: Arc::new(Exhausted),
            mark: self.trail.mark(),
            b0: 0,
            stamp,
        });
        self.b0 = self.choices.top();

        self.clock = self.capabilities.contains(Capability::Statistics).then(|| {
            let now = Instant::now();
            RuntimeClock {
                started: now,
                last: now,
            }
        });
    }

    // ------------------------------------------------------------------
    // Registers
    // ------------------------------------------------------------------

    pub fn reg(&self, index: usize) -> Result<&Term, Fault> {
        self.registers.get(index).ok_or_else(|| {
            Fault::internal(format!(
                "register {index} out of range (max_arity {})",
                self.registers.max_arity()
            ))
        })
    }

    pub fn set_reg(&mut self, index: usize, value: Term) -> Result<(), Fault> {
        if self.registers.set(index, value) {
            Ok(())
        } else {
            Err(Fault::internal(format!(
                "register {index} out of range (max_arity {})",
                self.registers.max_arity()
            )))
        }
    }

    /// Load `args` into registers `0..args.len()`.
    pub fn set_args(&mut self, args: &[Term]) -> Result<(), Fault> {
        for (index, arg) in args.iter().enumerate() {
            self.set_reg(index, arg.clone())?;
        }
        Ok(())
    }

    #[must_use]
    pub fn max_arity(&self) -> usize {
        self.registers.max_arity()
    }

    #[must_use]
    pub fn cont(&self) -> &Cont {
        self.registers.cont()
    }

    pub fn set_cont(&mut self, cont: Cont) {
        self.registers.set_cont(cont);
    }

    // ------------------------------------------------------------------
    // Terms
    // ------------------------------------------------------------------

    /// A fresh unbound variable.
    pub fn new_var(&mut self) -> Term {
        Term::Var(self.store.fresh(self.trail.stamp()))
    }

    #[must_use]
    pub fn deref(&self, term: &Term) -> Term {
        self.store.deref(term)
    }

    #[must_use]
    pub fn is_bound(&self, var: VarId) -> bool {
        self.store.binding(var).is_some()
    }

    /// Unify two terms. On failure, bindings made before the mismatch stay
    /// until the caller backtracks or unwinds.
    pub fn unify(&mut self, a: &Term, b: &Term) -> bool {
        unify::unify(&mut self.store, &mut self.trail, a, b)
    }

    #[must_use]
    pub fn compare(&self, a: &Term, b: &Term) -> Ordering {
        unify::compare(&self.store, a, b)
    }

    /// Copy a term with fresh variables; ground terms come back as is.
    pub fn copy(&mut self, term: &Term) -> Term {
        let stamp = self.trail.stamp();
        unify::copy(&mut self.store, stamp, term)
    }

    /// The term with every bound variable substituted.
    #[must_use]
    pub fn resolve(&self, term: &Term) -> Term {
        unify::resolve(&self.store, term)
    }

    // ------------------------------------------------------------------
    // Trail
    // ------------------------------------------------------------------

    /// Mark the trail for a later [`unwind_trail`](Self::unwind_trail).
    ///
    /// Taking a mark opens a new stamp boundary, so every variable that
    /// exists now has its bindings recorded from here on.
    pub fn trail_mark(&mut self) -> TrailMark {
        let stamp = self.choices.tick();
        self.trail.set_stamp(stamp);
        self.trail.mark()
    }

    /// Register a side effect to undo when execution backtracks past this
    /// point.
    pub fn push_revert(&mut self, revert: impl Revert + 'static) {
        self.trail.push_revert(Box::new(revert));
    }

    pub fn unwind_trail(&mut self, mark: TrailMark) {
        self.trail.unwind(mark, &mut self.store);
    }

    #[must_use]
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    // ------------------------------------------------------------------
    // Choice points
    // ------------------------------------------------------------------

    /// Push a frame saving the first `arity` registers and the continuation
    /// register, with `next` as its alternate, then continue with `first`.
    pub fn try_alternative(&mut self, arity: usize, first: Cont, next: Cont) -> Result<Cont, Fault> {
        let regs = self.registers.snapshot(arity).ok_or_else(|| {
            Fault::internal(format!(
                "arity {arity} exceeds max_arity {}",
                self.registers.max_arity()
            ))
        })?;
        let stamp = self.choices.tick();
        self.trail.set_stamp(stamp);
        self.choices.push(Frame {
            regs,
            cont: Arc::clone(self.registers.cont()),
            alt: next,
            mark: self.trail.mark(),
            b0: self.b0,
            stamp,
        });
        tracing::trace!(
            depth = self.choices.top(),
            trail = self.trail.len(),
            b0 = self.b0,
            stamp,
            "try"
        );
        Ok(first)
    }

    /// Restore the newest frame, unwind to its mark and install `next` as
    /// its alternate. The frame stays.
    pub fn retry_me(&mut self, next: Cont) -> Result<(), Fault> {
        let Some(frame) = self.choices.peek_live_mut() else {
            return Err(Fault::internal("retry with no live choice point"));
        };
        self.registers.restore(&frame.regs, &frame.cont);
        self.trail.unwind(frame.mark, &mut self.store);
        frame.alt = next;
        tracing::trace!(
            depth = self.choices.top(),
            trail = self.trail.len(),
            b0 = self.b0,
            "retry"
        );
        Ok(())
    }

    /// Restore the newest frame, unwind to its mark and discard it.
    pub fn trust_me(&mut self) -> Result<(), Fault> {
        let Some(frame) = self.choices.pop_live() else {
            return Err(Fault::internal("trust with no live choice point"));
        };
        self.registers.restore(&frame.regs, &frame.cont);
        self.trail.unwind(frame.mark, &mut self.store);
        tracing::trace!(
            depth = self.choices.top(),
            trail = self.trail.len(),
            b0 = self.b0,
            "trust"
        );
        Ok(())
    }

    /// [`retry_me`](Self::retry_me), then continue with `p`.
    pub fn retry(&mut self, p: Cont, next: Cont) -> Result<Cont, Fault> {
        self.retry_me(next)?;
        Ok(p)
    }

    /// [`trust_me`](Self::trust_me), then continue with `p`.
    pub fn trust(&mut self, p: Cont) -> Result<Cont, Fault> {
        self.trust_me()?;
        Ok(p)
    }

    /// Number of live frames. Capture it before a call and pass it to
    /// [`cut`](Self::cut) to drop exactly the frames that call created.
    #[must_use]
    pub fn top(&self) -> usize {
        self.choices.top()
    }

    /// Discard every frame above `level` without running its alternate.
    pub fn cut(&mut self, level: usize) {
        let dropped = self.choices.cut(level);
        self.b0 = self.b0.min(self.choices.top());
        if dropped > 0 {
            tracing::trace!(
                depth = self.choices.top(),
                trail = self.trail.len(),
                b0 = self.b0,
                dropped,
                "cut"
            );
        }
    }

    /// Backtrack: restore B0 from the newest frame and return its alternate.
    /// The frame itself is left for the alternate to retry or trust.
    pub fn fail(&mut self) -> Cont {
        match self.choices.peek() {
            Some(frame) => {
                self.b0 = frame.b0;
                tracing::trace!(
                    depth = self.choices.top(),
                    trail = self.trail.len(),
                    b0 = self.b0,
                    stamp = frame.stamp,
                    "fail"
                );
                Arc::clone(&frame.alt)
            }
            None => Arc::new(Exhausted),
        }
    }

    #[must_use]
    pub fn b0(&self) -> usize {
        self.b0
    }

    /// Set the cut barrier to the current top, as a predicate does on entry.
    pub fn set_b0(&mut self) {
        self.b0 = self.choices.top();
    }

    /// Put back a B0 saved earlier, clamped to the current top.
    pub fn restore_b0(&mut self, level: usize) {
        self.b0 = level.min(self.choices.top());
    }

    /// Cut back to B0.
    pub fn neck_cut(&mut self) {
        self.cut(self.b0);
    }

    // ------------------------------------------------------------------
    // Catchers and the exception slot
    // ------------------------------------------------------------------

    pub fn push_catcher(&mut self, barrier: usize) {
        self.catchers.push(barrier);
    }

    pub fn pop_catcher(&mut self) -> Option<usize> {
        self.catchers.pop()
    }

    #[must_use]
    pub fn peek_catcher(&self) -> Option<usize> {
        self.catchers.last().copied()
    }

    #[must_use]
    pub fn exception(&self) -> Option<&Term> {
        self.exception.as_ref()
    }

    /// Set the exception slot directly. Whatever fault was pending is
    /// forgotten.
    pub fn set_exception(&mut self, ball: Option<Term>) {
        self.exception = ball;
        self.raised = None;
    }

    pub fn take_exception(&mut self) -> Option<Term> {
        self.raised = None;
        self.exception.take()
    }

    /// Put a copy of `fault`'s term in the exception slot and keep the fault
    /// itself, so a catch that does not match can raise it again unchanged.
    pub fn raise(&mut self, fault: Fault) {
        let ball = self.copy(&fault.to_term());
        self.exception = Some(ball);
        self.raised = Some(fault);
    }

    /// Empty the exception slot, returning the ball and the fault to
    /// re-raise if no catcher takes it. A ball set without a fault re-raises
    /// as a plain throw.
    pub fn take_raised(&mut self) -> Option<(Term, Fault)> {
        let ball = self.exception.take()?;
        let fault = match self.raised.take() {
            Some(Fault::Thrown(_)) | None => Fault::Thrown(ball.clone()),
            Some(fault) => fault,
        };
        Some((ball, fault))
    }

    // ------------------------------------------------------------------
    // Halt and capabilities
    // ------------------------------------------------------------------

    #[must_use]
    pub fn halt_code(&self) -> Option<i32> {
        self.halt
    }

    pub fn set_halt_code(&mut self, code: i32) {
        self.halt = Some(code);
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.capabilities.contains(cap)
    }

    pub fn set_enabled(&mut self, cap: Capability, enabled: bool) {
        self.capabilities.set(cap, enabled);
    }

    /// Fail with a permission fault naming `cap` unless it is enabled.
    pub fn require(&self, cap: Capability, culprit: &Term) -> Result<(), Fault> {
        if self.capabilities.contains(cap) {
            Ok(())
        } else {
            tracing::debug!(capability = %cap, culprit = %culprit, "capability disabled");
            Err(Fault::capability_disabled(cap, self.resolve(culprit)))
        }
    }

    /// Time since `init`, and since the previous call.
    pub fn runtime(&mut self) -> Result<(Duration, Duration), Fault> {
        self.require(Capability::Statistics, &Term::atom("runtime"))?;
        let now = Instant::now();
        let clock = self.clock.get_or_insert(RuntimeClock {
            started: now,
            last: now,
        });
        let total = now.duration_since(clock.started);
        let since_last = now.duration_since(clock.last);
        clock.last = now;
        Ok((total, since_last))
    }

    // ------------------------------------------------------------------
    // External data
    // ------------------------------------------------------------------

    #[must_use]
    pub fn external_data(&self, key: &str) -> Option<&HostValue> {
        self.external.get(key)
    }

    pub fn set_external_data(&mut self, key: impl Into<String>, value: HostValue) -> Option<HostValue> {
        self.external.insert(key.into(), value)
    }

    pub fn remove_external_data(&mut self, key: &str) -> Option<HostValue> {
        self.external.remove(key)
    }

    /// The value under `key`, inserting `make()` if absent.
    ///
    /// Fails if the key already holds a value of another type.
    pub fn external_or_insert_with<T, F>(&mut self, key: &str, make: F) -> Result<Arc<T>, Fault>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let value = self
            .external
            .entry(key.to_string())
            .or_insert_with(|| HostValue::new(make()));
        value.downcast::<T>().ok_or_else(|| {
            Fault::internal(format!(
                "external data '{key}' holds {}, not {}",
                value.type_name(),
                std::any::type_name::<T>()
            ))
        })
    }
}
