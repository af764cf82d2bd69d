//! Core state machine for Cairn.
//!
//! This crate runs already-compiled goal graphs. It owns the binding store,
//! the trail, the choice-point stack and the reduction loop; everything a
//! builtin needs goes through [`Engine`].
//!
//! A unit of compiled code implements [`Unit`] and returns the next unit to
//! run. Failure is just another continuation, obtained from
//! [`Engine::fail`]. Faults travel as [`Signal`]s up to the [`Machine`], which
//! hands catchable ones to the innermost catch and surfaces the rest.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod choice;
mod engine;
mod fault;
mod index;
mod machine;
mod registers;
mod store;
mod trail;
mod unify;
mod unit;

pub use engine::Engine;
pub use fault::{Context, Fault, Signal};
pub use index::{SwitchOnHash, SwitchOnTerm, TermSwitch};
pub use machine::{Machine, Outcome, StepBudget, StopCheck};
pub use registers::FIXED_REGISTERS;
pub use trail::{Revert, TrailMark};
pub use unit::{Cont, Exhausted, Fail, IntoCont, Next, Succeed, Unit};

pub use cairn_config::EngineConfig;
pub use cairn_types::{
    Atom, Capabilities, Capability, FaultKind, Functor, HostValue, IndexKey, Term, VarId,
};
