//! Builtin units for Cairn.
//!
//! Every builtin is a [`Unit`](cairn_core::Unit) closing over its operand
//! terms and a success continuation. Builtins that keep host state (streams,
//! hash tables, mutexes) find it in the engine's external data under a fixed
//! key, so nothing here is process-global.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod args;
pub mod catch;
pub mod control;
pub mod hash;
pub mod log;
pub mod mutex;
pub mod streams;

use std::sync::Arc;

use cairn_core::Cont;

pub use catch::Catch;
pub use control::{
    CutTo, GetException, Halt, NeckCut, Or, SetB0, SetException, Throw, True, Unify,
};
pub use hash::{
    HASHES_KEY, HashGet, HashPut, HashRegistry, HashRemoveFirst, HashSize, HashTable, NewHash,
};
pub use log::Log;
pub use mutex::{MUTEXES_KEY, MutexRegistry, MutexTryLock, MutexUnlock};
pub use streams::{Close, MakeDirectory, Mode, Open, STREAMS_KEY, Stream, StreamTable};

/// Builds a goal in front of a continuation.
///
/// Control constructs that run a sub-goal (catch, disjunction) take one of
/// these so the sub-goal can be wired to a continuation chosen at run time.
pub type Goal = Arc<dyn Fn(Cont) -> Cont + Send + Sync>;

/// Wrap a closure as a [`Goal`].
pub fn goal<F>(build: F) -> Goal
where
    F: Fn(Cont) -> Cont + Send + Sync + 'static,
{
    Arc::new(build)
}
