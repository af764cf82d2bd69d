//! Core domain types for Cairn.
//!
//! This crate contains the term model and the small value types shared by
//! every layer: atoms, functor keys, terms, opaque host values, capabilities
//! and fault kinds. There is no IO and no engine state here; variables are
//! plain indices whose bindings live in the engine's store.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod atom;
mod capability;
mod host;
mod index;
mod term;

pub use atom::{Atom, DOT, Functor, NIL};
pub use capability::{Capabilities, Capability, ParseCapabilityError};
pub use host::HostValue;
pub use index::IndexKey;
pub use term::{Compound, Cons, Term, VarId};

use serde::{Deserialize, Serialize};

// ============================================================================
// Fault kinds
// ============================================================================

/// The structured kind of a fault, for embedders that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// A required argument was unbound.
    Instantiation,
    /// An argument was of the wrong kind.
    Type,
    /// An argument was of the right kind but outside the accepted domain.
    Domain,
    /// A named resource does not exist.
    Existence,
    /// The operation is not allowed, including disabled capabilities.
    Permission,
    /// A host operation failed.
    HostInterop,
    /// An engine invariant was violated. Never catchable.
    Internal,
    /// A term thrown by the program itself.
    Thrown,
}

impl FaultKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FaultKind::Instantiation => "instantiation",
            FaultKind::Type => "type",
            FaultKind::Domain => "domain",
            FaultKind::Existence => "existence",
            FaultKind::Permission => "permission",
            FaultKind::HostInterop => "host_interop",
            FaultKind::Internal => "internal",
            FaultKind::Thrown => "thrown",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
