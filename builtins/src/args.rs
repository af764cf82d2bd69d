//! Argument checking shared by the builtins.

use cairn_core::{Atom, Engine, Fault, Functor, Term};

/// A builtin's predicate indicator, used to place faults.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site {
    name: &'static str,
    arity: usize,
}

impl Site {
    pub(crate) const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }

    pub(crate) fn functor(self) -> Functor {
        Functor::new(self.name, self.arity)
    }

    /// `fault`, attributed to argument `arg` (1-based) of this builtin.
    pub(crate) fn at(self, arg: usize, fault: Fault) -> Fault {
        fault.in_goal(self.functor(), arg)
    }

    /// Dereference `term`, failing with an instantiation fault if unbound.
    pub(crate) fn bound(self, engine: &Engine, term: &Term, arg: usize) -> Result<Term, Fault> {
        let term = engine.deref(term);
        if term.is_var() {
            return Err(self.at(arg, Fault::instantiation()));
        }
        Ok(term)
    }

    /// A bound atom, or a type fault expecting `atom`.
    pub(crate) fn atom(self, engine: &Engine, term: &Term, arg: usize) -> Result<Atom, Fault> {
        match self.bound(engine, term, arg)? {
            Term::Atom(atom) => Ok(atom),
            other => Err(self.at(arg, Fault::type_error("atom", engine.resolve(&other)))),
        }
    }
}
