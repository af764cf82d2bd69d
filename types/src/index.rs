//! Hashable keys for first-argument indexing and term-keyed tables.

use crate::atom::{Atom, Functor};
use crate::term::Term;

/// The key a dereferenced term is filed under.
///
/// Numbers and atoms key by value, compounds by their functor. Variables,
/// list cells and host values have no key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Int(i64),
    /// Stored as raw bits so the key is hashable; `-0.0` and `0.0` differ.
    Float(u64),
    Atom(Atom),
    Functor(Functor),
}

impl IndexKey {
    /// Key for an already dereferenced term.
    #[must_use]
    pub fn of(term: &Term) -> Option<Self> {
        match term {
            Term::Int(i) => Some(IndexKey::Int(*i)),
            Term::Float(x) => Some(IndexKey::Float(x.to_bits())),
            Term::Atom(a) => Some(IndexKey::Atom(a.clone())),
            Term::Compound(c) => Some(IndexKey::Functor(c.functor())),
            Term::Var(_) | Term::List(_) | Term::Host(_) => None,
        }
    }
}

impl From<Atom> for IndexKey {
    fn from(value: Atom) -> Self {
        IndexKey::Atom(value)
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        IndexKey::Int(value)
    }
}

impl From<Functor> for IndexKey {
    fn from(value: Functor) -> Self {
        IndexKey::Functor(value)
    }
}
