//! The term model.
//!
//! Terms are immutable values. Variables are indices into a binding store
//! owned by the engine, so a `Term` on its own never changes; binding a
//! variable updates the store, and readers must dereference through the
//! store before inspecting a term.

use std::fmt;
use std::sync::Arc;

use crate::atom::{Atom, DOT, Functor};
use crate::host::HostValue;

/// Index of a variable slot in the engine's binding store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_G{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(VarId),
    Int(i64),
    Float(f64),
    Atom(Atom),
    Compound(Arc<Compound>),
    List(Arc<Cons>),
    Host(HostValue),
}

/// A compound term `name(arg1, ..., argN)` with `N >= 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    name: Atom,
    args: Box<[Term]>,
    immutable: bool,
}

impl Compound {
    #[must_use]
    pub fn name(&self) -> &Atom {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn functor(&self) -> Functor {
        self.name.with_arity(self.args.len())
    }
}

/// A list cell `[head | tail]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cons {
    head: Term,
    tail: Term,
    immutable: bool,
}

impl Cons {
    #[must_use]
    pub fn head(&self) -> &Term {
        &self.head
    }

    #[must_use]
    pub fn tail(&self) -> &Term {
        &self.tail
    }
}

impl Term {
    #[must_use]
    pub fn atom(name: impl Into<Atom>) -> Self {
        Term::Atom(name.into())
    }

    #[must_use]
    pub fn nil() -> Self {
        Term::Atom(Atom::nil())
    }

    #[must_use]
    pub const fn int(value: i64) -> Self {
        Term::Int(value)
    }

    #[must_use]
    pub const fn float(value: f64) -> Self {
        Term::Float(value)
    }

    #[must_use]
    pub fn host(value: HostValue) -> Self {
        Term::Host(value)
    }

    /// Build `name(args...)`. With no arguments this is just the atom `name`.
    #[must_use]
    pub fn compound(name: impl Into<Atom>, args: Vec<Term>) -> Self {
        let name = name.into();
        if args.is_empty() {
            return Term::Atom(name);
        }
        let immutable = args.iter().all(Term::is_immutable);
        Term::Compound(Arc::new(Compound {
            name,
            args: args.into_boxed_slice(),
            immutable,
        }))
    }

    #[must_use]
    pub fn cons(head: Term, tail: Term) -> Self {
        let immutable = head.is_immutable() && tail.is_immutable();
        Term::List(Arc::new(Cons {
            head,
            tail,
            immutable,
        }))
    }

    /// Build a proper list from `items`.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Self::list_with_tail(items, Term::nil())
    }

    /// Build a (possibly partial) list whose last tail is `tail`.
    #[must_use]
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::cons(item, acc))
    }

    #[must_use]
    pub const fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Term::Atom(a) if a.is_nil())
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Term::Int(_) | Term::Float(_))
    }

    #[must_use]
    pub const fn is_atomic(&self) -> bool {
        matches!(
            self,
            Term::Int(_) | Term::Float(_) | Term::Atom(_) | Term::Host(_)
        )
    }

    /// True when the term is known to contain no variables.
    ///
    /// Computed once at construction; a term that contains a variable is never
    /// immutable, even after that variable has been bound.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Int(_) | Term::Float(_) | Term::Atom(_) | Term::Host(_) => true,
            Term::Compound(c) => c.immutable,
            Term::List(l) => l.immutable,
        }
    }

    #[must_use]
    pub const fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_host(&self) -> Option<&HostValue> {
        match self {
            Term::Host(h) => Some(h),
            _ => None,
        }
    }

    /// Name and arity of the principal functor, for atoms, compounds and lists.
    #[must_use]
    pub fn functor(&self) -> Option<Functor> {
        match self {
            Term::Atom(a) => Some(a.with_arity(0)),
            Term::Compound(c) => Some(c.functor()),
            Term::List(_) => Some(Functor::new(DOT, 2)),
            _ => None,
        }
    }

    /// The `index`-th argument (zero based) of a compound or list cell.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Term> {
        match self {
            Term::Compound(c) => c.args.get(index),
            Term::List(l) => match index {
                0 => Some(&l.head),
                1 => Some(&l.tail),
                _ => None,
            },
            _ => None,
        }
    }

    /// Short name of the term's kind, as used in type errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Term::Var(_) => "variable",
            Term::Int(_) => "integer",
            Term::Float(_) => "float",
            Term::Atom(_) => "atom",
            Term::Compound(_) => "compound",
            Term::List(_) => "list",
            Term::Host(_) => "host_value",
        }
    }
}

impl From<Atom> for Term {
    fn from(value: Atom) -> Self {
        Term::Atom(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Float(value)
    }
}

impl From<HostValue> for Term {
    fn from(value: HostValue) -> Self {
        Term::Host(value)
    }
}

impl From<VarId> for Term {
    fn from(value: VarId) -> Self {
        Term::Var(value)
    }
}

/// Writes the term as stored, without following variable bindings.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::Int(i) => write!(f, "{i}"),
            Term::Float(x) => write!(f, "{x:?}"),
            Term::Atom(a) => write!(f, "{a}"),
            Term::Host(h) => write!(f, "{h}"),
            Term::Compound(c) => {
                write!(f, "{}(", c.name)?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Term::List(cell) => {
                write!(f, "[{}", cell.head)?;
                let mut tail = &cell.tail;
                loop {
                    match tail {
                        Term::List(next) => {
                            write!(f, ",{}", next.head)?;
                            tail = &next.tail;
                        }
                        t if t.is_nil() => break,
                        t => {
                            write!(f, "|{t}")?;
                            break;
                        }
                    }
                }
                f.write_str("]")
            }
        }
    }
}
