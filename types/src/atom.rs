//! Atoms and functor keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name of the empty list.
pub const NIL: &str = "[]";

/// Name of the list constructor when a cons cell is viewed as a compound.
pub const DOT: &str = ".";

/// An atom: an immutable, cheaply clonable symbol name.
///
/// Clones share the same allocation, so equality first checks pointer
/// identity and only then falls back to comparing names.
#[derive(Clone)]
pub struct Atom(Arc<str>);

impl Atom {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The empty list `[]`.
    #[must_use]
    pub fn nil() -> Self {
        Self::new(NIL)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        &*self.0 == NIL
    }

    /// Tag this atom with an arity, producing a functor key.
    #[must_use]
    pub fn with_arity(&self, arity: usize) -> Functor {
        Functor {
            name: self.clone(),
            arity,
        }
    }

    fn needs_quotes(&self) -> bool {
        let name = self.as_str();
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return true;
        };
        if matches!(name, "[]" | "!" | ";" | "{}" | ",") {
            return name == ",";
        }
        if first.is_ascii_lowercase() {
            return !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        }
        const SYMBOLIC: &str = "+-*/\\^<>=~:.?@#&$";
        !name.chars().all(|c| SYMBOLIC.contains(c))
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.as_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.needs_quotes() {
            return f.write_str(self.as_str());
        }
        f.write_str("'")?;
        for c in self.as_str().chars() {
            match c {
                '\'' => f.write_str("\\'")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                _ => write!(f, "{c}")?,
            }
        }
        f.write_str("'")
    }
}

/// An atom tagged with an arity, e.g. `foo/2`.
///
/// Used as the key for compounds in indexing tables and as the goal
/// indicator in fault contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Functor {
    name: Atom,
    arity: usize,
}

impl Functor {
    #[must_use]
    pub fn new(name: impl Into<Atom>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    #[must_use]
    pub fn name(&self) -> &Atom {
        &self.name
    }

    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}
