//! Term-keyed hash tables, anonymous or registered under an atom alias.
//!
//! Registered tables live in a [`HashRegistry`] stored in the engine's
//! external data under [`HASHES_KEY`]. A table is always handed to the
//! program as a host value, so an alias and the table it names compare
//! equal once resolved.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use cairn_core::{Atom, Cont, Engine, Fault, HostValue, Next, Signal, Term, Unit};

use crate::args::Site;

/// External-data key of the hash registry.
pub const HASHES_KEY: &str = "hashes";

const NEW_HASH: Site = Site::new("new_hash", 1);
const HASH_PUT: Site = Site::new("hash_put", 3);
const HASH_GET: Site = Site::new("hash_get", 3);
const HASH_SIZE: Site = Site::new("hash_size", 2);
const HASH_REMOVE_FIRST: Site = Site::new("$hash_remove_first", 3);

/// A fully resolved term used as a table key.
///
/// Equality is structural. Floats compare by bit pattern so every key equals
/// itself; host values compare by identity.
#[derive(Debug, Clone)]
struct HashKey(Term);

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        same_term(&self.0, &other.0)
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut pending = vec![&self.0];
        while let Some(term) = pending.pop() {
            std::mem::discriminant(term).hash(state);
            match term {
                Term::Var(v) => v.hash(state),
                Term::Int(i) => i.hash(state),
                Term::Float(x) => x.to_bits().hash(state),
                Term::Atom(a) => a.hash(state),
                Term::Host(h) => h.hash(state),
                Term::Compound(c) => {
                    c.name().hash(state);
                    c.arity().hash(state);
                    pending.extend(c.args().iter().rev());
                }
                Term::List(cell) => {
                    pending.push(cell.tail());
                    pending.push(cell.head());
                }
            }
        }
    }
}

/// Structural identity of two resolved terms.
fn same_term(a: &Term, b: &Term) -> bool {
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        match (a, b) {
            (Term::Var(x), Term::Var(y)) if x == y => {}
            (Term::Int(x), Term::Int(y)) if x == y => {}
            (Term::Float(x), Term::Float(y)) if x.to_bits() == y.to_bits() => {}
            (Term::Atom(x), Term::Atom(y)) if x == y => {}
            (Term::Host(x), Term::Host(y)) if x.ptr_eq(y) => {}
            (Term::Compound(x), Term::Compound(y))
                if x.name() == y.name() && x.arity() == y.arity() =>
            {
                pending.extend(x.args().iter().zip(y.args()));
            }
            (Term::List(x), Term::List(y)) => {
                pending.push((x.tail(), y.tail()));
                pending.push((x.head(), y.head()));
            }
            _ => return false,
        }
    }
    true
}

/// One hash table. Shared between every term that refers to it.
#[derive(Debug, Default)]
pub struct HashTable {
    entries: Mutex<HashMap<HashKey, Term>>,
}

impl HashTable {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<HashKey, Term>>, Fault> {
        self.entries
            .lock()
            .map_err(|_| Fault::internal("hash table lock poisoned"))
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn put(&self, key: Term, value: Term) -> Result<Option<Term>, Fault> {
        Ok(self.lock()?.insert(HashKey(key), value))
    }

    pub fn get(&self, key: &Term) -> Result<Option<Term>, Fault> {
        Ok(self.lock()?.get(&HashKey(key.clone())).cloned())
    }

    pub fn remove(&self, key: &Term) -> Result<Option<Term>, Fault> {
        Ok(self.lock()?.remove(&HashKey(key.clone())))
    }

    pub fn len(&self) -> Result<usize, Fault> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Fault> {
        Ok(self.lock()?.is_empty())
    }

    /// Drop the first element of the list stored under `key` that equals
    /// `item`. An integer key whose list becomes empty is removed outright.
    pub fn remove_first(&self, key: &Term, item: &Term) -> Result<(), Fault> {
        let mut entries = self.lock()?;
        let key = HashKey(key.clone());
        let Some(list) = entries.get(&key) else {
            return Ok(());
        };
        if list.is_nil() {
            return Ok(());
        }

        let mut kept = Vec::new();
        let mut rest = list.clone();
        while let Term::List(cell) = &rest {
            let head = cell.head().clone();
            let tail = cell.tail().clone();
            rest = tail;
            if same_term(&head, item) {
                break;
            }
            kept.push(head);
        }
        let remaining = Term::list_with_tail(kept, rest);

        if remaining.is_nil() && matches!(key.0, Term::Int(_)) {
            entries.remove(&key);
        } else {
            entries.insert(key, remaining);
        }
        Ok(())
    }
}

/// Atom aliases of registered tables.
#[derive(Debug, Default)]
pub struct HashRegistry {
    tables: Mutex<HashMap<Atom, HostValue>>,
}

impl HashRegistry {
    /// The registry kept by `engine`, created on first use.
    pub fn of(engine: &mut Engine) -> Result<Arc<Self>, Fault> {
        engine.external_or_insert_with(HASHES_KEY, HashRegistry::default)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Atom, HostValue>>, Fault> {
        self.tables
            .lock()
            .map_err(|_| Fault::internal("hash registry lock poisoned"))
    }

    /// The table registered as `alias`, creating it if needed.
    pub fn define(&self, alias: &Atom) -> Result<HostValue, Fault> {
        Ok(self
            .lock()?
            .entry(alias.clone())
            .or_insert_with(|| HostValue::new(HashTable::default()))
            .clone())
    }

    pub fn lookup(&self, alias: &Atom) -> Result<Option<HostValue>, Fault> {
        Ok(self.lock()?.get(alias).cloned())
    }
}

/// Resolve a hash argument: an alias of a registered table, or a table.
fn table_of(engine: &mut Engine, term: &Term, site: Site) -> Result<Arc<HashTable>, Fault> {
    let handle = match site.bound(engine, term, 1)? {
        Term::Atom(alias) => HashRegistry::of(engine)?
            .lookup(&alias)?
            .ok_or_else(|| site.at(1, Fault::existence("hash", Term::Atom(alias))))?,
        Term::Host(handle) => handle,
        other => {
            return Err(site.at(1, Fault::domain("hash_or_alias", engine.resolve(&other))));
        }
    };
    handle.downcast::<HashTable>().ok_or_else(|| {
        site.at(
            1,
            Fault::domain("hash_or_alias", Term::host(handle.clone())),
        )
    })
}

fn key_of(engine: &Engine, term: &Term, site: Site) -> Result<Term, Fault> {
    site.bound(engine, term, 2)?;
    Ok(engine.resolve(term))
}

/// `new_hash(Hash)`: an unbound argument gets a fresh anonymous table; an
/// atom names a registered table, created on first use.
#[derive(Debug)]
pub struct NewHash {
    hash: Term,
    cont: Cont,
}

impl NewHash {
    #[must_use]
    pub fn new(hash: Term, cont: Cont) -> Self {
        Self { hash, cont }
    }
}

impl Unit for NewHash {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        match engine.deref(&self.hash) {
            var @ Term::Var(_) => {
                let table = Term::host(HostValue::new(HashTable::default()));
                if !engine.unify(&var, &table) {
                    return Ok(engine.fail().into());
                }
            }
            Term::Atom(alias) => {
                HashRegistry::of(engine)?.define(&alias)?;
            }
            other => {
                return Err(NEW_HASH
                    .at(1, Fault::domain("hash_or_alias", engine.resolve(&other)))
                    .into());
            }
        }
        Ok(self.cont.clone().into())
    }
}

/// `hash_put(Hash, Key, Value)`.
#[derive(Debug)]
pub struct HashPut {
    hash: Term,
    key: Term,
    value: Term,
    cont: Cont,
}

impl HashPut {
    #[must_use]
    pub fn new(hash: Term, key: Term, value: Term, cont: Cont) -> Self {
        Self {
            hash,
            key,
            value,
            cont,
        }
    }
}

impl Unit for HashPut {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let table = table_of(engine, &self.hash, HASH_PUT)?;
        let key = key_of(engine, &self.key, HASH_PUT)?;
        table.put(key, engine.resolve(&self.value))?;
        Ok(self.cont.clone().into())
    }
}

/// `hash_get(Hash, Key, Value)`; an absent key reads as `[]`.
#[derive(Debug)]
pub struct HashGet {
    hash: Term,
    key: Term,
    value: Term,
    cont: Cont,
}

impl HashGet {
    #[must_use]
    pub fn new(hash: Term, key: Term, value: Term, cont: Cont) -> Self {
        Self {
            hash,
            key,
            value,
            cont,
        }
    }
}

impl Unit for HashGet {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let table = table_of(engine, &self.hash, HASH_GET)?;
        let key = key_of(engine, &self.key, HASH_GET)?;
        let found = table.get(&key)?.unwrap_or_else(Term::nil);
        if engine.unify(&self.value, &found) {
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}

/// `hash_size(Hash, Size)`.
#[derive(Debug)]
pub struct HashSize {
    hash: Term,
    size: Term,
    cont: Cont,
}

impl HashSize {
    #[must_use]
    pub fn new(hash: Term, size: Term, cont: Cont) -> Self {
        Self { hash, size, cont }
    }
}

impl Unit for HashSize {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let table = table_of(engine, &self.hash, HASH_SIZE)?;
        let size = engine.deref(&self.size);
        if !matches!(size, Term::Var(_) | Term::Int(_)) {
            return Err(HASH_SIZE
                .at(2, Fault::type_error("integer", engine.resolve(&size)))
                .into());
        }
        let len = i64::try_from(table.len()?)
            .map_err(|_| Fault::internal("hash table size overflows an integer"))?;
        if engine.unify(&size, &Term::int(len)) {
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}

/// `'$hash_remove_first'(Hash, Key, Item)`. Always succeeds.
#[derive(Debug)]
pub struct HashRemoveFirst {
    hash: Term,
    key: Term,
    item: Term,
    cont: Cont,
}

impl HashRemoveFirst {
    #[must_use]
    pub fn new(hash: Term, key: Term, item: Term, cont: Cont) -> Self {
        Self {
            hash,
            key,
            item,
            cont,
        }
    }
}

impl Unit for HashRemoveFirst {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let table = table_of(engine, &self.hash, HASH_REMOVE_FIRST)?;
        let key = key_of(engine, &self.key, HASH_REMOVE_FIRST)?;
        table.remove_first(&key, &engine.resolve(&self.item))?;
        Ok(self.cont.clone().into())
    }
}
