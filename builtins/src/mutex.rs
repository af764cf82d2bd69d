//! Named mutexes.
//!
//! A [`MutexRegistry`] is internally synchronized and may be installed in
//! several engines at once; locks taken through one engine are visible to
//! all of them. Locks are not reentrant and are not tied to backtracking:
//! a lock taken stays held until `mutex_unlock/1`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use cairn_core::{Atom, Cont, Engine, Fault, HostValue, Next, Signal, Term, Unit};

use crate::args::Site;

/// External-data key of the mutex registry.
pub const MUTEXES_KEY: &str = "mutexes";

const TRY_LOCK: Site = Site::new("mutex_trylock", 1);
const UNLOCK: Site = Site::new("mutex_unlock", 1);

#[derive(Debug, Default)]
pub struct MutexRegistry {
    held: Mutex<HashSet<Atom>>,
}

impl MutexRegistry {
    fn lock(&self) -> Result<MutexGuard<'_, HashSet<Atom>>, Fault> {
        self.held
            .lock()
            .map_err(|_| Fault::internal("mutex registry lock poisoned"))
    }

    /// The registry used by `engine`, created on first use.
    pub fn of(engine: &mut Engine) -> Result<Arc<Self>, Fault> {
        engine.external_or_insert_with(MUTEXES_KEY, MutexRegistry::default)
    }

    /// Make `engine` use `registry`, replacing any registry it had.
    pub fn install(engine: &mut Engine, registry: &Arc<Self>) {
        engine.set_external_data(MUTEXES_KEY, HostValue::from_arc(Arc::clone(registry)));
    }

    /// Take `name` if it is free.
    pub fn try_lock(&self, name: &Atom) -> Result<bool, Fault> {
        Ok(self.lock()?.insert(name.clone()))
    }

    /// Release `name`. Returns whether it was held.
    pub fn unlock(&self, name: &Atom) -> Result<bool, Fault> {
        Ok(self.lock()?.remove(name))
    }

    pub fn is_locked(&self, name: &Atom) -> Result<bool, Fault> {
        Ok(self.lock()?.contains(name))
    }
}

/// `mutex_trylock(Name)`: succeeds if the lock was free, fails otherwise.
#[derive(Debug)]
pub struct MutexTryLock {
    name: Term,
    cont: Cont,
}

impl MutexTryLock {
    #[must_use]
    pub fn new(name: Term, cont: Cont) -> Self {
        Self { name, cont }
    }
}

impl Unit for MutexTryLock {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let name = TRY_LOCK.atom(engine, &self.name, 1)?;
        if MutexRegistry::of(engine)?.try_lock(&name)? {
            tracing::trace!(mutex = %name, "locked");
            Ok(self.cont.clone().into())
        } else {
            Ok(engine.fail().into())
        }
    }
}

/// `mutex_unlock(Name)`.
#[derive(Debug)]
pub struct MutexUnlock {
    name: Term,
    cont: Cont,
}

impl MutexUnlock {
    #[must_use]
    pub fn new(name: Term, cont: Cont) -> Self {
        Self { name, cont }
    }
}

impl Unit for MutexUnlock {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let name = UNLOCK.atom(engine, &self.name, 1)?;
        if !MutexRegistry::of(engine)?.unlock(&name)? {
            return Err(UNLOCK
                .at(
                    1,
                    Fault::permission("unlock", "mutex", Term::Atom(name), "not locked"),
                )
                .into());
        }
        tracing::trace!(mutex = %name, "unlocked");
        Ok(self.cont.clone().into())
    }
}
