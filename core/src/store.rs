//! Binding arena.
//!
//! Every variable is a slot in this arena. Binding writes the slot and
//! unbinding (trail unwind only) clears it again. Slots are never freed while
//! the engine runs; `clear` drops them all at `init`.

use cairn_types::{Term, VarId};

#[derive(Debug, Clone)]
struct Slot {
    value: Option<Term>,
    /// Choice-point time stamp current when the variable was created.
    stamp: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BindingStore {
    slots: Vec<Slot>,
}

impl BindingStore {
    pub(crate) fn fresh(&mut self, stamp: u64) -> VarId {
        let id = VarId::new(self.slots.len());
        self.slots.push(Slot { value: None, stamp });
        id
    }

    pub(crate) fn binding(&self, var: VarId) -> Option<&Term> {
        self.slots.get(var.index()).and_then(|slot| slot.value.as_ref())
    }

    /// Stamp of `var`, or `0` for ids this arena never handed out.
    pub(crate) fn stamp(&self, var: VarId) -> u64 {
        self.slots.get(var.index()).map_or(0, |slot| slot.stamp)
    }

    /// Returns false if `var` is not a slot of this arena.
    pub(crate) fn bind(&mut self, var: VarId, value: Term) -> bool {
        match self.slots.get_mut(var.index()) {
            Some(slot) => {
                slot.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn unbind(&mut self, var: VarId) {
        if let Some(slot) = self.slots.get_mut(var.index()) {
            slot.value = None;
        }
    }

    /// Follow bindings until an unbound variable or a non-variable term.
    pub(crate) fn deref(&self, term: &Term) -> Term {
        let mut current = term;
        while let Term::Var(var) = current {
            match self.binding(*var) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
