//! Argument registers and the continuation register.

use std::array;
use std::sync::Arc;

use cairn_types::Term;
use smallvec::SmallVec;

use crate::unit::{Cont, Succeed};

/// Registers kept inline; higher ones spill to the overflow bank.
pub const FIXED_REGISTERS: usize = cairn_config::FIXED_REGISTERS;

/// A register snapshot as stored in a choice-point frame.
pub(crate) type Snapshot = SmallVec<[Term; FIXED_REGISTERS]>;

#[derive(Debug)]
pub(crate) struct Registers {
    fixed: [Term; FIXED_REGISTERS],
    overflow: Vec<Term>,
    cont: Cont,
}

impl Registers {
    pub(crate) fn new(max_arity: usize) -> Self {
        Self {
            fixed: array::from_fn(|_| Term::nil()),
            overflow: vec![Term::nil(); max_arity.saturating_sub(FIXED_REGISTERS)],
            cont: Arc::new(Succeed),
        }
    }

    pub(crate) fn max_arity(&self) -> usize {
        FIXED_REGISTERS + self.overflow.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Term> {
        if index < FIXED_REGISTERS {
            self.fixed.get(index)
        } else {
            self.overflow.get(index - FIXED_REGISTERS)
        }
    }

    pub(crate) fn set(&mut self, index: usize, value: Term) -> bool {
        let slot = if index < FIXED_REGISTERS {
            self.fixed.get_mut(index)
        } else {
            self.overflow.get_mut(index - FIXED_REGISTERS)
        };
        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn cont(&self) -> &Cont {
        &self.cont
    }

    pub(crate) fn set_cont(&mut self, cont: Cont) {
        self.cont = cont;
    }

    /// Copy out the first `arity` registers, or `None` past `max_arity`.
    pub(crate) fn snapshot(&self, arity: usize) -> Option<Snapshot> {
        if arity > self.max_arity() {
            return None;
        }
        let inline = arity.min(FIXED_REGISTERS);
        let mut regs: Snapshot = self.fixed[..inline].iter().cloned().collect();
        if arity > FIXED_REGISTERS {
            regs.extend(self.overflow[..arity - FIXED_REGISTERS].iter().cloned());
        }
        Some(regs)
    }

    pub(crate) fn restore(&mut self, regs: &[Term], cont: &Cont) {
        for (index, value) in regs.iter().enumerate() {
            self.set(index, value.clone());
        }
        self.cont = Arc::clone(cont);
    }

    pub(crate) fn reset(&mut self) {
        self.fixed.iter_mut().for_each(|reg| *reg = Term::nil());
        self.overflow.iter_mut().for_each(|reg| *reg = Term::nil());
        self.cont = Arc::new(Succeed);
    }
}
