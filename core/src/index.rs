//! First-argument indexing.

use std::collections::HashMap;

use cairn_types::{IndexKey, Term};

use crate::engine::Engine;
use crate::fault::{Fault, Signal};
use crate::unit::{Cont, Next, Unit};

/// One continuation per kind of first argument.
#[derive(Debug, Clone)]
pub struct TermSwitch {
    pub var: Cont,
    pub int: Cont,
    pub float: Cont,
    pub atom: Cont,
    pub compound: Cont,
    pub list: Cont,
}

impl Engine {
    /// Dispatch on the dereferenced kind of register 0. Host values take the
    /// variable branch.
    pub fn switch_on_term(&self, switch: &TermSwitch) -> Result<Cont, Fault> {
        let first = self.deref(self.reg(0)?);
        let branch = match first {
            Term::Var(_) | Term::Host(_) => &switch.var,
            Term::Int(_) => &switch.int,
            Term::Float(_) => &switch.float,
            Term::Atom(_) => &switch.atom,
            Term::Compound(_) => &switch.compound,
            Term::List(_) => &switch.list,
        };
        Ok(branch.clone())
    }

    /// Look up register 0 by value (numbers, atoms) or functor (compounds),
    /// falling back to `otherwise`.
    pub fn switch_on_hash(
        &self,
        table: &HashMap<IndexKey, Cont>,
        otherwise: &Cont,
    ) -> Result<Cont, Fault> {
        let first = self.deref(self.reg(0)?);
        let key = IndexKey::of(&first).ok_or_else(|| {
            Fault::internal(format!("cannot index on {} in switch_on_hash", first.kind_name()))
        })?;
        Ok(table.get(&key).unwrap_or(otherwise).clone())
    }
}

#[derive(Debug, Clone)]
pub struct SwitchOnTerm(pub TermSwitch);

impl Unit for SwitchOnTerm {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        Ok(engine.switch_on_term(&self.0)?.into())
    }
}

#[derive(Debug, Clone)]
pub struct SwitchOnHash {
    pub table: HashMap<IndexKey, Cont>,
    pub otherwise: Cont,
}

impl Unit for SwitchOnHash {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        Ok(engine.switch_on_hash(&self.table, &self.otherwise)?.into())
    }
}
