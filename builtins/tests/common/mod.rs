//! Shared test utilities and fixtures
//!
//! Small predicates written directly against the register protocol: the
//! caller loads the argument registers and the continuation register, then
//! jumps to the predicate's entry unit.

#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;

use cairn_core::{Cont, Engine, IntoCont, Next, Signal, Term, Unit};

/// A predicate defined by a list of facts. Each clause is renamed apart on
/// every call.
#[derive(Debug, Clone)]
pub struct Facts {
    clauses: Arc<Vec<Vec<Term>>>,
    arity: usize,
}

impl Facts {
    pub fn new(arity: usize, clauses: Vec<Vec<Term>>) -> Self {
        assert!(clauses.iter().all(|c| c.len() == arity));
        Self {
            clauses: Arc::new(clauses),
            arity,
        }
    }

    /// Facts of arity 1 over atoms.
    pub fn atoms(names: &[&str]) -> Self {
        Self::new(1, names.iter().map(|n| vec![Term::atom(*n)]).collect())
    }

    pub fn entry(&self) -> Cont {
        self.clone().into_cont()
    }

    fn clause(&self, index: usize) -> Cont {
        Clause {
            facts: self.clone(),
            index,
        }
        .into_cont()
    }
}

impl Unit for Facts {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.set_b0();
        match self.clauses.len() {
            0 => Ok(engine.fail().into()),
            1 => Ok(self.clause(0).into()),
            _ => {
                let next = Alternative {
                    facts: self.clone(),
                    index: 1,
                };
                Ok(engine
                    .try_alternative(self.arity, self.clause(0), next.into_cont())?
                    .into())
            }
        }
    }
}

#[derive(Debug)]
struct Alternative {
    facts: Facts,
    index: usize,
}

impl Unit for Alternative {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let clause = self.facts.clause(self.index);
        if self.index + 1 == self.facts.clauses.len() {
            return Ok(engine.trust(clause)?.into());
        }
        let next = Alternative {
            facts: self.facts.clone(),
            index: self.index + 1,
        };
        Ok(engine.retry(clause, next.into_cont())?.into())
    }
}

#[derive(Debug)]
struct Clause {
    facts: Facts,
    index: usize,
}

impl Unit for Clause {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        let head = Term::list(self.facts.clauses[self.index].iter().cloned());
        let mut cell = engine.copy(&head);
        for arg in 0..self.facts.arity {
            let Term::List(pair) = cell else {
                unreachable!("clause has {} arguments", self.facts.arity);
            };
            let reg = engine.reg(arg)?.clone();
            if !engine.unify(&reg, pair.head()) {
                return Ok(engine.fail().into());
            }
            cell = pair.tail().clone();
        }
        Ok(engine.cont().clone().into())
    }
}

/// Call a predicate: load registers, set the continuation, jump.
pub struct Call {
    pred: Cont,
    args: Vec<Term>,
    cont: Cont,
}

impl Call {
    pub fn new(pred: Cont, args: Vec<Term>, cont: Cont) -> Self {
        Self { pred, args, cont }
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call").field("args", &self.args).finish_non_exhaustive()
    }
}

impl Unit for Call {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.set_args(&self.args)?;
        engine.set_cont(self.cont.clone());
        Ok(self.pred.clone().into())
    }
}

type Body = dyn Fn(&mut Engine, &[Term], Cont) -> Cont + Send + Sync;

/// A single-clause predicate whose body is built at call time from the
/// argument registers and the caller's continuation.
#[derive(Clone)]
pub struct Rule {
    arity: usize,
    body: Arc<Body>,
}

impl Rule {
    pub fn new<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&mut Engine, &[Term], Cont) -> Cont + Send + Sync + 'static,
    {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    pub fn entry(&self) -> Cont {
        self.clone().into_cont()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("arity", &self.arity).finish_non_exhaustive()
    }
}

impl Unit for Rule {
    fn execute(&self, engine: &mut Engine) -> Result<Next, Signal> {
        engine.set_b0();
        let mut args = Vec::with_capacity(self.arity);
        for index in 0..self.arity {
            args.push(engine.reg(index)?.clone());
        }
        let cont = engine.cont().clone();
        Ok((self.body)(engine, &args, cont).into())
    }
}
