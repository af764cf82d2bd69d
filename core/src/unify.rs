//! Unification, standard order, copying and resolution over the binding store.
//!
//! Unification and comparison walk terms with an explicit work stack so deep
//! lists do not grow the native stack. There is no occurs check.

use std::cmp::Ordering;
use std::collections::HashMap;

use cairn_types::{Atom, DOT, Term, VarId};

use crate::store::BindingStore;
use crate::trail::Trail;

/// Bind `var` to `value`, recording the binding unless elided.
pub(crate) fn bind(store: &mut BindingStore, trail: &mut Trail, var: VarId, value: Term) {
    let stamp = store.stamp(var);
    tracing::trace!(var = %var, value = %value, "bind");
    if store.bind(var, value) {
        trail.record_bind(var, stamp);
    }
}

/// Unify `a` with `b`, binding variables as needed.
///
/// Arguments are matched left to right and the first mismatch stops the walk.
/// Bindings made before the mismatch stay in place; undoing them is the
/// caller's job (unwind to a mark taken beforehand).
pub(crate) fn unify(store: &mut BindingStore, trail: &mut Trail, a: &Term, b: &Term) -> bool {
    let mut pending = vec![(a.clone(), b.clone())];
    while let Some((left, right)) = pending.pop() {
        let left = store.deref(&left);
        let right = store.deref(&right);
        match (&left, &right) {
            (Term::Var(x), Term::Var(y)) => {
                if x == y {
                    continue;
                }
                // The younger variable always points at the older one.
                if x > y {
                    bind(store, trail, *x, right.clone());
                } else {
                    bind(store, trail, *y, left.clone());
                }
            }
            (Term::Var(x), _) => bind(store, trail, *x, right.clone()),
            (_, Term::Var(y)) => bind(store, trail, *y, left.clone()),
            (Term::Int(x), Term::Int(y)) => {
                if x != y {
                    return false;
                }
            }
            (Term::Float(x), Term::Float(y)) => {
                if x.total_cmp(y) != Ordering::Equal {
                    return false;
                }
            }
            (Term::Atom(x), Term::Atom(y)) => {
                if x != y {
                    return false;
                }
            }
            (Term::Compound(x), Term::Compound(y)) => {
                if x.arity() != y.arity() || x.name() != y.name() {
                    return false;
                }
                pending.extend(
                    x.args()
                        .iter()
                        .cloned()
                        .zip(y.args().iter().cloned())
                        .rev(),
                );
            }
            (Term::List(x), Term::List(y)) => {
                pending.push((x.tail().clone(), y.tail().clone()));
                pending.push((x.head().clone(), y.head().clone()));
            }
            (Term::Host(x), Term::Host(y)) => {
                if !x.ptr_eq(y) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

fn rank(term: &Term) -> u8 {
    match term {
        Term::Var(_) => 0,
        Term::Int(_) | Term::Float(_) => 1,
        Term::Atom(_) => 2,
        Term::Compound(_) | Term::List(_) => 3,
        Term::Host(_) => 4,
    }
}

fn compare_numbers(a: &Term, b: &Term) -> Ordering {
    match (a, b) {
        (Term::Int(x), Term::Int(y)) => x.cmp(y),
        (Term::Float(x), Term::Float(y)) => x.total_cmp(y),
        // Equal values order the float first.
        (Term::Int(x), Term::Float(y)) => (*x as f64).total_cmp(y).then(Ordering::Greater),
        (Term::Float(x), Term::Int(y)) => x.total_cmp(&(*y as f64)).then(Ordering::Less),
        _ => Ordering::Equal,
    }
}

fn structure_of(term: &Term) -> Option<(usize, Atom, Vec<Term>)> {
    match term {
        Term::Compound(c) => Some((c.arity(), c.name().clone(), c.args().to_vec())),
        Term::List(cell) => Some((
            2,
            Atom::new(DOT),
            vec![cell.head().clone(), cell.tail().clone()],
        )),
        _ => None,
    }
}

/// Standard order of terms.
///
/// `Var < Number < Atom < Compound < Host`. Compounds (lists included, as
/// `'.'/2`) order by arity, then name, then arguments left to right. Host
/// values that are not the same object order by address, which is not stable
/// across runs.
pub(crate) fn compare(store: &BindingStore, a: &Term, b: &Term) -> Ordering {
    let mut pending = vec![(a.clone(), b.clone())];
    while let Some((left, right)) = pending.pop() {
        let left = store.deref(&left);
        let right = store.deref(&right);
        let order = rank(&left).cmp(&rank(&right));
        if order != Ordering::Equal {
            return order;
        }
        let order = match (&left, &right) {
            (Term::Var(x), Term::Var(y)) => x.cmp(y),
            (Term::Atom(x), Term::Atom(y)) => x.cmp(y),
            (Term::Host(x), Term::Host(y)) => {
                if x.ptr_eq(y) {
                    Ordering::Equal
                } else {
                    x.identity().cmp(&y.identity())
                }
            }
            (Term::Int(_) | Term::Float(_), _) => compare_numbers(&left, &right),
            _ => match (structure_of(&left), structure_of(&right)) {
                (Some((arity_a, name_a, args_a)), Some((arity_b, name_b, args_b))) => {
                    let order = arity_a.cmp(&arity_b).then_with(|| name_a.cmp(&name_b));
                    if order == Ordering::Equal {
                        pending.extend(args_a.into_iter().zip(args_b).rev());
                    }
                    order
                }
                _ => Ordering::Equal,
            },
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

/// Structural copy with fresh variables.
///
/// One fresh variable is allocated per distinct unbound source variable;
/// ground subterms are shared, not rebuilt.
pub(crate) fn copy(store: &mut BindingStore, stamp: u64, term: &Term) -> Term {
    let mut fresh = HashMap::new();
    copy_term(store, stamp, term, &mut fresh)
}

fn copy_term(
    store: &mut BindingStore,
    stamp: u64,
    term: &Term,
    fresh: &mut HashMap<VarId, VarId>,
) -> Term {
    if term.is_immutable() {
        return term.clone();
    }
    match store.deref(term) {
        Term::Var(var) => {
            let copied = *fresh.entry(var).or_insert_with(|| store.fresh(stamp));
            Term::Var(copied)
        }
        Term::Compound(c) => {
            if c.args().iter().all(Term::is_immutable) {
                return Term::Compound(c);
            }
            let args = c
                .args()
                .iter()
                .map(|arg| copy_term(store, stamp, arg, fresh))
                .collect();
            Term::compound(c.name().clone(), args)
        }
        Term::List(cell) => {
            let mut heads = vec![copy_term(store, stamp, cell.head(), fresh)];
            let mut tail = store.deref(cell.tail());
            while let Term::List(next) = tail {
                heads.push(copy_term(store, stamp, next.head(), fresh));
                tail = store.deref(next.tail());
            }
            let tail = copy_term(store, stamp, &tail, fresh);
            Term::list_with_tail(heads, tail)
        }
        other => other,
    }
}

/// Substitute every bound variable, leaving unbound ones in place.
pub(crate) fn resolve(store: &BindingStore, term: &Term) -> Term {
    if term.is_immutable() {
        return term.clone();
    }
    match store.deref(term) {
        Term::Compound(c) => {
            let args = c.args().iter().map(|arg| resolve(store, arg)).collect();
            Term::compound(c.name().clone(), args)
        }
        Term::List(cell) => {
            let mut heads = vec![resolve(store, cell.head())];
            let mut tail = store.deref(cell.tail());
            while let Term::List(next) = tail {
                heads.push(resolve(store, next.head()));
                tail = store.deref(next.tail());
            }
            Term::list_with_tail(heads, tail)
        }
        other => other,
    }
}
