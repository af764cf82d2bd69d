//! Undo log for bindings and collaborator side effects.

use std::fmt;

use cairn_types::VarId;

use crate::store::BindingStore;

/// A side effect that must be undone when execution backtracks past it.
///
/// Reverts run exactly once, in reverse order of registration. A failing
/// revert is logged and the unwind carries on.
pub trait Revert: Send {
    fn revert(self: Box<Self>) -> anyhow::Result<()>;
}

impl<F> Revert for F
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    fn revert(self: Box<Self>) -> anyhow::Result<()> {
        (*self)()
    }
}

/// Position in the trail; everything recorded after it is undone by an unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrailMark(usize);

impl TrailMark {
    #[must_use]
    pub const fn position(self) -> usize {
        self.0
    }
}

enum Entry {
    Bind(VarId),
    Revert(Box<dyn Revert>),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Bind(var) => write!(f, "Bind({var})"),
            Entry::Revert(_) => f.write_str("Revert(..)"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Trail {
    entries: Vec<Entry>,
    /// Stamp of the most recently created choice point.
    stamp: u64,
    elide: bool,
}

impl Trail {
    pub(crate) fn new(elide: bool) -> Self {
        Self {
            entries: Vec::new(),
            stamp: 0,
            elide,
        }
    }

    pub(crate) fn mark(&self) -> TrailMark {
        TrailMark(self.entries.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    pub(crate) fn set_stamp(&mut self, stamp: u64) {
        self.stamp = stamp;
    }

    /// Record the binding of a variable created at `var_stamp`.
    ///
    /// A variable created after the newest choice point cannot be reached
    /// from any live frame, so with elision on its binding is not recorded.
    /// Returns whether an entry was pushed.
    pub(crate) fn record_bind(&mut self, var: VarId, var_stamp: u64) -> bool {
        if self.elide && var_stamp >= self.stamp {
            return false;
        }
        self.entries.push(Entry::Bind(var));
        true
    }

    pub(crate) fn push_revert(&mut self, revert: Box<dyn Revert>) {
        self.entries.push(Entry::Revert(revert));
    }

    /// Pop and undo every entry above `mark`, newest first.
    pub(crate) fn unwind(&mut self, mark: TrailMark, store: &mut BindingStore) {
        while self.entries.len() > mark.0 {
            let Some(entry) = self.entries.pop() else {
                break;
            };
            match entry {
                Entry::Bind(var) => store.unbind(var),
                Entry::Revert(revert) => {
                    if let Err(err) = revert.revert() {
                        tracing::warn!(error = %err, trail = self.entries.len(), "revert failed during unwind");
                    }
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.stamp = 0;
    }
}
