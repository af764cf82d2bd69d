//! Choice-point frames.

use crate::registers::Snapshot;
use crate::trail::TrailMark;
use crate::unit::Cont;

/// A saved alternative: the registers of the call, what to run next, and
/// where the trail stood when the frame was created.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) regs: Snapshot,
    pub(crate) cont: Cont,
    pub(crate) alt: Cont,
    pub(crate) mark: TrailMark,
    pub(crate) b0: usize,
    pub(crate) stamp: u64,
}

/// The frame stack. Frame 1 (index 0) is the sentinel pushed at `init`.
#[derive(Debug, Default)]
pub(crate) struct ChoiceStack {
    frames: Vec<Frame>,
    clock: u64,
}

impl ChoiceStack {
    /// Number of live frames, sentinel included.
    pub(crate) fn top(&self) -> usize {
        self.frames.len()
    }

    /// Stamp for the next frame; strictly increasing until `clear`.
    pub(crate) fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn peek(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The newest frame unless it is the sentinel.
    pub(crate) fn peek_live_mut(&mut self) -> Option<&mut Frame> {
        if self.frames.len() > 1 {
            self.frames.last_mut()
        } else {
            None
        }
    }

    pub(crate) fn pop_live(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Drop every frame above `level`, never the sentinel. Returns how many
    /// frames were discarded.
    pub(crate) fn cut(&mut self, level: usize) -> usize {
        let keep = level.max(1).min(self.frames.len());
        let dropped = self.frames.len() - keep;
        self.frames.truncate(keep);
        dropped
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
        self.clock = 0;
    }
}
